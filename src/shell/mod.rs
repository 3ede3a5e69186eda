pub mod ast;
pub mod parser;

pub use ast::{AndOrOp, CaseArm, CommandNode, RawWord, RedirectMode, Redirection};
pub use parser::parse_script;

#[cfg(test)]
mod tests;
