pub mod condition;
pub mod error;
pub mod expand;
pub mod session;
pub mod translator;
pub mod value;

pub use error::{LiftResult, UnhandledTranslation};
pub use expand::{CaptureSink, Evaluator, SubstitutionSink};
pub use session::{Session, Thunk};
pub use translator::Translator;

use crate::shell::CommandNode;
use crate::target::ast::Program;

/// Translates a command tree with the default substitution sink.
pub fn translate(session: &Session, nodes: &[CommandNode]) -> LiftResult<Program> {
    Translator::new(session).translate(nodes)
}

#[cfg(test)]
mod tests;
