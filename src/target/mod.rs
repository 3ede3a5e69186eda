pub mod ast;
pub mod context;
pub mod executor;
pub mod runtime;

pub use ast::{Expr, Program, Stmt};
pub use context::{RuntimeContext, SharedBuffer};
pub use executor::{Value, execute};
