pub mod cli;
pub mod config;
pub mod handlers;
pub mod lift;
pub mod shell;
pub mod target;
pub mod utils;
