use anyhow::Result;
use cfglift::cli::{Cli, Commands};
use cfglift::config::load_config;
use cfglift::handlers::{check, dump, run};
use clap::Parser;
use std::env;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&env::current_dir()?)?;

    match &cli.command {
        Commands::Run { script, args } => run::handle_run(&config, &cli.thunks, script, args),
        Commands::Check { script } => check::handle_check(&config, &cli.thunks, script),
        Commands::Ast { script } => dump::handle_ast(script),
        Commands::Emit { script } => dump::handle_emit(&config, &cli.thunks, script),
    }
}
