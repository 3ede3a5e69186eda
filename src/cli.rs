use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfglift", version, about = "cfglift: lift configure scripts out of shell")]
pub struct Cli {
    /// Shell file registered as a thunk block; the Nth flag answers `__thunk<N>__`
    #[arg(long = "thunk", global = true)]
    pub thunks: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a script and run the result in-process
    Run {
        script: PathBuf,

        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Translate only and report whether the script is supported
    Check { script: PathBuf },

    /// Dump the parsed command tree
    Ast { script: PathBuf },

    /// Dump the translated program
    Emit { script: PathBuf },
}
