use crate::config::CfgliftConfig;
use crate::handlers::{build_session, read_script};
use crate::lift::translate;
use anyhow::Result;
use colored::*;
use std::path::{Path, PathBuf};

pub fn handle_check(config: &CfgliftConfig, thunks: &[PathBuf], script: &Path) -> Result<()> {
    let session = build_session(config, thunks)?;
    let nodes = read_script(script)?;

    match translate(&session, &nodes) {
        Ok(program) => {
            println!("{} {} ({} statements)", "OK".green().bold(), script.display(), program.body.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e.reason.red().bold());
            eprintln!("  {}", e);
            std::process::exit(2);
        }
    }
}
