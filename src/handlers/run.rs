use crate::config::CfgliftConfig;
use crate::handlers::{build_session, read_script};
use crate::lift::translate;
use crate::target::{RuntimeContext, execute};
use crate::utils::detect_shell;
use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};

pub fn handle_run(config: &CfgliftConfig, thunks: &[PathBuf], script: &Path, args: &[String]) -> Result<()> {
    let session = build_session(config, thunks)?;
    let nodes = read_script(script)?;
    let program = translate(&session, &nodes).with_context(|| format!("Cannot translate {:?}", script))?;

    let shell = detect_shell(config.runtime.shell.as_ref());
    log::info!("Running {:?} with shell {}", script, shell);
    let mut ctx = RuntimeContext::new(script, args, shell).with_env(&config.env);

    let code = execute(&program, &mut ctx)?;
    if code != 0 {
        eprintln!("{} {} exited with {}", "⚠️".yellow(), script.display(), code.to_string().red());
        std::process::exit(code);
    }
    Ok(())
}
