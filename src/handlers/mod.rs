pub mod check;
pub mod dump;
pub mod run;

use crate::config::CfgliftConfig;
use crate::lift::{Session, Translator};
use crate::shell::{CommandNode, parse_script};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn read_script(path: &Path) -> Result<Vec<CommandNode>> {
    let src = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    parse_script(&src).with_context(|| format!("Failed to parse {:?}", path))
}

/// Builds the translation session: configured substitution names, then one
/// thunk per `--thunk` file, registered in command-line order.
pub fn build_session(config: &CfgliftConfig, thunks: &[PathBuf]) -> Result<Session> {
    let mut session = Session::new();
    for name in &config.substs {
        session.add_subst(name.as_str());
    }
    for path in thunks {
        let nodes = read_script(path)?;
        let block = Translator::new(&session)
            .translate_list(&nodes)
            .with_context(|| format!("Failed to translate thunk {:?}", path))?;
        let thunk = session.register(block);
        log::info!("{:?} registered as {}", path, thunk.placeholder());
    }
    Ok(session)
}
