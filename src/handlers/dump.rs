use crate::config::CfgliftConfig;
use crate::handlers::{build_session, read_script};
use crate::lift::translate;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn handle_ast(script: &Path) -> Result<()> {
    let nodes = read_script(script)?;
    println!("{:#?}", nodes);
    Ok(())
}

pub fn handle_emit(config: &CfgliftConfig, thunks: &[PathBuf], script: &Path) -> Result<()> {
    let session = build_session(config, thunks)?;
    let nodes = read_script(script)?;
    let program = translate(&session, &nodes)?;
    println!("{:#?}", program);
    Ok(())
}
