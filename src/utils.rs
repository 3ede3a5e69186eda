use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::process::{Command, Stdio};

/// Output of a captured shell command.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedOutput {
    pub status: i32,
    pub stdout: String,
}

fn shell_flag(shell_cmd: &str) -> &'static str {
    // "cmd" / "cmd.exe" take /C, every sh-like shell and powershell take -c
    if shell_cmd.contains("cmd") && !shell_cmd.contains("sh") { "/C" } else { "-c" }
}

fn shell_command(cmd_str: &str, env_vars: &HashMap<String, String>, shell_cmd: &str) -> Command {
    let mut command = Command::new(shell_cmd);
    command
        .arg(shell_flag(shell_cmd))
        .arg(cmd_str)
        // The variable map is the source of truth for the child environment
        .env_clear()
        .envs(env_vars)
        .stdin(Stdio::inherit());
    command
}

/// Runs one command line through the shell with inherited stdio and
/// returns its exit status.
pub fn run_shell_command(cmd_str: &str, env_vars: &HashMap<String, String>, shell_cmd: &str) -> Result<i32> {
    let mut command = shell_command(cmd_str, env_vars, shell_cmd);
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command
        .status()
        .with_context(|| format!("Failed to spawn shell process: {}", shell_cmd))?;
    Ok(status.code().unwrap_or(1))
}

/// Runs one command line and collects its stdout, minus one trailing newline.
pub fn capture_shell_command(cmd_str: &str, env_vars: &HashMap<String, String>, shell_cmd: &str) -> Result<CapturedOutput> {
    let mut command = shell_command(cmd_str, env_vars, shell_cmd);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::inherit());

    let output = command
        .output()
        .with_context(|| format!("Failed to spawn shell process (captured): {}", shell_cmd))?;

    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    strip_trailing_newline(&mut stdout);
    Ok(CapturedOutput {
        status: output.status.code().unwrap_or(1),
        stdout,
    })
}

pub fn strip_trailing_newline(s: &mut String) {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
}

pub fn detect_shell(config_shell: Option<&String>) -> String {
    config_shell
        .cloned()
        .or_else(|| env::var("SHELL").ok())
        .unwrap_or_else(|| if cfg!(windows) { "cmd".to_string() } else { "sh".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_only_one_newline() {
        let mut s = "a\n\n".to_string();
        strip_trailing_newline(&mut s);
        assert_eq!(s, "a\n");
        let mut s = "b\r\n".to_string();
        strip_trailing_newline(&mut s);
        assert_eq!(s, "b");
        let mut s = "c".to_string();
        strip_trailing_newline(&mut s);
        assert_eq!(s, "c");
    }

    #[test]
    fn test_detect_shell_prefers_config() {
        let configured = "bash".to_string();
        assert_eq!(detect_shell(Some(&configured)), "bash");
    }

    #[test]
    fn test_shell_flag() {
        assert_eq!(shell_flag("sh"), "-c");
        assert_eq!(shell_flag("/bin/bash"), "-c");
        assert_eq!(shell_flag("cmd.exe"), "/C");
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_uses_given_environment() {
        let mut vars = HashMap::new();
        vars.insert("GREETING".to_string(), "hello".to_string());
        vars.insert("PATH".to_string(), env::var("PATH").unwrap_or_default());
        let out = capture_shell_command("echo \"$GREETING\"", &vars, "sh").unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout, "hello");
    }
}
