use crate::target::ast::{CompareOp, Expr, LoopItems, Predicate, Program, Stmt};
use crate::target::context::RuntimeContext;
use crate::target::runtime::{for_loop, format, glob_match};
use crate::utils::{capture_shell_command, run_shell_command};
use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Runtime value. Commands yield a `Status`, which is truthy on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Status(i32),
    Bool(bool),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Status(code) => *code != 0,
            Value::Bool(b) => *b,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Status(code) => code.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }
}

enum Flow {
    Normal,
    Exit(i32),
}

/// Runs the program body and returns its exit code.
pub fn execute(program: &Program, ctx: &mut RuntimeContext) -> Result<i32> {
    let code = match exec_block(&program.body, ctx)? {
        Flow::Normal => 0,
        Flow::Exit(code) => code,
    };
    ctx.out.flush().context("Failed to flush program output")?;
    Ok(code)
}

fn exec_block(stmts: &[Stmt], ctx: &mut RuntimeContext) -> Result<Flow> {
    for stmt in stmts {
        if let Flow::Exit(code) = exec_stmt(stmt, ctx)? {
            return Ok(Flow::Exit(code));
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(stmt: &Stmt, ctx: &mut RuntimeContext) -> Result<Flow> {
    match stmt {
        Stmt::SetVar { name, value } => {
            let value = eval(value, ctx)?.into_string();
            ctx.vars.insert(name.clone(), value);
        }
        Stmt::Let { name, value } => {
            let value = eval(value, ctx)?.into_string();
            ctx.locals.insert(name.clone(), value);
        }
        Stmt::Expr(expr) => {
            eval(expr, ctx)?;
        }
        Stmt::If { cond, then_body, else_body } => {
            let branch = if eval(cond, ctx)?.truthy() { then_body } else { else_body };
            return exec_block(branch, ctx);
        }
        Stmt::For { var, items, body } => {
            let values: Vec<String> = match items {
                LoopItems::Literal(items) => items.clone(),
                LoopItems::Generated { items, extra } => {
                    let extra = eval_map(extra, ctx)?;
                    for_loop(items, &ctx.vars, &extra).collect()
                }
            };
            for value in values {
                ctx.locals.insert(var.clone(), value);
                if let Flow::Exit(code) = exec_block(body, ctx)? {
                    return Ok(Flow::Exit(code));
                }
            }
        }
        Stmt::Print { value, newline } => {
            let mut text = eval(value, ctx)?.into_string();
            if *newline {
                text.push('\n');
            }
            ctx.out.write_all(text.as_bytes()).context("Failed to write output")?;
        }
        Stmt::Exit(code) => {
            let code = match eval(code, ctx)? {
                Value::Status(code) => code,
                other => {
                    let text = other.into_string();
                    text.trim()
                        .parse::<i32>()
                        .with_context(|| format!("exit: numeric argument required, got '{}'", text))?
                }
            };
            return Ok(Flow::Exit(code));
        }
        Stmt::Export(name) => {
            ctx.exports.insert(name.clone());
        }
        Stmt::Pass => {}
    }
    Ok(Flow::Normal)
}

fn eval_map(pairs: &[(String, Expr)], ctx: &mut RuntimeContext) -> Result<HashMap<String, String>> {
    let mut map = HashMap::with_capacity(pairs.len());
    for (name, expr) in pairs {
        map.insert(name.clone(), eval(expr, ctx)?.into_string());
    }
    Ok(map)
}

pub fn eval(expr: &Expr, ctx: &mut RuntimeContext) -> Result<Value> {
    let value = match expr {
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Var(name) => Value::Str(ctx.vars.get(name).cloned().unwrap_or_default()),
        Expr::Local(name) => match ctx.locals.get(name) {
            Some(v) => Value::Str(v.clone()),
            None => bail!("Local '{}' read before it was bound", name),
        },
        Expr::Format { template, extra } => {
            let extra = eval_map(extra, ctx)?;
            Value::Str(format(template, &ctx.vars, &extra))
        }
        Expr::Run { command, capture } => {
            let line = eval(command, ctx)?.into_string();
            if *capture {
                log::info!("Capturing: {}", line);
                let output = capture_shell_command(&line, &ctx.vars, &ctx.shell)?;
                if output.status != 0 {
                    log::warn!("Command substitution '{}' exited with {}", line, output.status);
                }
                Value::Str(output.stdout)
            } else {
                log::info!("Executing: {}", line);
                let env = ctx.exported_env();
                ctx.out.flush().context("Failed to flush program output")?;
                Value::Status(run_shell_command(&line, &env, &ctx.shell)?)
            }
        }
        Expr::ScriptDir => {
            let dir = ctx
                .script_path
                .parent()
                .map(|p| p.display().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());
            Value::Str(dir)
        }
        Expr::Not(inner) => Value::Bool(!eval(inner, ctx)?.truthy()),
        Expr::And(left, right) => {
            let left = eval(left, ctx)?;
            if !left.truthy() { left } else { eval(right, ctx)? }
        }
        Expr::Or(left, right) => {
            let left = eval(left, ctx)?;
            if left.truthy() { left } else { eval(right, ctx)? }
        }
        Expr::Compare { op, numeric, left, right } => {
            let left = eval(left, ctx)?.into_string();
            let right = eval(right, ctx)?.into_string();
            Value::Bool(compare(*op, *numeric, &left, &right))
        }
        Expr::Test { predicate, operand } => {
            let operand = eval(operand, ctx)?.into_string();
            Value::Bool(test_predicate(*predicate, &operand))
        }
        Expr::Match { value, pattern } => {
            let value = eval(value, ctx)?.into_string();
            let pattern = eval(pattern, ctx)?.into_string();
            Value::Bool(glob_match(&value, &pattern))
        }
    };
    Ok(value)
}

fn compare(op: CompareOp, numeric: bool, left: &str, right: &str) -> bool {
    if numeric {
        let (Ok(l), Ok(r)) = (left.trim().parse::<i64>(), right.trim().parse::<i64>()) else {
            log::warn!("test: integer expression expected: '{}' '{}'", left, right);
            return false;
        };
        return apply(op, l.cmp(&r));
    }
    apply(op, left.cmp(right))
}

fn apply(op: CompareOp, ord: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        CompareOp::Eq => ord == Equal,
        CompareOp::Ne => ord != Equal,
        CompareOp::Lt => ord == Less,
        CompareOp::Le => ord != Greater,
        CompareOp::Gt => ord == Greater,
        CompareOp::Ge => ord != Less,
    }
}

fn test_predicate(predicate: Predicate, operand: &str) -> bool {
    let path = Path::new(operand);
    match predicate {
        Predicate::NonEmpty => !operand.is_empty(),
        Predicate::Empty => operand.is_empty(),
        Predicate::IsDir => path.is_dir(),
        Predicate::IsFile => path.is_file(),
        Predicate::Exists => path.exists(),
        Predicate::NonEmptyFile => path.metadata().map(|m| m.len() > 0).unwrap_or(false),
        Predicate::Executable => is_executable(path),
        Predicate::Symlink => path.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
