use crate::lift::error::{LiftResult, UnhandledTranslation};
use crate::lift::expand::{Segment, Template, capture_name};
use crate::target::ast::Expr;
use std::collections::BTreeSet;

/// Picks the cheapest expression that yields the expanded text at runtime:
/// a literal, a plain variable read, the capture itself, or a `format` call.
pub fn translate_value(template: &Template, variables: &BTreeSet<String>, captures: &[Expr]) -> LiftResult<Expr> {
    if template.is_literal() {
        return Ok(Expr::Str(template.text()));
    }

    check_placeholders(template, variables, captures)?;

    match template.segments.as_slice() {
        [Segment::Var { name, .. }] => Ok(Expr::Var(name.clone())),
        [Segment::Capture { index, .. }] => Ok(captures[*index].clone()),
        _ => Ok(make_format(template, captures)),
    }
}

/// A shell command line. Placeholders from double quotes are shell-quoted
/// when the line is formatted, so their values are never re-parsed.
pub fn translate_command(template: &Template, variables: &BTreeSet<String>, captures: &[Expr]) -> LiftResult<Expr> {
    if template.is_literal() {
        return Ok(Expr::Str(template.text()));
    }
    check_placeholders(template, variables, captures)?;
    Ok(Expr::Format {
        template: template.render_command(),
        extra: capture_map(template, captures),
    })
}

/// Every placeholder must be backed by a recorded variable or capture, and
/// no variable may share a name with a capture placeholder.
pub fn check_placeholders(template: &Template, variables: &BTreeSet<String>, captures: &[Expr]) -> LiftResult<()> {
    for seg in &template.segments {
        match seg {
            Segment::Var { name, .. } if !captures.is_empty() && is_capture_name(name) => {
                return Err(UnhandledTranslation::new(
                    "placeholder collision",
                    format!("variable {} shadows a command substitution placeholder", name),
                ));
            }
            Segment::Var { name, .. } if !variables.contains(name) => {
                return Err(UnhandledTranslation::new(
                    "internal consistency",
                    format!("placeholder {{{}}} has no recorded variable", name),
                ));
            }
            Segment::Capture { index, .. } if *index >= captures.len() => {
                return Err(UnhandledTranslation::new(
                    "internal consistency",
                    format!("placeholder {{{}}} has no recorded capture", capture_name(*index)),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn make_format(template: &Template, captures: &[Expr]) -> Expr {
    Expr::Format {
        template: template.render(),
        extra: capture_map(template, captures),
    }
}

/// `cmd<i>` entries for the captures a template refers to, in index order.
fn capture_map(template: &Template, captures: &[Expr]) -> Vec<(String, Expr)> {
    let mut used: Vec<usize> = template
        .segments
        .iter()
        .filter_map(|s| match s {
            Segment::Capture { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    used.sort_unstable();
    used.dedup();
    used.into_iter()
        .filter_map(|i| captures.get(i).map(|c| (capture_name(i), c.clone())))
        .collect()
}

fn is_capture_name(name: &str) -> bool {
    name.strip_prefix("cmd")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// `cmd<i>` entries for every capture of an expansion.
pub fn all_captures(captures: &[Expr]) -> Vec<(String, Expr)> {
    captures
        .iter()
        .enumerate()
        .map(|(i, c)| (capture_name(i), c.clone()))
        .collect()
}
