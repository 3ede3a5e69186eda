// Helper contracts the generated program relies on.

use crate::target::ast::LoopItem;
use std::collections::HashMap;

/// Fills `{name}` placeholders from `extra` first, then `vars`. Unknown
/// names become the empty string; `{{` and `}}` stand for literal braces.
/// `{name:q}` inserts the value quoted as a single shell word.
pub fn format(template: &str, vars: &HashMap<String, String>, extra: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if closed {
                    let (key, quote) = match name.strip_suffix(":q") {
                        Some(key) => (key, true),
                        None => (name.as_str(), false),
                    };
                    let value = extra.get(key).or_else(|| vars.get(key)).map(String::as_str).unwrap_or("");
                    if quote {
                        out.push_str(&shell_words::quote(value));
                    } else {
                        out.push_str(value);
                    }
                } else {
                    out.push('{');
                    out.push_str(&name);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Loop values for generated items: a quoted item yields exactly one value,
/// an unquoted one is split on whitespace after formatting.
pub fn for_loop<'a>(
    items: &'a [LoopItem],
    vars: &'a HashMap<String, String>,
    extra: &'a HashMap<String, String>,
) -> impl Iterator<Item = String> + 'a {
    items.iter().flat_map(move |item| {
        let value = format(&item.template, vars, extra);
        if item.quoted {
            vec![value]
        } else {
            value.split_whitespace().map(str::to_string).collect()
        }
    })
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// `case` pattern test: plain equality unless the pattern has glob
/// metacharacters. An invalid pattern is compared literally.
pub fn glob_match(value: &str, pattern: &str) -> bool {
    if !has_glob_meta(pattern) {
        return value == pattern;
    }
    match glob::Pattern::new(pattern) {
        Ok(p) => {
            let options = glob::MatchOptions {
                case_sensitive: true,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            };
            p.matches_with(value, options)
        }
        Err(e) => {
            log::warn!("Invalid case pattern '{}': {}", pattern, e);
            value == pattern
        }
    }
}
