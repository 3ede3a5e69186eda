// Symbolic word expansion: variable references and command substitutions
// are recorded and replaced by placeholders, nothing is ever executed.

use crate::lift::error::{LiftResult, UnhandledTranslation};
use crate::shell::RawWord;
use crate::target::ast::Expr;
use std::collections::BTreeSet;
use std::mem;

/// One piece of an expanded word. `quoted` records whether the piece came
/// from a quoted or escaped context in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text { text: String, quoted: bool },
    Var { name: String, quoted: bool },
    Capture { index: usize, quoted: bool },
}

/// An expanded word: literal text interleaved with placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn push_char(&mut self, c: char, quoted: bool) {
        if let Some(Segment::Text { text, quoted: q }) = self.segments.last_mut() {
            if *q == quoted {
                text.push(c);
                return;
            }
        }
        self.segments.push(Segment::Text { text: c.to_string(), quoted });
    }

    pub fn push_str(&mut self, s: &str, quoted: bool) {
        for c in s.chars() {
            self.push_char(c, quoted);
        }
    }

    pub fn append(&mut self, other: &Template) {
        for seg in &other.segments {
            match seg {
                Segment::Text { text, quoted } => self.push_str(text, *quoted),
                _ => self.segments.push(seg.clone()),
            }
        }
    }

    pub fn join(parts: &[Template], sep: &str) -> Template {
        let mut out = Template::default();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.push_str(sep, false);
            }
            out.append(part);
        }
        out
    }

    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Text { .. }))
    }

    /// Concatenated literal text, placeholders skipped.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            if let Segment::Text { text, .. } = seg {
                out.push_str(text);
            }
        }
        out
    }

    /// The runtime format string: `{name}` for variables, `{cmd<i>}` for
    /// captures, literal braces doubled.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Text { text, .. } => {
                    for c in text.chars() {
                        match c {
                            '{' => out.push_str("{{"),
                            '}' => out.push_str("}}"),
                            _ => out.push(c),
                        }
                    }
                }
                Segment::Var { name, .. } => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                Segment::Capture { index, .. } => out.push_str(&format!("{{{}}}", capture_name(*index))),
            }
        }
        out
    }

    /// Command line form of `render`: placeholders that came from double
    /// quotes become `{name:q}` so their value is shell-quoted at runtime.
    pub fn render_command(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Var { quoted: true, .. } | Segment::Capture { quoted: true, .. } => {
                    let plain = Template { segments: vec![seg.clone()] }.render();
                    out.push_str(&plain[..plain.len() - 1]);
                    out.push_str(":q}");
                }
                _ => out.push_str(&Template { segments: vec![seg.clone()] }.render()),
            }
        }
        out
    }

    /// Rewrites the word for a shell command line: text quoted in the source
    /// is re-quoted, placeholders keep their quoting flag for `render_command`.
    pub fn shell_word(&self, word_quoted: bool) -> Template {
        let mut out = Template::default();
        for seg in &self.segments {
            match seg {
                Segment::Text { text, quoted: true } => {
                    out.push_str(&shell_words::quote(text), false);
                }
                Segment::Text { text, quoted: false } => out.push_str(text, false),
                _ => out.segments.push(seg.clone()),
            }
        }
        if word_quoted && out.segments.is_empty() {
            out.push_str("''", false);
        }
        out
    }

    /// Whether a loop item's runtime value is split into fields: `Some(false)`
    /// when every placeholder is quoted, `Some(true)` when only unquoted
    /// expansions could produce whitespace, `None` when quoted and unquoted
    /// parts would need different treatment.
    pub fn field_split(&self) -> Option<bool> {
        let unquoted = self.segments.iter().any(|s| {
            matches!(s, Segment::Var { quoted: false, .. } | Segment::Capture { quoted: false, .. })
        });
        if !unquoted {
            return Some(false);
        }
        let mixed = self.segments.iter().any(|s| match s {
            Segment::Var { quoted, .. } | Segment::Capture { quoted, .. } => *quoted,
            Segment::Text { text, quoted } => *quoted && text.contains(char::is_whitespace),
        });
        if mixed { None } else { Some(true) }
    }

    /// Case pattern form: quoted text is glob-escaped so it matches literally.
    pub fn glob_pattern(&self) -> Template {
        let mut out = Template::default();
        for seg in &self.segments {
            match seg {
                Segment::Text { text, quoted: true } => {
                    out.push_str(&glob::Pattern::escape(text), false);
                }
                _ => out.append(&Template { segments: vec![seg.clone()] }),
            }
        }
        out
    }

    /// Splits `name=value` at the first `=`; the name must be literal.
    pub fn split_assignment(&self) -> Option<(String, Template)> {
        let mut name = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            let Segment::Text { text, quoted } = seg else {
                return None;
            };
            if let Some(idx) = text.find('=') {
                name.push_str(&text[..idx]);
                let mut value = Template::default();
                value.push_str(&text[idx + 1..], *quoted);
                for rest in &self.segments[i + 1..] {
                    value.append(&Template { segments: vec![rest.clone()] });
                }
                return Some((name, value));
            }
            name.push_str(text);
        }
        None
    }
}

pub fn capture_name(index: usize) -> String {
    format!("cmd{}", index)
}

/// A word after expansion. `quoted` is only tracked when the caller asked
/// to remember quoting (loop items).
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedWord {
    pub template: Template,
    pub quoted: bool,
}

/// Result of expanding a word list; the variable set and capture list
/// cover every word of the list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordExpansion {
    pub words: Vec<ExpandedWord>,
    pub variables: BTreeSet<String>,
    pub captures: Vec<Expr>,
}

impl WordExpansion {
    pub fn is_static(&self) -> bool {
        self.variables.is_empty() && self.captures.is_empty()
    }
}

/// Result of expanding one assignment value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpansionResult {
    pub template: Template,
    pub variables: BTreeSet<String>,
    pub captures: Vec<Expr>,
}

impl ExpansionResult {
    pub fn text(&self) -> String {
        self.template.render()
    }
}

/// What to do with a command substitution met during expansion.
pub trait SubstitutionSink {
    fn substitute(&mut self, command: &str) -> LiftResult<Expr>;
}

/// Default sink: the script-directory idiom becomes a path expression,
/// every other command becomes a deferred "run and capture stdout" call.
pub struct CaptureSink;

impl SubstitutionSink for CaptureSink {
    fn substitute(&mut self, command: &str) -> LiftResult<Expr> {
        let command = command.trim();
        if is_script_dir_idiom(command) {
            return Ok(Expr::ScriptDir);
        }
        if command.is_empty() {
            return Err(UnhandledTranslation::new("empty command substitution", "$()"));
        }
        Ok(Expr::Run {
            command: Box::new(Expr::str(command)),
            capture: true,
        })
    }
}

fn is_script_dir_idiom(command: &str) -> bool {
    let parts: Vec<&str> = command.split_whitespace().collect();
    matches!(parts.as_slice(), ["dirname", "$0"] | ["dirname", "\"$0\""])
}

/// Variable lookups during expansion: records the key and hands back the
/// placeholder name instead of a value. Digits map to `argv<N>`.
#[derive(Debug, Default)]
struct TrackingEnv {
    used: BTreeSet<String>,
}

impl TrackingEnv {
    fn get(&mut self, key: &str) -> String {
        let name = if key.chars().all(|c| c.is_ascii_digit()) {
            format!("argv{}", key)
        } else {
            key.to_string()
        };
        self.used.insert(name.clone());
        name
    }
}

pub struct Evaluator {
    sink: Box<dyn SubstitutionSink>,
    env: TrackingEnv,
    captures: Vec<Expr>,
}

impl Evaluator {
    pub fn new(sink: Box<dyn SubstitutionSink>) -> Self {
        Self {
            sink,
            env: TrackingEnv::default(),
            captures: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.env.used.clear();
        self.captures.clear();
    }

    fn drain(&mut self) -> (BTreeSet<String>, Vec<Expr>) {
        (mem::take(&mut self.env.used), mem::take(&mut self.captures))
    }

    pub fn expand_words(&mut self, words: &[RawWord], remember_quoting: bool) -> LiftResult<WordExpansion> {
        self.reset();
        let mut expanded = Vec::with_capacity(words.len());
        for word in words {
            let result = self.expand_single(word);
            let template = match result {
                Ok(t) => t,
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            expanded.push(ExpandedWord {
                template,
                quoted: remember_quoting && word.quoted,
            });
        }
        let (variables, captures) = self.drain();
        Ok(WordExpansion { words: expanded, variables, captures })
    }

    pub fn expand_value(&mut self, word: &RawWord) -> LiftResult<ExpansionResult> {
        self.reset();
        let template = match self.expand_single(word) {
            Ok(t) => t,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };
        let (variables, captures) = self.drain();
        Ok(ExpansionResult { template, variables, captures })
    }

    // No field splitting: one word always expands to one template.
    fn expand_single(&mut self, word: &RawWord) -> LiftResult<Template> {
        let chars: Vec<char> = word.text.chars().collect();
        let mut out = Template::default();
        let mut pos = 0;

        if chars.first() == Some(&'~') && (chars.len() == 1 || chars[1] == '/') {
            let name = self.env.get("HOME");
            out.segments.push(Segment::Var { name, quoted: false });
            pos = 1;
        }

        while pos < chars.len() {
            match chars[pos] {
                '\\' => {
                    match chars.get(pos + 1) {
                        Some('\n') | None => {}
                        Some(&next) => out.push_char(next, true),
                    }
                    pos += 2;
                }
                '\'' => {
                    pos += 1;
                    let start = pos;
                    while pos < chars.len() && chars[pos] != '\'' {
                        pos += 1;
                    }
                    if pos >= chars.len() {
                        return Err(UnhandledTranslation::new("unterminated quote", word.text.clone()));
                    }
                    let quoted: String = chars[start..pos].iter().collect();
                    out.push_str(&quoted, true);
                    pos += 1;
                }
                '"' => pos = self.expand_double(&chars, pos + 1, &mut out, word)?,
                '$' => pos = self.expand_dollar(&chars, pos, false, &mut out, word)?,
                '`' => pos = self.expand_backquote(&chars, pos, false, &mut out, word)?,
                c => {
                    out.push_char(c, false);
                    pos += 1;
                }
            }
        }

        Ok(out)
    }

    fn expand_double(&mut self, chars: &[char], mut pos: usize, out: &mut Template, word: &RawWord) -> LiftResult<usize> {
        while pos < chars.len() {
            match chars[pos] {
                '"' => return Ok(pos + 1),
                '\\' => match chars.get(pos + 1) {
                    // Line continuation
                    Some('\n') => pos += 2,
                    Some(&next) if matches!(next, '$' | '`' | '"' | '\\') => {
                        out.push_char(next, true);
                        pos += 2;
                    }
                    _ => {
                        out.push_char('\\', true);
                        pos += 1;
                    }
                },
                '$' => pos = self.expand_dollar(chars, pos, true, out, word)?,
                '`' => pos = self.expand_backquote(chars, pos, true, out, word)?,
                c => {
                    out.push_char(c, true);
                    pos += 1;
                }
            }
        }
        Err(UnhandledTranslation::new("unterminated quote", word.text.clone()))
    }

    fn expand_dollar(&mut self, chars: &[char], pos: usize, quoted: bool, out: &mut Template, word: &RawWord) -> LiftResult<usize> {
        match chars.get(pos + 1) {
            Some('(') => {
                if chars.get(pos + 2) == Some(&'(') {
                    return Err(UnhandledTranslation::new("arithmetic expansion", word.text.clone()));
                }
                let end = find_closing_paren(chars, pos + 2)
                    .ok_or_else(|| UnhandledTranslation::new("unterminated command substitution", word.text.clone()))?;
                let command: String = chars[pos + 2..end].iter().collect();
                self.capture(&command, quoted, out)?;
                Ok(end + 1)
            }
            Some('{') => {
                let mut end = pos + 2;
                while end < chars.len() && chars[end] != '}' {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(UnhandledTranslation::new("unterminated parameter expansion", word.text.clone()));
                }
                let inner: String = chars[pos + 2..end].iter().collect();
                if is_param_name(&inner) {
                    let name = self.env.get(&inner);
                    out.segments.push(Segment::Var { name, quoted });
                    Ok(end + 1)
                } else if inner.len() == 1 && is_special_param(inner.chars().next().unwrap_or(' ')) {
                    Err(UnhandledTranslation::new("special parameter", format!("${{{}}}", inner)))
                } else {
                    Err(UnhandledTranslation::new("parameter operator", format!("${{{}}}", inner)))
                }
            }
            Some(&c) if c.is_ascii_digit() => {
                let name = self.env.get(&c.to_string());
                out.segments.push(Segment::Var { name, quoted });
                Ok(pos + 2)
            }
            Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = pos + 1;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let raw: String = chars[pos + 1..end].iter().collect();
                let name = self.env.get(&raw);
                out.segments.push(Segment::Var { name, quoted });
                Ok(end)
            }
            Some(&c) if is_special_param(c) => {
                Err(UnhandledTranslation::new("special parameter", format!("${}", c)))
            }
            _ => {
                out.push_char('$', quoted);
                Ok(pos + 1)
            }
        }
    }

    fn expand_backquote(&mut self, chars: &[char], pos: usize, quoted: bool, out: &mut Template, word: &RawWord) -> LiftResult<usize> {
        let mut command = String::new();
        let mut i = pos + 1;
        while i < chars.len() {
            match chars[i] {
                '`' => {
                    self.capture(&command, quoted, out)?;
                    return Ok(i + 1);
                }
                '\\' if matches!(chars.get(i + 1), Some('$') | Some('`') | Some('\\')) => {
                    command.push(chars[i + 1]);
                    i += 2;
                }
                c => {
                    command.push(c);
                    i += 1;
                }
            }
        }
        Err(UnhandledTranslation::new("unterminated command substitution", word.text.clone()))
    }

    fn capture(&mut self, command: &str, quoted: bool, out: &mut Template) -> LiftResult<()> {
        let expr = self.sink.substitute(command)?;
        let index = self.captures.len();
        log::debug!("Captured command substitution {} as {}", command.trim(), capture_name(index));
        self.captures.push(expr);
        out.segments.push(Segment::Capture { index, quoted });
        Ok(())
    }
}

fn is_param_name(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_special_param(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '$' | '!' | '-')
}

fn find_closing_paren(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 1;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
