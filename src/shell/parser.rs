use crate::shell::ast::{AndOrOp, CaseArm, CommandNode, RawWord, RedirectMode, Redirection};
use anyhow::{Result, bail};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(RawWord),
    Newline,
    AndIf, // &&
    OrIf,  // ||
    Pipe,
    Semi,
    DSemi, // ;;
    Amp,
    LParen,
    RParen,
    Redirect(Option<u32>, RedirectMode),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{}'", w.text),
            Token::Newline => "newline".to_string(),
            Token::AndIf => "'&&'".to_string(),
            Token::OrIf => "'||'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Semi => "';'".to_string(),
            Token::DSemi => "';;'".to_string(),
            Token::Amp => "'&'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Redirect(_, mode) => format!("'{}'", mode.as_str()),
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '<' | '>' | '(' | ')')
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self { chars: src.chars().collect(), pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if let Some(ch) = c {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
            }
        }
        c
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    // Line continuation
                    self.bump();
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    tokens.push(Token::Newline);
                }
                '#' => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '&' => {
                    self.bump();
                    if self.peek() == Some('&') {
                        self.bump();
                        tokens.push(Token::AndIf);
                    } else {
                        tokens.push(Token::Amp);
                    }
                }
                '|' => {
                    self.bump();
                    if self.peek() == Some('|') {
                        self.bump();
                        tokens.push(Token::OrIf);
                    } else {
                        tokens.push(Token::Pipe);
                    }
                }
                ';' => {
                    self.bump();
                    if self.peek() == Some(';') {
                        self.bump();
                        tokens.push(Token::DSemi);
                    } else {
                        tokens.push(Token::Semi);
                    }
                }
                '(' => {
                    self.bump();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.bump();
                    tokens.push(Token::RParen);
                }
                '<' | '>' => {
                    let mode = self.scan_redirect()?;
                    tokens.push(Token::Redirect(None, mode));
                }
                _ => {
                    let word = self.scan_word()?;
                    let next = self.peek();
                    if (next == Some('<') || next == Some('>')) && word.chars().all(|d| d.is_ascii_digit()) {
                        let fd = word.parse::<u32>().ok();
                        let mode = self.scan_redirect()?;
                        tokens.push(Token::Redirect(fd, mode));
                    } else {
                        tokens.push(Token::Word(RawWord::new(word)));
                    }
                }
            }
        }

        Ok(tokens)
    }

    fn scan_redirect(&mut self) -> Result<RedirectMode> {
        let line = self.line;
        let first = self.bump();
        let mode = match (first, self.peek()) {
            (Some('>'), Some('>')) => {
                self.bump();
                RedirectMode::Append
            }
            (Some('>'), Some('&')) => {
                self.bump();
                RedirectMode::DupOut
            }
            (Some('>'), Some('|')) => {
                self.bump();
                RedirectMode::Overwrite
            }
            (Some('>'), _) => RedirectMode::Overwrite,
            (Some('<'), Some('<')) => bail!("line {}: here-documents are not supported", line),
            (Some('<'), Some('&')) => {
                self.bump();
                RedirectMode::DupIn
            }
            (Some('<'), Some('>')) => bail!("line {}: '<>' redirections are not supported", line),
            _ => RedirectMode::Input,
        };
        Ok(mode)
    }

    fn scan_word(&mut self) -> Result<String> {
        let mut word = String::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() || is_operator_char(c) {
                break;
            }
            match c {
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some('\n') => {}
                        Some(next) => {
                            word.push('\\');
                            word.push(next);
                        }
                        None => word.push('\\'),
                    }
                }
                '\'' => self.scan_single(&mut word)?,
                '"' => self.scan_double(&mut word)?,
                '`' => self.scan_backquote(&mut word)?,
                '$' => self.scan_dollar(&mut word)?,
                _ => {
                    self.bump();
                    word.push(c);
                }
            }
        }

        Ok(word)
    }

    fn scan_single(&mut self, word: &mut String) -> Result<()> {
        let line = self.line;
        word.push('\'');
        self.bump();
        loop {
            match self.bump() {
                Some('\'') => {
                    word.push('\'');
                    return Ok(());
                }
                Some(c) => word.push(c),
                None => bail!("line {}: unterminated single quote", line),
            }
        }
    }

    fn scan_double(&mut self, word: &mut String) -> Result<()> {
        let line = self.line;
        word.push('"');
        self.bump();
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    word.push('"');
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some('`') => self.scan_backquote(word)?,
                Some('$') => self.scan_dollar(word)?,
                Some(c) => {
                    self.bump();
                    word.push(c);
                }
                None => bail!("line {}: unterminated double quote", line),
            }
        }
    }

    fn scan_backquote(&mut self, word: &mut String) -> Result<()> {
        let line = self.line;
        word.push('`');
        self.bump();
        loop {
            match self.bump() {
                Some('`') => {
                    word.push('`');
                    return Ok(());
                }
                Some('\\') => {
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some(c) => word.push(c),
                None => bail!("line {}: unterminated backquote", line),
            }
        }
    }

    // `$(...)`, `$((...))` and `${...}` stay inside the word verbatim.
    fn scan_dollar(&mut self, word: &mut String) -> Result<()> {
        let line = self.line;
        self.bump();
        word.push('$');
        let (open, close) = match self.peek() {
            Some('(') => ('(', ')'),
            Some('{') => ('{', '}'),
            _ => return Ok(()),
        };
        self.bump();
        word.push(open);
        let mut depth = 1;
        while depth > 0 {
            match self.bump() {
                Some('\\') => {
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some('\'') if open == '(' => {
                    word.push('\'');
                    loop {
                        match self.bump() {
                            Some('\'') => break,
                            Some(c) => word.push(c),
                            None => bail!("line {}: unterminated single quote", line),
                        }
                    }
                    word.push('\'');
                }
                Some(c) => {
                    if c == open {
                        depth += 1;
                    } else if c == close {
                        depth -= 1;
                    }
                    word.push(c);
                }
                None => bail!("line {}: unterminated '${}'", line, open),
            }
        }
        Ok(())
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_assignment(word: &RawWord) -> Option<(String, RawWord)> {
    if word.quoted {
        return None;
    }
    let idx = word.text.find('=')?;
    let name = &word.text[..idx];
    if !is_name(name) {
        return None;
    }
    Some((name.to_string(), RawWord::new(&word.text[idx + 1..])))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_keyword(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Word(w)) => Some(w.text.as_str()),
            _ => None,
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword() == Some(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            bail!("Expected '{}' but found {}", kw, self.describe_next())
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<RawWord> {
        match self.advance() {
            Some(Token::Word(w)) => Ok(w),
            Some(other) => bail!("Expected {} but found {}", what, other.describe()),
            None => bail!("Expected {} but reached end of input", what),
        }
    }

    fn describe_next(&self) -> String {
        self.peek().map(|t| t.describe()).unwrap_or_else(|| "end of input".to_string())
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn skip_separators(&mut self) {
        while self.eat(&Token::Newline) || self.eat(&Token::Semi) {}
    }

    fn at_list_end(&self, stop: &[&str]) -> bool {
        match self.peek() {
            None | Some(Token::DSemi) | Some(Token::RParen) => true,
            Some(Token::Word(w)) => stop.contains(&w.text.as_str()),
            _ => false,
        }
    }

    fn parse_list(&mut self, stop: &[&str]) -> Result<Vec<CommandNode>> {
        let mut cmds = Vec::new();
        loop {
            self.skip_separators();
            if self.at_list_end(stop) {
                break;
            }
            let node = self.parse_and_or()?;
            if self.eat(&Token::Amp) {
                cmds.push(CommandNode::Async(Box::new(node)));
                continue;
            }
            cmds.push(node);
            match self.peek() {
                Some(Token::Semi) | Some(Token::Newline) => {}
                _ if self.at_list_end(stop) => {}
                _ => bail!("Unexpected {} after command", self.describe_next()),
            }
        }
        Ok(cmds)
    }

    fn parse_and_or(&mut self) -> Result<CommandNode> {
        let mut left = self.parse_pipeline()?;
        loop {
            let op = if self.eat(&Token::AndIf) {
                AndOrOp::And
            } else if self.eat(&Token::OrIf) {
                AndOrOp::Or
            } else {
                break;
            };
            self.skip_newlines();
            let right = self.parse_pipeline()?;
            left = CommandNode::AndOr { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_pipeline(&mut self) -> Result<CommandNode> {
        let negated = self.eat_keyword("!");
        let mut stages = vec![self.parse_command()?];
        while self.eat(&Token::Pipe) {
            self.skip_newlines();
            stages.push(self.parse_command()?);
        }
        if !negated && stages.len() == 1 {
            return Ok(stages.remove(0));
        }
        Ok(CommandNode::Pipeline { stages, negated })
    }

    fn parse_command(&mut self) -> Result<CommandNode> {
        if self.eat(&Token::LParen) {
            let body = self.parse_list(&[])?;
            if !self.eat(&Token::RParen) {
                bail!("Expected ')' to close subshell but found {}", self.describe_next());
            }
            return self.wrap_redirections(CommandNode::Subshell(body));
        }

        let keyword = self.peek_keyword().map(|s| s.to_string());
        let compound = match keyword.as_deref() {
            Some("if") => {
                self.advance();
                self.parse_if_rest()?
            }
            Some("case") => self.parse_case()?,
            Some("for") => self.parse_for()?,
            Some(kw @ ("while" | "until" | "function" | "{")) => {
                bail!("'{}' is not supported", kw)
            }
            Some(_) => return self.parse_simple(),
            None => match self.peek() {
                Some(Token::Redirect(..)) => return self.parse_simple(),
                _ => bail!("Expected a command but found {}", self.describe_next()),
            },
        };
        self.wrap_redirections(compound)
    }

    fn wrap_redirections(&mut self, compound: CommandNode) -> Result<CommandNode> {
        let mut redirs = Vec::new();
        while let Some(Token::Redirect(..)) = self.peek() {
            redirs.push(self.parse_redirection()?);
        }
        if redirs.is_empty() {
            Ok(compound)
        } else {
            Ok(CommandNode::Redirect { command: Box::new(compound), redirs })
        }
    }

    fn parse_redirection(&mut self) -> Result<Redirection> {
        match self.advance() {
            Some(Token::Redirect(fd, op)) => {
                let target = self.expect_word("redirection target")?;
                Ok(Redirection { fd, op, target })
            }
            _ => bail!("Expected a redirection"),
        }
    }

    fn parse_simple(&mut self) -> Result<CommandNode> {
        let mut words = Vec::new();
        let mut assigns = Vec::new();
        let mut redirs = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Redirect(..)) => redirs.push(self.parse_redirection()?),
                Some(Token::Word(w)) => {
                    let w = w.clone();
                    self.advance();
                    if words.is_empty() {
                        if let Some(assign) = split_assignment(&w) {
                            assigns.push(assign);
                            continue;
                        }
                    }
                    words.push(w);
                }
                Some(Token::LParen) if words.len() == 1 => {
                    bail!("function definitions are not supported")
                }
                _ => break,
            }
        }

        if words.is_empty() && assigns.is_empty() && redirs.is_empty() {
            bail!("Expected a command but found {}", self.describe_next());
        }
        if words.is_empty() && redirs.is_empty() && assigns.len() == 1 {
            let (name, value) = assigns.remove(0);
            return Ok(CommandNode::Assignment { name, value });
        }
        Ok(CommandNode::SimpleCommand { words, assigns, redirs })
    }

    // Called after `if` or `elif` has been consumed; consumes the closing `fi`.
    fn parse_if_rest(&mut self) -> Result<CommandNode> {
        let cond = self.parse_list(&["then"])?;
        self.expect_keyword("then")?;
        let then_branch = self.parse_list(&["elif", "else", "fi"])?;
        let else_branch = if self.eat_keyword("elif") {
            vec![self.parse_if_rest()?]
        } else {
            let body = if self.eat_keyword("else") { self.parse_list(&["fi"])? } else { Vec::new() };
            self.expect_keyword("fi")?;
            body
        };
        Ok(CommandNode::If { cond, then_branch, else_branch })
    }

    fn parse_for(&mut self) -> Result<CommandNode> {
        self.expect_keyword("for")?;
        let var = self.expect_word("loop variable")?;
        if !is_name(&var.text) {
            bail!("Invalid for loop variable: {}", var.text);
        }
        self.skip_newlines();
        if !self.eat_keyword("in") {
            bail!("for loops without 'in' are not supported");
        }
        let mut items = Vec::new();
        while let Some(Token::Word(w)) = self.peek() {
            items.push(w.clone());
            self.advance();
        }
        self.skip_separators();
        self.expect_keyword("do")?;
        let body = self.parse_list(&["done"])?;
        self.expect_keyword("done")?;
        Ok(CommandNode::ForLoop { var: var.text, items, body })
    }

    fn parse_case(&mut self) -> Result<CommandNode> {
        self.expect_keyword("case")?;
        let subject = self.expect_word("case subject")?;
        self.skip_newlines();
        self.expect_keyword("in")?;

        let mut arms = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat_keyword("esac") {
                break;
            }
            self.eat(&Token::LParen);
            let mut patterns = vec![self.expect_word("case pattern")?];
            while self.eat(&Token::Pipe) {
                patterns.push(self.expect_word("case pattern")?);
            }
            if !self.eat(&Token::RParen) {
                bail!("Expected ')' after case pattern but found {}", self.describe_next());
            }
            let body = self.parse_list(&["esac"])?;
            arms.push(CaseArm { patterns, body });
            if !self.eat(&Token::DSemi) {
                self.skip_newlines();
                self.expect_keyword("esac")?;
                break;
            }
        }
        Ok(CommandNode::Case { subject, arms })
    }
}

/// Parses shell text into the command tree consumed by the translator.
pub fn parse_script(src: &str) -> Result<Vec<CommandNode>> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let cmds = parser.parse_list(&[])?;
    if let Some(tok) = parser.peek() {
        bail!("Unexpected {} at top level", tok.describe());
    }
    Ok(cmds)
}
