use std::fmt;

/// A word as it appeared in the source, quotes and `$` references intact.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub text: String,
    // Set when the word opens with a quote character ("c d", 'x').
    pub quoted: bool,
}

impl RawWord {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let quoted = text.starts_with('"') || text.starts_with('\'');
        Self { text, quoted }
    }
}

impl fmt::Display for RawWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    // "name=value" on its own
    Assignment {
        name: String,
        value: RawWord,
    },
    // "cmd arg1 arg2", with leading assignments and redirections
    SimpleCommand {
        words: Vec<RawWord>,
        assigns: Vec<(String, RawWord)>,
        redirs: Vec<Redirection>,
    },
    If {
        cond: Vec<CommandNode>,
        then_branch: Vec<CommandNode>,
        else_branch: Vec<CommandNode>,
    },
    Case {
        subject: RawWord,
        arms: Vec<CaseArm>,
    },
    ForLoop {
        var: String,
        items: Vec<RawWord>,
        body: Vec<CommandNode>,
    },
    // "a && b", "a || b"
    AndOr {
        op: AndOrOp,
        left: Box<CommandNode>,
        right: Box<CommandNode>,
    },
    // "! a | b"
    Pipeline {
        stages: Vec<CommandNode>,
        negated: bool,
    },
    // Compound command followed by redirections: "if ...; fi > log"
    Redirect {
        command: Box<CommandNode>,
        redirs: Vec<Redirection>,
    },
    // "( a; b )"
    Subshell(Vec<CommandNode>),
    // "a &"
    Async(Box<CommandNode>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AndOrOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub patterns: Vec<RawWord>,
    pub body: Vec<CommandNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redirection {
    pub fd: Option<u32>,
    pub op: RedirectMode,
    pub target: RawWord,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedirectMode {
    Overwrite, // >
    Append,    // >>
    Input,     // <
    DupOut,    // >&
    DupIn,     // <&
}

impl RedirectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectMode::Overwrite => ">",
            RedirectMode::Append => ">>",
            RedirectMode::Input => "<",
            RedirectMode::DupOut => ">&",
            RedirectMode::DupIn => "<&",
        }
    }
}

impl CommandNode {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandNode::Assignment { .. } => "assignment",
            CommandNode::SimpleCommand { .. } => "simple command",
            CommandNode::If { .. } => "if",
            CommandNode::Case { .. } => "case",
            CommandNode::ForLoop { .. } => "for",
            CommandNode::AndOr { .. } => "and-or",
            CommandNode::Pipeline { .. } => "pipeline",
            CommandNode::Redirect { .. } => "redirectlist",
            CommandNode::Subshell(_) => "subshell",
            CommandNode::Async(_) => "async command",
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, cmds: &[CommandNode]) -> fmt::Result {
    for (i, c) in cmds.iter().enumerate() {
        if i > 0 {
            write!(f, "; ")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

fn write_words(f: &mut fmt::Formatter<'_>, words: &[RawWord]) -> fmt::Result {
    for (i, w) in words.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", w)?;
    }
    Ok(())
}

/// Compact one-line rendering, used to point at the offending node in diagnostics.
impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandNode::Assignment { name, value } => write!(f, "{}={}", name, value),
            CommandNode::SimpleCommand { words, assigns, redirs } => {
                let mut first = true;
                for (name, value) in assigns {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                    first = false;
                }
                if !words.is_empty() {
                    if !first {
                        write!(f, " ")?;
                    }
                    write_words(f, words)?;
                }
                for r in redirs {
                    write!(f, " ")?;
                    if let Some(fd) = r.fd {
                        write!(f, "{}", fd)?;
                    }
                    write!(f, "{}{}", r.op.as_str(), r.target)?;
                }
                Ok(())
            }
            CommandNode::If { cond, then_branch, else_branch } => {
                write!(f, "if ")?;
                write_list(f, cond)?;
                write!(f, "; then ")?;
                write_list(f, then_branch)?;
                if !else_branch.is_empty() {
                    write!(f, "; else ")?;
                    write_list(f, else_branch)?;
                }
                write!(f, "; fi")
            }
            CommandNode::Case { subject, arms } => {
                write!(f, "case {} in", subject)?;
                for arm in arms {
                    write!(f, " ")?;
                    for (i, p) in arm.patterns.iter().enumerate() {
                        if i > 0 {
                            write!(f, "|")?;
                        }
                        write!(f, "{}", p)?;
                    }
                    write!(f, ") ")?;
                    write_list(f, &arm.body)?;
                    write!(f, ";;")?;
                }
                write!(f, " esac")
            }
            CommandNode::ForLoop { var, items, body } => {
                write!(f, "for {} in ", var)?;
                write_words(f, items)?;
                write!(f, "; do ")?;
                write_list(f, body)?;
                write!(f, "; done")
            }
            CommandNode::AndOr { op, left, right } => {
                let op_str = match op {
                    AndOrOp::And => "&&",
                    AndOrOp::Or => "||",
                };
                write!(f, "{} {} {}", left, op_str, right)
            }
            CommandNode::Pipeline { stages, negated } => {
                if *negated {
                    write!(f, "! ")?;
                }
                for (i, s) in stages.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", s)?;
                }
                Ok(())
            }
            CommandNode::Redirect { command, redirs } => {
                write!(f, "{}", command)?;
                for r in redirs {
                    write!(f, " {}{}", r.op.as_str(), r.target)?;
                }
                Ok(())
            }
            CommandNode::Subshell(cmds) => {
                write!(f, "( ")?;
                write_list(f, cmds)?;
                write!(f, " )")
            }
            CommandNode::Async(cmd) => write!(f, "{} &", cmd),
        }
    }
}
