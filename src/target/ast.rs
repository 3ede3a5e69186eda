/// Expressions of the generated program.
///
/// Command-like expressions (`Run` without capture) evaluate to an exit
/// status, so they are truthy on failure, the way a process return code is.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    // vars.get(name, "")
    Var(String),
    // Loop variable or the `case` subject
    Local(String),
    // format(template, vars, {extra...})
    Format {
        template: String,
        extra: Vec<(String, Expr)>,
    },
    // Run a shell command line; with `capture`, yields stdout minus one trailing newline
    Run {
        command: Box<Expr>,
        capture: bool,
    },
    // Directory of the running script, "." when it has none
    ScriptDir,
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        numeric: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Test {
        predicate: Predicate,
        operand: Box<Expr>,
    },
    // match(value, pattern): glob when the pattern has metacharacters, equality otherwise
    Match {
        value: Box<Expr>,
        pattern: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    NonEmpty,     // -n, bare word
    Empty,        // -z
    IsDir,        // -d
    IsFile,       // -f
    Exists,       // -e
    NonEmptyFile, // -s
    Executable,   // -x
    Symlink,      // -h, -L
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    // vars[name] = value
    SetVar { name: String, value: Expr },
    // Local binding, invisible to the variable map
    Let { name: String, value: Expr },
    Expr(Expr),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    For {
        var: String,
        items: LoopItems,
        body: Vec<Stmt>,
    },
    Print { value: Expr, newline: bool },
    Exit(Expr),
    // exports.add(name)
    Export(String),
    Pass,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopItems {
    Literal(Vec<String>),
    // for_loop(items, vars, {extra...})
    Generated {
        items: Vec<LoopItem>,
        extra: Vec<(String, Expr)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopItem {
    pub template: String,
    pub quoted: bool,
}

/// A translated script: the body of `main` plus the substitution names
/// collected while the macros were expanded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub substs: Vec<String>,
}

impl Expr {
    pub fn str(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    /// Logical negation that unwraps an existing negation instead of stacking one.
    pub fn negate(self) -> Self {
        match self {
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    pub fn is_negation(&self) -> bool {
        matches!(self, Expr::Not(_))
    }
}
