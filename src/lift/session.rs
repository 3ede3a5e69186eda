use crate::lift::error::{LiftResult, UnhandledTranslation};
use crate::target::ast::Stmt;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static THUNK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^__thunk(\d+)__$").expect("thunk pattern is valid"));

/// Handle to a statement block registered by the macro layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Thunk {
    pub index: usize,
}

impl Thunk {
    /// The token the macro layer leaves in the shell text in place of the macro call.
    pub fn placeholder(&self) -> String {
        format!("__thunk{}__", self.index)
    }

    /// Recognises a placeholder; the whole word must be the token.
    pub fn parse(word: &str) -> Option<Thunk> {
        let caps = THUNK_RE.captures(word)?;
        let index = caps[1].parse::<usize>().ok()?;
        Some(Thunk { index })
    }
}

/// State owned by one full translation pass: the append-only thunk
/// registry and the substitution names (`AC_SUBST`) seen so far.
#[derive(Debug, Default)]
pub struct Session {
    thunks: Vec<Vec<Stmt>>,
    substs: BTreeSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, block: Vec<Stmt>) -> Thunk {
        let thunk = Thunk { index: self.thunks.len() };
        log::debug!("Registered thunk {} ({} statements)", thunk.index, block.len());
        self.thunks.push(block);
        thunk
    }

    pub fn resolve(&self, thunk: Thunk) -> LiftResult<&[Stmt]> {
        self.thunks
            .get(thunk.index)
            .map(|block| block.as_slice())
            .ok_or_else(|| UnhandledTranslation::new("unknown thunk", thunk.placeholder()))
    }

    pub fn thunk_count(&self) -> usize {
        self.thunks.len()
    }

    pub fn add_subst(&mut self, name: impl Into<String>) {
        self.substs.insert(name.into());
    }

    pub fn substs(&self) -> Vec<String> {
        self.substs.iter().cloned().collect()
    }
}
