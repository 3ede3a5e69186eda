use crate::shell::CommandNode;
use std::fmt;

/// The single failure mode of translation. Nothing recovers from it: the
/// whole pass aborts and the caller gets the reason tag unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UnhandledTranslation {
    pub reason: &'static str,
    pub detail: String,
    pub node: Option<String>,
}

impl UnhandledTranslation {
    pub fn new(reason: &'static str, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
            node: None,
        }
    }

    pub fn with_node(mut self, node: &CommandNode) -> Self {
        self.node = Some(node.to_string());
        self
    }

    /// Attaches `node` unless a more specific one is already recorded.
    pub fn at(self, node: &CommandNode) -> Self {
        if self.node.is_some() { self } else { self.with_node(node) }
    }

    pub fn unsupported(node: &CommandNode) -> Self {
        Self::new(node.kind(), format!("unsupported {}", node.kind())).with_node(node)
    }
}

impl fmt::Display for UnhandledTranslation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnhandledTranslation: {}", self.reason)?;
        if !self.detail.is_empty() && self.detail != self.reason {
            write!(f, " ({})", self.detail)?;
        }
        if let Some(node) = &self.node {
            write!(f, ": {}", node)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnhandledTranslation {}

pub type LiftResult<T> = Result<T, UnhandledTranslation>;
