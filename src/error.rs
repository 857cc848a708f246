use crate::ast::Node;
use crate::symbols::{SymbolKind, SymbolRef};

use itertools::Itertools;
use std::error;
use std::fmt;
use thiserror::Error;

/// An error with the node it was found at and what the generator was doing
/// when it happened.
#[derive(Debug, Clone)]
pub struct Error<T> {
    pub kind: T,
    node: Option<String>,
    contexts: Vec<String>,
}

impl<T> Error<T> {
    pub const fn new(kind: T) -> Self {
        Self {
            kind,
            node: None,
            contexts: Vec::new(),
        }
    }
    /// The node given is only applied if there was no node already
    #[must_use]
    pub fn with_backup_node(self, node: &Node) -> Self {
        if self.node.is_some() {
            self
        } else {
            self.with_node(node)
        }
    }
    #[must_use]
    pub fn with_node(mut self, node: &Node) -> Self {
        self.node = Some(node.describe());
        self
    }
    #[must_use]
    pub fn add_context(mut self, ctx: impl Into<String>) -> Self {
        self.contexts.push(ctx.into());
        self
    }
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }
    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }
}

impl<T> From<T> for Error<T> {
    fn from(kind: T) -> Self {
        Self::new(kind)
    }
}

impl<T: error::Error + 'static> error::Error for Error<T> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl<T: fmt::Display> fmt::Display for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let whiles = self
            .contexts
            .iter()
            .map(|ctx| format!("\nwhile {ctx}"))
            .join("");
        match &self.node {
            Some(node) => write!(f, "{}\n   --> at {}{}", self.kind, node, whiles),
            None => write!(f, "{}(no node info){}", self.kind, whiles),
        }
    }
}

/// Bugs in the compiler or in the front end's hand-off. None of these is the
/// user's fault, and none of them can be skipped over.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("a {kind} node cannot be used as a value")]
    NotAnExpression { kind: &'static str },
    #[error("symbol {name:?} is a {found} where a {expected} was expected")]
    InconsistentSymbol {
        name: String,
        found: SymbolKind,
        expected: &'static str,
    },
    #[error("unresolved symbol reference: {0}")]
    UnresolvedSymbol(SymbolRef),
    #[error("function {name:?} takes {expected} arguments but the call passes {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("parameter {name:?} has position {seq} but its function declares {nparms} parameters")]
    ParameterOutOfRange {
        name: String,
        seq: usize,
        nparms: usize,
    },
    #[error("cannot continue if not inside a loop")]
    UnwantedContinue,
    #[error("the program declares no functions, there is nothing to call on entry")]
    NoFunctions,
}

pub type CodegenResult<T> = Result<T, Error<CodegenError>>;
