//! Symbol table as laid out by the front end. Globals and functions are kept in
//! separate, ordered collections; each function owns its ordered locals
//! (parameters first).
use crate::ast::Node;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    GlobalVar,
    Function,
    Parameter,
    LocalVar,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::GlobalVar => "global variable",
            Self::Function => "function",
            Self::Parameter => "parameter",
            Self::LocalVar => "local variable",
        })
    }
}

/// Resolved reference to a symbol, as stored in the tree.
///
/// `Local` indexes the locals of the function the node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "index", rename_all = "snake_case")]
pub enum SymbolRef {
    Global(usize),
    Function(usize),
    Local(usize),
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Global(index) => write!(f, "global #{index}"),
            Self::Function(index) => write!(f, "function #{index}"),
            Self::Local(index) => write!(f, "local #{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// declaration position: parameter index for parameters, local index for locals
    #[serde(default)]
    pub seq: usize,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, seq: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            seq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSymbol {
    #[serde(flatten)]
    pub symbol: Symbol,
    pub nparms: usize,
    #[serde(default)]
    pub locals: Vec<Symbol>,
    pub body: Node,
}

impl FunctionSymbol {
    pub fn new<'a>(name: impl Into<String>, params: impl IntoIterator<Item = &'a str>) -> Self {
        let locals: Vec<_> = params
            .into_iter()
            .enumerate()
            .map(|(seq, name)| Symbol::new(name, SymbolKind::Parameter, seq))
            .collect();
        Self {
            symbol: Symbol::new(name, SymbolKind::Function, 0),
            nparms: locals.len(),
            locals,
            body: Node::block([]),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    /// Reference to the `index`th parameter
    pub const fn parameter(&self, index: usize) -> SymbolRef {
        SymbolRef::Local(index)
    }

    pub fn declare_local(&mut self, name: impl Into<String>) -> SymbolRef {
        let seq = self
            .locals
            .iter()
            .filter(|local| local.kind == SymbolKind::LocalVar)
            .count();
        self.locals.push(Symbol::new(name, SymbolKind::LocalVar, seq));
        SymbolRef::Local(self.locals.len() - 1)
    }

    #[must_use]
    pub fn with_body(mut self, body: Node) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    #[serde(default)]
    pub globals: Vec<Symbol>,
    #[serde(default)]
    pub functions: Vec<FunctionSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_global(&mut self, name: impl Into<String>) -> SymbolRef {
        let index = self.globals.len();
        self.globals.push(Symbol::new(name, SymbolKind::GlobalVar, index));
        SymbolRef::Global(index)
    }

    pub fn declare_function(&mut self, function: FunctionSymbol) -> SymbolRef {
        self.functions.push(function);
        SymbolRef::Function(self.functions.len() - 1)
    }

    pub fn function_named(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions.iter().find(|f| f.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_are_numbered_apart_from_parameters() {
        let mut f = FunctionSymbol::new("f", ["a", "b"]);
        let x = f.declare_local("x");
        let y = f.declare_local("y");
        assert_eq!(x, SymbolRef::Local(2));
        assert_eq!(y, SymbolRef::Local(3));
        assert_eq!(f.locals[3].seq, 1);
        assert_eq!(f.locals[1].kind, SymbolKind::Parameter);
        assert_eq!(f.nparms, 2);
    }

    #[test]
    fn table_keeps_declaration_order() {
        let mut table = SymbolTable::new();
        table.declare_global("z");
        table.declare_global("a");
        table.declare_function(FunctionSymbol::new("g", []));
        table.declare_function(FunctionSymbol::new("f", []));
        let names: Vec<_> = table.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["z", "a"]);
        assert_eq!(table.functions[0].name(), "g");
        assert!(table.function_named("f").is_some());
        assert!(table.function_named("main").is_none());
    }

    #[test]
    fn reads_function_symbols_from_json() {
        let json = r#"{
            "globals": [{ "name": "counter", "kind": "GLOBAL_VAR" }],
            "functions": [{
                "name": "main", "kind": "FUNCTION", "nparms": 1,
                "locals": [{ "name": "x", "kind": "PARAMETER", "seq": 0 }],
                "body": { "kind": "return", "value": { "kind": "identifier", "symbol": { "scope": "local", "index": 0 } } }
            }]
        }"#;
        let table: SymbolTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.globals[0].kind, SymbolKind::GlobalVar);
        assert_eq!(table.functions[0].name(), "main");
        assert_eq!(table.functions[0].nparms, 1);
    }
}
