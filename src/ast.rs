//! Syntax tree handed over by the front end. Names are already resolved into
//! [`SymbolRef`]s, so nothing here has to be looked up by string.
use crate::symbols::SymbolRef;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Block {
        statements: Vec<Node>,
    },
    Number {
        value: i64,
    },
    /// String literal. Every occurrence gets its own string table entry.
    Text {
        value: String,
    },
    Identifier {
        symbol: SymbolRef,
    },
    Binary {
        operator: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Node>,
    },
    Assign {
        target: SymbolRef,
        /// `Some` for compound assignments like `+=`
        #[serde(default)]
        operator: Option<ArithmeticOp>,
        value: Box<Node>,
    },
    Call {
        function: SymbolRef,
        #[serde(default)]
        args: Vec<Node>,
    },
    If {
        condition: Box<Node>,
        then: Box<Node>,
        #[serde(default)]
        otherwise: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Continue,
    Print {
        items: Vec<Node>,
    },
    /// Reads one integer from standard input into a variable
    Read {
        target: SymbolRef,
    },
    Return {
        value: Box<Node>,
    },
}

impl Node {
    pub fn block(statements: impl IntoIterator<Item = Node>) -> Self {
        Self::Block {
            statements: statements.into_iter().collect(),
        }
    }
    pub const fn number(value: i64) -> Self {
        Self::Number { value }
    }
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }
    pub const fn identifier(symbol: SymbolRef) -> Self {
        Self::Identifier { symbol }
    }
    pub fn binary(operator: impl Into<BinaryOp>, lhs: Node, rhs: Node) -> Self {
        Self::Binary {
            operator: operator.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
    pub fn unary(operator: UnaryOp, operand: Node) -> Self {
        Self::Unary {
            operator,
            operand: Box::new(operand),
        }
    }
    pub fn assign(target: SymbolRef, value: Node) -> Self {
        Self::Assign {
            target,
            operator: None,
            value: Box::new(value),
        }
    }
    pub fn compound_assign(target: SymbolRef, operator: ArithmeticOp, value: Node) -> Self {
        Self::Assign {
            target,
            operator: Some(operator),
            value: Box::new(value),
        }
    }
    pub fn call(function: SymbolRef, args: impl IntoIterator<Item = Node>) -> Self {
        Self::Call {
            function,
            args: args.into_iter().collect(),
        }
    }
    pub fn if_then(condition: Node, then: Node, otherwise: Option<Node>) -> Self {
        Self::If {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }
    pub fn while_loop(condition: Node, body: Node) -> Self {
        Self::While {
            condition: Box::new(condition),
            body: Box::new(body),
        }
    }
    pub fn print(items: impl IntoIterator<Item = Node>) -> Self {
        Self::Print {
            items: items.into_iter().collect(),
        }
    }
    pub const fn read(target: SymbolRef) -> Self {
        Self::Read { target }
    }
    pub fn ret(value: Node) -> Self {
        Self::Return {
            value: Box::new(value),
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Block { .. } => "block",
            Self::Number { .. } => "number",
            Self::Text { .. } => "text",
            Self::Identifier { .. } => "identifier",
            Self::Binary { .. } => "binary",
            Self::Unary { .. } => "unary",
            Self::Assign { .. } => "assign",
            Self::Call { .. } => "call",
            Self::If { .. } => "if",
            Self::While { .. } => "while",
            Self::Continue => "continue",
            Self::Print { .. } => "print",
            Self::Read { .. } => "read",
            Self::Return { .. } => "return",
        }
    }

    /// One-line description of the node itself, without its children.
    pub fn describe(&self) -> String {
        match self {
            Self::Block { statements } => format!("block of {} statements", statements.len()),
            Self::Number { value } => format!("number {value}"),
            Self::Text { value } => format!("text {value:?}"),
            Self::Identifier { symbol } => format!("identifier {symbol}"),
            Self::Binary { operator, .. } => format!("binary `{operator}`"),
            Self::Unary { operator, .. } => format!("unary `{operator}`"),
            Self::Assign {
                target,
                operator: Some(op),
                ..
            } => format!("assignment `{op}=` to {target}"),
            Self::Assign { target, .. } => format!("assignment to {target}"),
            Self::Call { function, args } => {
                format!("call of {function} with {} arguments", args.len())
            }
            Self::If { otherwise, .. } => {
                if otherwise.is_some() {
                    "if/else statement".to_string()
                } else {
                    "if statement".to_string()
                }
            }
            Self::While { .. } => "while loop".to_string(),
            Self::Continue => "continue".to_string(),
            Self::Print { items } => format!("print of {} items", items.len()),
            Self::Read { target } => format!("read into {target}"),
            Self::Return { .. } => "return".to_string(),
        }
    }
}

/// Includes anything that is related to basic arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    /// `+` operator
    Add,
    /// `-` (binary) operator
    Subtract,
    /// '*' (binary) operator
    Multiply,
    /// `/` operator
    Divide,
    /// `%` operator
    Modulo,
}

/// Bit operations on whole 64-bit words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOp {
    /// `&` operator
    And,
    /// `|` operator
    Or,
    /// `^` operator
    Xor,
    /// `<<` operator
    LeftShift,
    /// `>>` operator (arithmetic)
    RightShift,
}

/// Relations. They always evaluate to 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Equals,
    NotEquals,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

/// Short-circuiting `and`/`or`. These operate based on equality to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    And,
    Or,
}

/// Includes any kind of operator that needs two values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", content = "op", rename_all = "snake_case")]
pub enum BinaryOp {
    Arithmetic(ArithmeticOp),
    Bit(BitOp),
    Relation(Relation),
    Logic(LogicOp),
}

impl From<ArithmeticOp> for BinaryOp {
    fn from(op: ArithmeticOp) -> Self {
        Self::Arithmetic(op)
    }
}

impl From<BitOp> for BinaryOp {
    fn from(op: BitOp) -> Self {
        Self::Bit(op)
    }
}

impl From<Relation> for BinaryOp {
    fn from(op: Relation) -> Self {
        Self::Relation(op)
    }
}

impl From<LogicOp> for BinaryOp {
    fn from(op: LogicOp) -> Self {
        Self::Logic(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Negate,
    BitNot,
    LogicNot,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Arithmetic(op) => op.fmt(f),
            Self::Bit(op) => f.write_str(match op {
                BitOp::And => "&",
                BitOp::Or => "|",
                BitOp::Xor => "^",
                BitOp::LeftShift => "<<",
                BitOp::RightShift => ">>",
            }),
            Self::Relation(op) => f.write_str(match op {
                Relation::Equals => "=",
                Relation::NotEquals => "<>",
                Relation::LessThan => "<",
                Relation::LessEqual => "<=",
                Relation::GreaterThan => ">",
                Relation::GreaterEqual => ">=",
            }),
            Self::Logic(op) => f.write_str(match op {
                LogicOp::And => "and",
                LogicOp::Or => "or",
            }),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "-",
            Self::BitNot => "~",
            Self::LogicNot => "not",
        })
    }
}
