// Abstract Syntax Tree definitions
// The parsed form of a query program, consumed by the lowering pass

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::value::JsonValue;

/// Scalar literal written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Literal {
    pub fn to_value(&self) -> JsonValue {
        match self {
            Literal::Null => JsonValue::Null,
            Literal::Bool(b) => JsonValue::Bool(*b),
            Literal::Number(n) => JsonValue::Number(*n),
            Literal::String(s) => JsonValue::string(s.as_str()),
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Number, string, boolean or null literal
    Literal(Literal),

    /// Bare name in object-key position (`{user}`, `{user: 1}`) or as a field (`.user`)
    Identifier(String),

    /// `.`
    Identity,

    /// `..` (parsed but not evaluable)
    RecursiveDescent,

    /// `[a, b, ...]`; an empty vector is `[]`
    Array(Vec<Expr>),

    /// `{k: v, k2, ...}`
    Object(Vec<Field>),

    /// `target.key`, `target[..]`, `target[a:b]`, `target[]`
    Indexed {
        target: Box<Expr>,
        indexer: Indexer,
    },

    /// `name` or `name(a; b)`
    FunctionCall { name: String, args: Vec<Expr> },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// `a, b, ...`
    Parallel(Vec<Expr>),

    /// `a | b | ...`
    Piped(Vec<Expr>),

    /// `expr?`
    Optional(Box<Expr>),
}

/// One `key: value` entry of an object constructor.
///
/// `value` is absent for the shorthand form `{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: Expr,
    pub value: Option<Expr>,
}

/// Suffix applied to an indexed target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Indexer {
    /// `.[k]`, `.name`
    Key(Box<Expr>),
    /// `.[a:b]` with either bound optional
    Slice {
        first: Option<Box<Expr>>,
        last: Option<Box<Expr>>,
    },
    /// `.[]`
    Spread,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical
    And,
    Or,

    // `//`
    Alternative,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Alternative => "//",
        }
    }
}

/// Top-level program item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Expr(Expr),
    /// `def name(params): body;`
    FunctionDefinition {
        name: String,
        params: Vec<String>,
        body: Expr,
    },
}

impl Expr {
    /// Create a string literal node
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }

    /// Create a number literal node
    pub fn number(n: f64) -> Self {
        Expr::Literal(Literal::Number(n))
    }

    /// Create a boolean literal node
    pub fn boolean(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }

    /// Create a null literal node
    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// `.name`
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Indexed {
            target: Box::new(Expr::Identity),
            indexer: Indexer::Key(Box::new(Expr::Identifier(name.into()))),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Debug representation
    pub fn dump(&self) -> serde_json::Value {
        match self {
            Expr::Literal(lit) => serde_json::Value::from(&lit.to_value()),
            Expr::Identifier(name) => json!({ "id": name }),
            Expr::Identity => json!({ "identity": 0 }),
            Expr::RecursiveDescent => json!({ "recursiveDescendant": 0 }),
            Expr::Array(elements) => {
                json!({ "array": elements.iter().map(Expr::dump).collect::<Vec<_>>() })
            }
            Expr::Object(fields) => {
                json!({ "object": fields.iter().map(Field::dump).collect::<Vec<_>>() })
            }
            Expr::Indexed { target, indexer } => {
                json!({ "indexing": target.dump(), "indexer": indexer.dump() })
            }
            Expr::FunctionCall { name, args } => {
                let mut call = serde_json::Map::new();
                call.insert(
                    name.clone(),
                    args.iter().map(Expr::dump).collect::<Vec<_>>().into(),
                );
                json!({ "call": call })
            }
            Expr::Binary { op, lhs, rhs } => {
                let mut binary = serde_json::Map::new();
                binary.insert(op.symbol().to_string(), json!([lhs.dump(), rhs.dump()]));
                serde_json::Value::Object(binary)
            }
            Expr::Parallel(exprs) => {
                json!({ "parallel": exprs.iter().map(Expr::dump).collect::<Vec<_>>() })
            }
            Expr::Piped(exprs) => {
                json!({ "piped": exprs.iter().map(Expr::dump).collect::<Vec<_>>() })
            }
            Expr::Optional(inner) => json!({ "optional": inner.dump() }),
        }
    }
}

impl Field {
    pub fn dump(&self) -> serde_json::Value {
        json!({
            "key": self.key.dump(),
            "value": self.value.as_ref().map(Expr::dump),
        })
    }
}

impl Indexer {
    pub fn dump(&self) -> serde_json::Value {
        match self {
            Indexer::Key(key) => json!({ "key": key.dump() }),
            Indexer::Slice { first, last } => json!([
                first.as_ref().map_or_else(|| json!("start"), |e| e.dump()),
                last.as_ref().map_or_else(|| json!("last"), |e| e.dump()),
            ]),
            Indexer::Spread => json!({ "spread": 0 }),
        }
    }
}

impl Statement {
    pub fn dump(&self) -> serde_json::Value {
        match self {
            Statement::Expr(expr) => expr.dump(),
            Statement::FunctionDefinition { name, params, body } => json!({
                "def": { "name": name, "params": params, "body": body.dump() }
            }),
        }
    }
}

/// Debug representation of a whole program
pub fn dump_statements(statements: &[Statement]) -> serde_json::Value {
    json!({ "statements": statements.iter().map(Statement::dump).collect::<Vec<_>>() })
}
