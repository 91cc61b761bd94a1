// Lowering pass
// Structural transform from parsed statements to the evaluator tree

use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::ast::{Expr, Field, Indexer, Statement};
use crate::context::RuntimeError;
use crate::evaluator::{FieldNode, FieldValue, IndexerNode, Node};
use crate::functions::{Builtin, Derived};
use crate::signature::Signature;
use crate::utils::ensure_sufficient_stack;

/// Syntactically valid programs this crate cannot run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoweringError {
    #[error("program contains no expression")]
    NoExpression,

    #[error("program must contain exactly one expression, found {0}")]
    MultipleExpressions(usize),

    #[error("function definitions are not supported (def {0})")]
    FunctionDefinition(String),

    #[error("unsupported expression: {0}")]
    Unsupported(&'static str),

    #[error("unknown indexer: a slice needs at least one bound")]
    UnknownIndexer,
}

/// Lower a parsed program. Exactly one top-level expression is accepted.
pub fn lower(statements: &[Statement]) -> Result<Node, LoweringError> {
    let mut expressions = Vec::with_capacity(statements.len());
    for statement in statements {
        match statement {
            Statement::Expr(expr) => expressions.push(expr),
            Statement::FunctionDefinition { name, .. } => {
                return Err(LoweringError::FunctionDefinition(name.clone()))
            }
        }
    }

    match expressions.as_slice() {
        [] => Err(LoweringError::NoExpression),
        [expr] => lower_expr(expr),
        many => Err(LoweringError::MultipleExpressions(many.len())),
    }
}

/// Lower one expression tree.
pub fn lower_expr(expr: &Expr) -> Result<Node, LoweringError> {
    ensure_sufficient_stack(|| {
        Ok(match expr {
            Expr::Literal(lit) => Node::Literal(lit.to_value()),
            Expr::Identifier(name) => Node::Identifier(Rc::from(name.as_str())),
            Expr::Identity => Node::Identity,
            Expr::RecursiveDescent => return Err(LoweringError::Unsupported("recursive descent (..)")),
            Expr::Array(elements) => Node::Array(lower_all(elements)?),
            Expr::Object(fields) => Node::Object(
                fields
                    .iter()
                    .map(lower_field)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Expr::Indexed { target, indexer } => Node::Indexed {
                target: Box::new(lower_expr(target)?),
                indexer: lower_indexer(indexer)?,
            },
            Expr::FunctionCall { name, args } => lower_call(name, lower_all(args)?),
            Expr::Binary { op, lhs, rhs } => Node::Binary {
                op: *op,
                lhs: Box::new(lower_expr(lhs)?),
                rhs: Box::new(lower_expr(rhs)?),
            },
            Expr::Parallel(branches) => Node::Parallel(lower_all(branches)?),
            Expr::Piped(stages) => Node::Piped(lower_all(stages)?),
            Expr::Optional(inner) => Node::TryCatch(Box::new(lower_expr(inner)?)),
        })
    })
}

fn lower_all(exprs: &[Expr]) -> Result<Vec<Node>, LoweringError> {
    exprs.iter().map(lower_expr).collect()
}

// `{key}` pairs the key with a key indexer over that same key expression.
fn lower_field(field: &Field) -> Result<FieldNode, LoweringError> {
    let value = match &field.value {
        Some(value) => FieldValue::Expr(lower_expr(value)?),
        None => FieldValue::Shorthand(IndexerNode::Key(Box::new(lower_expr(&field.key)?))),
    };
    Ok(FieldNode {
        key: lower_expr(&field.key)?,
        value,
    })
}

fn lower_indexer(indexer: &Indexer) -> Result<IndexerNode, LoweringError> {
    Ok(match indexer {
        Indexer::Key(key) => IndexerNode::Key(Box::new(lower_expr(key)?)),
        Indexer::Slice {
            first: None,
            last: None,
        } => return Err(LoweringError::UnknownIndexer),
        Indexer::Slice { first, last } => IndexerNode::Slice {
            start: lower_bound(first.as_deref())?,
            end: lower_bound(last.as_deref())?,
        },
        Indexer::Spread => IndexerNode::Spread,
    })
}

fn lower_bound(bound: Option<&Expr>) -> Result<Option<Box<Node>>, LoweringError> {
    bound.map(|expr| lower_expr(expr).map(Box::new)).transpose()
}

// Unknown names and arity mismatches still lower; the call fails on every lane
// it is applied to.
fn lower_call(name: &str, args: Vec<Node>) -> Node {
    if let Some(derived) = Derived::from_name(name) {
        return with_arity(derived.signature(), args, |args| Node::Derived {
            derived,
            body: Box::new(derived_body(derived, args)),
        });
    }

    match Builtin::from_name(name) {
        Some(builtin) => with_arity(builtin.signature(), args, |args| Node::Call { builtin, args }),
        None => {
            trace!(function = name, arity = args.len(), "unknown function lowered to a failing call");
            Node::Unresolved {
                name: name.to_string(),
                args,
                reason: RuntimeError::UnknownFunction(name.to_string()),
            }
        }
    }
}

fn with_arity(signature: Signature, args: Vec<Node>, build: impl FnOnce(Vec<Node>) -> Node) -> Node {
    match signature.validate_arg_count(args.len()) {
        Ok(()) => build(args),
        Err(e) => {
            trace!(function = signature.name, arity = args.len(), "arity mismatch lowered to a failing call");
            Node::Unresolved {
                name: signature.name.to_string(),
                args,
                reason: e.into(),
            }
        }
    }
}

fn spread_input() -> Node {
    Node::Indexed {
        target: Box::new(Node::Identity),
        indexer: IndexerNode::Spread,
    }
}

// `map(f)`: [.[] | f]
fn map_body(filter: Vec<Node>) -> Node {
    let mut stages = vec![spread_input()];
    stages.extend(filter);
    Node::Array(vec![Node::Piped(stages)])
}

fn derived_body(derived: Derived, filter: Vec<Node>) -> Node {
    match derived {
        Derived::Map => map_body(filter),
        Derived::WithEntries => Node::Piped(vec![
            Node::Call {
                builtin: Builtin::ToEntries,
                args: vec![],
            },
            map_body(filter),
            Node::Call {
                builtin: Builtin::FromEntries,
                args: vec![],
            },
        ]),
    }
}
