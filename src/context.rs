// Evaluation context: the ordered lanes flowing through a program
//
// Every evaluator node maps a Context to a Context. A lane is either a datum or
// a captured failure; failures travel alongside ordinary values until a `?`
// drops them or the facade surfaces the first one.

use std::rc::Rc;

use thiserror::Error;

use crate::signature::SignatureError;
use crate::value::JsonValue;

/// Failures raised while a program runs.
///
/// Cloneable because a single failed lane is duplicated whenever a context
/// fans out (e.g. `.[]?, .a`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Raised by `error/0` and `error/1`; the message is exactly the argument.
    #[error("{0}")]
    Raised(String),

    #[error("unexpected identifier '{0}' used as a value")]
    UnexpectedIdentifier(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("{lhs} and {rhs} cannot be {verb} because the divisor is zero")]
    DivisionByZero {
        verb: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("{lhs} ({lhs_kind}) and {rhs} ({rhs_kind}) cannot be {verb}")]
    InvalidOperands {
        verb: &'static str,
        lhs: String,
        lhs_kind: &'static str,
        rhs: String,
        rhs_kind: &'static str,
    },

    #[error("cannot parse '{0}' as {1}")]
    Conversion(String, &'static str),

    /// A string or generated stream would exceed `utils::MAX_GENERATED_LEN`.
    #[error("{0}")]
    TooLarge(String),
}

impl RuntimeError {
    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch(message.into())
    }

    pub(crate) fn invalid_operands(verb: &'static str, lhs: &JsonValue, rhs: &JsonValue) -> Self {
        RuntimeError::InvalidOperands {
            verb,
            lhs: truncated(lhs),
            lhs_kind: lhs.kind_name(),
            rhs: truncated(rhs),
            rhs_kind: rhs.kind_name(),
        }
    }
}

/// Render a value for an error message, clipped the way jq clips them.
pub(crate) fn truncated(value: &JsonValue) -> String {
    const LIMIT: usize = 11;
    let text = value.to_string();
    if text.chars().count() <= LIMIT {
        text
    } else {
        let head: String = text.chars().take(LIMIT - 1).collect();
        format!("{}...", head)
    }
}

/// A datum inside a lane.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Resolved(JsonValue),
    /// A bare name, only meaningful as an object key (`{user}`).
    Identifier(Rc<str>),
}

impl Value {
    /// The underlying JSON value; identifiers are rejected.
    pub fn resolve(&self) -> Result<&JsonValue, RuntimeError> {
        match self {
            Value::Resolved(v) => Ok(v),
            Value::Identifier(name) => Err(RuntimeError::UnexpectedIdentifier(name.to_string())),
        }
    }

    pub fn into_resolved(self) -> Result<JsonValue, RuntimeError> {
        match self {
            Value::Resolved(v) => Ok(v),
            Value::Identifier(name) => Err(RuntimeError::UnexpectedIdentifier(name.to_string())),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Value::Resolved(v)
    }
}

/// One element of a Context.
pub type Lane = Result<Value, RuntimeError>;

/// Resolve a lane to a JSON value, surfacing its error or rejecting an identifier.
pub fn resolve_lane(lane: &Lane) -> Result<&JsonValue, RuntimeError> {
    match lane {
        Ok(value) => value.resolve(),
        Err(e) => Err(e.clone()),
    }
}

/// An ordered sequence of lanes. Order is output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    lanes: Vec<Lane>,
}

impl Context {
    pub fn new(lanes: Vec<Lane>) -> Self {
        Context { lanes }
    }

    pub fn empty() -> Self {
        Context { lanes: Vec::new() }
    }

    /// A single lane holding one JSON value.
    pub fn from_value(value: JsonValue) -> Self {
        Context {
            lanes: vec![Ok(Value::Resolved(value))],
        }
    }

    /// A single lane holding a failure.
    pub fn from_error(error: RuntimeError) -> Self {
        Context {
            lanes: vec![Err(error)],
        }
    }

    pub fn singleton(lane: Lane) -> Self {
        Context { lanes: vec![lane] }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lane> {
        self.lanes.iter()
    }

    pub fn push(&mut self, lane: Lane) {
        self.lanes.push(lane);
    }

    pub fn into_lanes(self) -> Vec<Lane> {
        self.lanes
    }

    /// Convert to plain output values, failing on the first error lane.
    pub fn into_values(self) -> Result<Vec<JsonValue>, RuntimeError> {
        self.lanes
            .into_iter()
            .map(|lane| lane.and_then(Value::into_resolved))
            .collect()
    }
}

impl Extend<Lane> for Context {
    fn extend<I: IntoIterator<Item = Lane>>(&mut self, iter: I) {
        self.lanes.extend(iter);
    }
}

impl FromIterator<Lane> for Context {
    fn from_iter<I: IntoIterator<Item = Lane>>(iter: I) -> Self {
        Context {
            lanes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Context {
    type Item = Lane;
    type IntoIter = std::vec::IntoIter<Lane>;

    fn into_iter(self) -> Self::IntoIter {
        self.lanes.into_iter()
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = &'a Lane;
    type IntoIter = std::slice::Iter<'a, Lane>;

    fn into_iter(self) -> Self::IntoIter {
        self.lanes.iter()
    }
}

/// A Context with the value currently being indexed into.
///
/// Only lives for the duration of one indexer evaluation.
#[derive(Debug, Clone, Copy)]
pub struct TargetedContext<'a> {
    pub context: &'a Context,
    pub target: &'a JsonValue,
}

impl<'a> TargetedContext<'a> {
    pub fn new(context: &'a Context, target: &'a JsonValue) -> Self {
        TargetedContext { context, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value;

    #[test]
    fn test_identifier_is_rejected_as_value() {
        let v = Value::Identifier("user".into());
        assert_eq!(
            v.resolve(),
            Err(RuntimeError::UnexpectedIdentifier("user".to_string()))
        );
        assert_eq!(Value::Resolved(json_value!(1)).resolve(), Ok(&json_value!(1)));
    }

    #[test]
    fn test_into_values_surfaces_first_error() {
        let ctx = Context::new(vec![
            Ok(Value::Resolved(json_value!(1))),
            Err(RuntimeError::Raised("first".into())),
            Err(RuntimeError::Raised("second".into())),
        ]);
        assert_eq!(ctx.into_values(), Err(RuntimeError::Raised("first".into())));
    }

    #[test]
    fn test_raised_message_is_verbatim() {
        assert_eq!(RuntimeError::Raised("msg".into()).to_string(), "msg");
    }

    #[test]
    fn test_truncated_rendering() {
        assert_eq!(truncated(&json_value!("ab")), "\"ab\"");
        assert_eq!(truncated(&json_value!("abcdefghijklmnop")), "\"abcdefghi...");
    }
}
