// Evaluator tree
// The executable form of a program: immutable nodes mapping a Context to a Context

use std::rc::Rc;

use serde_json::json;

use crate::ast::BinaryOp;
use crate::context::{resolve_lane, truncated, Context, Lane, RuntimeError, TargetedContext, Value};
use crate::functions::{Builtin, Derived, Shape};
use crate::operators;
use crate::utils::{cartesian, ensure_sufficient_stack};
use crate::value::{JsonValue, Map};

/// One evaluator node. Built once by lowering, reused for every input.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Constant; one copy per input lane
    Literal(JsonValue),

    /// Bare name, usable only as an object key
    Identifier(Rc<str>),

    Identity,

    /// `[...]`: all element outputs collected into one array per lane
    Array(Vec<Node>),

    /// `{...}`
    Object(Vec<FieldNode>),

    /// Evaluate `target`, then apply `indexer` to each target value
    Indexed {
        target: Box<Node>,
        indexer: IndexerNode,
    },

    /// Natively implemented built-in
    Call { builtin: Builtin, args: Vec<Node> },

    /// Built-in expanded into a subtree at lowering time
    Derived { derived: Derived, body: Box<Node> },

    /// Call that cannot succeed: unknown name or wrong arity. Fails per lane at run time.
    Unresolved {
        name: String,
        args: Vec<Node>,
        reason: RuntimeError,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    /// `a, b`: every branch sees the same input; outputs concatenate in branch order
    Parallel(Vec<Node>),

    /// `a | b`
    Piped(Vec<Node>),

    /// `expr?`: drops error lanes
    TryCatch(Box<Node>),
}

/// One field of an object constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub key: Node,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Expr(Node),
    /// `{user}`: index the current value by the key expression
    Shorthand(IndexerNode),
}

/// Indexers run against a TargetedContext.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexerNode {
    Key(Box<Node>),
    Slice {
        start: Option<Box<Node>>,
        end: Option<Box<Node>>,
    },
    Spread,
}

// ── Lane helpers ─────────────────────────────────────────────────────────────

fn resolved(value: JsonValue) -> Lane {
    Ok(Value::Resolved(value))
}

/// Apply `f` to every non-error lane; error lanes pass through untouched.
fn map_lanes<F>(ctx: &Context, mut f: F) -> Context
where
    F: FnMut(&Lane, &Value) -> Vec<Lane>,
{
    let mut out = Context::empty();
    for lane in ctx {
        match lane {
            Ok(value) => out.extend(f(lane, value)),
            Err(e) => out.push(Err(e.clone())),
        }
    }
    out
}

/// The shared broadcast combinator.
///
/// For each lane, every operand is evaluated against a singleton context of that
/// lane and the operand streams are expanded left-major; `combine` receives the
/// lane's value and one tuple of operand lanes at a time. Error lanes are passed
/// through without evaluating any operand.
fn broadcast<F>(ctx: &Context, operands: &[&Node], mut combine: F) -> Context
where
    F: FnMut(&Value, &[&Lane]) -> Vec<Lane>,
{
    map_lanes(ctx, |lane, value| {
        let single = Context::singleton(lane.clone());
        let streams: Vec<Vec<Lane>> = operands
            .iter()
            .map(|node| node.evaluate(&single).into_lanes())
            .collect();
        cartesian(&streams)
            .into_iter()
            .flat_map(|combo| combine(value, &combo))
            .collect()
    })
}

fn resolve_all<'a>(lanes: &[&'a Lane]) -> Result<Vec<&'a JsonValue>, RuntimeError> {
    lanes.iter().map(|&lane| resolve_lane(lane)).collect()
}

// ── Evaluation ───────────────────────────────────────────────────────────────

impl Node {
    /// Evaluate against a whole context.
    pub fn evaluate(&self, ctx: &Context) -> Context {
        ensure_sufficient_stack(|| self.evaluate_node(ctx))
    }

    fn evaluate_node(&self, ctx: &Context) -> Context {
        match self {
            Node::Literal(value) => map_lanes(ctx, |_, _| vec![resolved(value.clone())]),
            Node::Identifier(name) => {
                map_lanes(ctx, |_, _| vec![Ok(Value::Identifier(Rc::clone(name)))])
            }
            Node::Identity => ctx.clone(),
            Node::Array(elements) => map_lanes(ctx, |lane, _| vec![build_array(elements, lane)]),
            Node::Object(fields) => map_lanes(ctx, |lane, value| {
                match build_objects(fields, lane, value) {
                    Ok(objects) => objects
                        .into_iter()
                        .map(|map| resolved(JsonValue::object(map)))
                        .collect(),
                    Err(e) => vec![Err(e)],
                }
            }),
            Node::Indexed { target, indexer } => {
                map_lanes(ctx, |lane, _| index_lane(target, indexer, lane))
            }
            Node::Call { builtin, args } => call_builtin(*builtin, args, ctx),
            Node::Derived { body, .. } => body.evaluate(ctx),
            Node::Unresolved { reason, .. } => map_lanes(ctx, |_, _| vec![Err(reason.clone())]),
            Node::Binary { op, lhs, rhs } => {
                broadcast(ctx, &[lhs.as_ref(), rhs.as_ref()], |_, operands| {
                    let result = resolve_all(operands)
                        .and_then(|pair| operators::apply(*op, pair[0], pair[1]));
                    vec![result.map(Value::Resolved)]
                })
            }
            Node::Parallel(branches) => branches
                .iter()
                .flat_map(|branch| branch.evaluate(ctx))
                .collect(),
            Node::Piped(stages) => {
                let mut current = ctx.clone();
                for stage in stages {
                    current = stage.evaluate(&current);
                }
                current
            }
            Node::TryCatch(inner) => inner
                .evaluate(ctx)
                .into_iter()
                .filter(Result::is_ok)
                .collect(),
        }
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        let children: usize = match self {
            Node::Literal(_) | Node::Identifier(_) | Node::Identity => 0,
            Node::Array(nodes) | Node::Parallel(nodes) | Node::Piped(nodes) => {
                nodes.iter().map(Node::size).sum()
            }
            Node::Call { args, .. } | Node::Unresolved { args, .. } => {
                args.iter().map(Node::size).sum()
            }
            Node::Object(fields) => fields
                .iter()
                .map(|f| {
                    f.key.size()
                        + match &f.value {
                            FieldValue::Expr(node) => node.size(),
                            FieldValue::Shorthand(indexer) => indexer.size(),
                        }
                })
                .sum(),
            Node::Indexed { target, indexer } => target.size() + indexer.size(),
            Node::Derived { body, .. } => body.size(),
            Node::Binary { lhs, rhs, .. } => lhs.size() + rhs.size(),
            Node::TryCatch(inner) => inner.size(),
        };
        1 + children
    }
}

// Whole lane fails if any element fails or is an identifier.
fn build_array(elements: &[Node], lane: &Lane) -> Lane {
    let single = Context::singleton(lane.clone());
    let mut items = Vec::new();
    for element in elements {
        for out in element.evaluate(&single) {
            items.push(out.and_then(Value::into_resolved)?);
        }
    }
    Ok(Value::Resolved(JsonValue::array(items)))
}

fn build_objects(fields: &[FieldNode], lane: &Lane, value: &Value) -> Result<Vec<Map>, RuntimeError> {
    let single = Context::singleton(lane.clone());
    let streams = fields
        .iter()
        .map(|field| field_entries(field, &single, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cartesian(&streams)
        .into_iter()
        .map(|combo| {
            let mut object = Map::with_capacity(combo.len());
            for (key, value) in combo {
                object.insert(key.clone(), value.clone());
            }
            object
        })
        .collect())
}

// Every key × value pairing for one field, key-major.
fn field_entries(field: &FieldNode, single: &Context, value: &Value) -> Result<Vec<(String, JsonValue)>, RuntimeError> {
    let keys = field
        .key
        .evaluate(single)
        .into_iter()
        .map(|lane| lane.and_then(object_key))
        .collect::<Result<Vec<_>, _>>()?;

    let values = match &field.value {
        FieldValue::Expr(node) => node.evaluate(single),
        FieldValue::Shorthand(indexer) => {
            indexer.evaluate(TargetedContext::new(single, value.resolve()?))
        }
    };
    let values = values
        .into_iter()
        .map(|lane| lane.and_then(field_value))
        .collect::<Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(keys.len() * values.len());
    for key in &keys {
        for value in &values {
            entries.push((key.clone(), value.clone()));
        }
    }
    Ok(entries)
}

fn object_key(value: Value) -> Result<String, RuntimeError> {
    match value {
        Value::Identifier(name) => Ok(name.to_string()),
        Value::Resolved(JsonValue::String(s)) => Ok(s.to_string()),
        Value::Resolved(other) => Err(RuntimeError::type_mismatch(format!(
            "object keys must be strings, got {} ({})",
            truncated(&other),
            other.kind_name()
        ))),
    }
}

// A bare name in value position (nested shorthand) stands for its own text.
fn field_value(value: Value) -> Result<JsonValue, RuntimeError> {
    match value {
        Value::Resolved(v) => Ok(v),
        Value::Identifier(name) => Ok(JsonValue::string(name)),
    }
}

// Failures are per target value: a failing target yields one error lane and
// its siblings still produce their results.
fn index_lane(target: &Node, indexer: &IndexerNode, lane: &Lane) -> Vec<Lane> {
    let single = Context::singleton(lane.clone());
    let mut out = Vec::new();
    for target_lane in target.evaluate(&single) {
        match resolve_lane(&target_lane) {
            Ok(value) => out.extend(indexer.evaluate(TargetedContext::new(&single, value))),
            Err(e) => out.push(Err(e)),
        }
    }
    out
}

fn call_builtin(builtin: Builtin, args: &[Node], ctx: &Context) -> Context {
    if builtin.shape() == Shape::Keyed {
        return map_lanes(ctx, |_, value| match keyed_lane(builtin, args, value) {
            Ok(result) => result.into_iter().map(resolved).collect(),
            Err(e) => vec![Err(e)],
        });
    }

    let operands: Vec<&Node> = args.iter().collect();
    broadcast(ctx, &operands, |input, combo| {
        let result = input
            .resolve()
            .and_then(|input| builtin.invoke(input, &resolve_all(combo)?));
        match result {
            Ok(values) => values.into_iter().map(resolved).collect(),
            Err(e) => vec![Err(e)],
        }
    })
}

// Keys are the array of all outputs of the key filter for each element.
fn keyed_lane(builtin: Builtin, args: &[Node], input: &Value) -> Result<Option<JsonValue>, RuntimeError> {
    let signature = builtin.signature();
    signature.validate_arg_count(args.len())?;
    let input = input.resolve()?;
    signature.validate_input(input)?;

    let items: &[JsonValue] = input.as_array().map(Vec::as_slice).unwrap_or_default();
    let Some(key_filter) = args.first() else {
        return Ok(None);
    };
    let keys = items
        .iter()
        .map(|item| {
            key_filter
                .evaluate(&Context::from_value(item.clone()))
                .into_values()
                .map(JsonValue::array)
        })
        .collect::<Result<Vec<_>, _>>()?;

    builtin.apply_keyed(items, &keys)
}

// ── Indexers ─────────────────────────────────────────────────────────────────

impl IndexerNode {
    pub fn evaluate(&self, tc: TargetedContext<'_>) -> Context {
        ensure_sufficient_stack(|| match self {
            IndexerNode::Key(key) => key
                .evaluate(tc.context)
                .into_iter()
                .map(|lane| lane.and_then(|key| index_by_key(tc.target, &key)))
                .collect(),
            IndexerNode::Slice { start, end } => slice_target(tc, start.as_deref(), end.as_deref()),
            IndexerNode::Spread => match tc.target {
                JsonValue::Array(items) => items.iter().cloned().map(resolved).collect(),
                JsonValue::Object(map) => map.values().cloned().map(resolved).collect(),
                other => Context::from_error(RuntimeError::type_mismatch(format!(
                    "cannot iterate over {} ({})",
                    truncated(other),
                    other.kind_name()
                ))),
            },
        })
    }

    fn size(&self) -> usize {
        match self {
            IndexerNode::Key(key) => key.size(),
            IndexerNode::Slice { start, end } => {
                start.as_ref().map_or(0, |n| n.size()) + end.as_ref().map_or(0, |n| n.size())
            }
            IndexerNode::Spread => 0,
        }
    }

    pub fn dump(&self) -> serde_json::Value {
        match self {
            IndexerNode::Key(key) => json!({ "key": key.dump() }),
            IndexerNode::Slice { start, end } => json!([
                start.as_ref().map_or_else(|| json!("start"), |n| n.dump()),
                end.as_ref().map_or_else(|| json!("last"), |n| n.dump()),
            ]),
            IndexerNode::Spread => json!({ "spread": 0 }),
        }
    }
}

fn index_by_key(target: &JsonValue, key: &Value) -> Lane {
    let key = match key {
        Value::Identifier(name) => JsonValue::string(Rc::clone(name)),
        Value::Resolved(key) => key.clone(),
    };
    match (target, &key) {
        (JsonValue::Object(map), JsonValue::String(k)) => {
            Ok(Value::Resolved(map.get(&**k).cloned().unwrap_or(JsonValue::Null)))
        }
        (JsonValue::Array(items), JsonValue::Number(n)) => {
            let len = items.len() as f64;
            let index = n.floor();
            let index = if index < 0.0 { index + len } else { index };
            let item = if index >= 0.0 && index < len {
                items.get(index as usize).cloned()
            } else {
                None
            };
            Ok(Value::Resolved(item.unwrap_or(JsonValue::Null)))
        }
        _ => Err(RuntimeError::type_mismatch(format!(
            "cannot index {} ({}) with {} ({})",
            truncated(target),
            target.kind_name(),
            truncated(&key),
            key.kind_name()
        ))),
    }
}

fn slice_target(tc: TargetedContext<'_>, start: Option<&Node>, end: Option<&Node>) -> Context {
    let len = match tc.target {
        JsonValue::Array(items) => items.len(),
        JsonValue::String(s) => s.chars().count(),
        other => {
            return Context::from_error(RuntimeError::type_mismatch(format!(
                "cannot slice {} ({})",
                truncated(other),
                other.kind_name()
            )))
        }
    };

    let bounds = |node: Option<&Node>, default: f64| -> Vec<Result<f64, RuntimeError>> {
        match node {
            None => vec![Ok(default)],
            Some(node) => node
                .evaluate(tc.context)
                .into_iter()
                .map(|lane| lane.and_then(slice_bound))
                .collect(),
        }
    };
    let streams = [bounds(start, 0.0), bounds(end, len as f64)];

    cartesian(&streams)
        .into_iter()
        .map(|pair| {
            let (from, to) = (pair[0].clone()?, pair[1].clone()?);
            let (from, to) = slice_range(len, from, to);
            Ok(Value::Resolved(match tc.target {
                JsonValue::String(s) => JsonValue::from(s.chars().skip(from).take(to - from).collect::<String>()),
                JsonValue::Array(items) => JsonValue::array(items[from..to].to_vec()),
                _ => JsonValue::Null,
            }))
        })
        .collect()
}

fn slice_bound(value: Value) -> Result<f64, RuntimeError> {
    match value.into_resolved()? {
        JsonValue::Number(n) => Ok(n),
        other => Err(RuntimeError::type_mismatch(format!(
            "slice bounds must be numbers, got {} ({})",
            truncated(&other),
            other.kind_name()
        ))),
    }
}

/// Start is floored, end ceiled; negative bounds count from the end once, then
/// both are clamped into `[0, len]` with `end >= start`.
fn slice_range(len: usize, start: f64, end: f64) -> (usize, usize) {
    let len = len as f64;
    let normalize = |i: f64| {
        let i = if i < 0.0 { i + len } else { i };
        i.clamp(0.0, len)
    };
    let from = normalize(start.floor());
    let to = normalize(end.ceil()).max(from);
    (from as usize, to as usize)
}

// ── Dump ─────────────────────────────────────────────────────────────────────

fn single_key(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

fn dump_all(nodes: &[Node]) -> Vec<serde_json::Value> {
    nodes.iter().map(Node::dump).collect()
}

impl FieldNode {
    pub fn dump(&self) -> serde_json::Value {
        let value = match &self.value {
            FieldValue::Expr(node) => node.dump(),
            FieldValue::Shorthand(indexer) => indexer.dump(),
        };
        json!({ "key": self.key.dump(), "value": value })
    }
}

impl Node {
    /// Debug representation
    pub fn dump(&self) -> serde_json::Value {
        match self {
            Node::Literal(value) => serde_json::Value::from(value),
            Node::Identifier(name) => json!({ "id": &**name }),
            Node::Identity => json!({ "identity": 0 }),
            Node::Array(elements) => json!({ "array": dump_all(elements) }),
            Node::Object(fields) => {
                json!({ "object": fields.iter().map(FieldNode::dump).collect::<Vec<_>>() })
            }
            Node::Indexed { target, indexer } => {
                json!({ "indexing": target.dump(), "indexer": indexer.dump() })
            }
            Node::Call { builtin, args } => {
                single_key("call", single_key(builtin.name(), dump_all(args).into()))
            }
            Node::Derived { derived, body } => {
                single_key("derived", single_key(derived.name(), body.dump()))
            }
            Node::Unresolved { name, args, .. } => {
                single_key("call", single_key(name, dump_all(args).into()))
            }
            Node::Binary { op, lhs, rhs } => single_key(op.symbol(), json!([lhs.dump(), rhs.dump()])),
            Node::Parallel(branches) => json!({ "parallel": dump_all(branches) }),
            Node::Piped(stages) => json!({ "piped": dump_all(stages) }),
            Node::TryCatch(inner) => json!({ "trycatch": inner.dump() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value;
    use pretty_assertions::assert_eq;

    fn lit(value: JsonValue) -> Node {
        Node::Literal(value)
    }

    fn key(name: &str) -> Node {
        Node::Indexed {
            target: Box::new(Node::Identity),
            indexer: IndexerNode::Key(Box::new(Node::Identifier(name.into()))),
        }
    }

    fn spread(target: Node) -> Node {
        Node::Indexed {
            target: Box::new(target),
            indexer: IndexerNode::Spread,
        }
    }

    fn call(builtin: Builtin, args: Vec<Node>) -> Node {
        Node::Call { builtin, args }
    }

    fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
        Node::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn run(node: &Node, input: JsonValue) -> Vec<Lane> {
        node.evaluate(&Context::from_value(input)).into_lanes()
    }

    fn values(node: &Node, input: JsonValue) -> Vec<JsonValue> {
        node.evaluate(&Context::from_value(input)).into_values().unwrap()
    }

    #[test]
    fn test_literal_emits_one_value_per_lane() {
        let ctx = Context::new(vec![resolved(json_value!(1)), resolved(json_value!(2))]);
        let out = lit(json_value!("x")).evaluate(&ctx).into_values().unwrap();
        assert_eq!(out, vec![json_value!("x"), json_value!("x")]);
    }

    #[test]
    fn test_binary_expands_left_major() {
        let node = binary(
            BinaryOp::Add,
            Node::Parallel(vec![lit(json_value!(1)), lit(json_value!(2))]),
            Node::Parallel(vec![lit(json_value!(10)), lit(json_value!(20))]),
        );
        assert_eq!(
            values(&node, json_value!(null)),
            vec![json_value!(11), json_value!(21), json_value!(12), json_value!(22)]
        );
    }

    #[test]
    fn test_error_lanes_are_inert() {
        let ctx = Context::new(vec![
            Err(RuntimeError::Raised("boom".into())),
            resolved(json_value!(1)),
        ]);
        let node = binary(BinaryOp::Add, Node::Identity, lit(json_value!(1)));
        let out = node.evaluate(&ctx).into_lanes();
        assert_eq!(out, vec![Err(RuntimeError::Raised("boom".into())), resolved(json_value!(2))]);
    }

    #[test]
    fn test_try_catch_drops_errors() {
        let node = Node::Piped(vec![
            spread(Node::Identity),
            Node::TryCatch(Box::new(binary(BinaryOp::Divide, lit(json_value!(1)), Node::Identity))),
        ]);
        assert_eq!(
            values(&node, json_value!([1, 0, 4])),
            vec![json_value!(1), json_value!(0.25)]
        );
    }

    #[test]
    fn test_array_lane_fails_as_a_whole() {
        let node = Node::Array(vec![
            lit(json_value!(1)),
            binary(BinaryOp::Divide, lit(json_value!(1)), lit(json_value!(0))),
        ]);
        let out = run(&node, json_value!(null));
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(RuntimeError::DivisionByZero { .. })));
    }

    #[test]
    fn test_array_rejects_identifiers() {
        let node = Node::Array(vec![Node::Identifier("user".into())]);
        assert_eq!(
            run(&node, json_value!(null)),
            vec![Err(RuntimeError::UnexpectedIdentifier("user".into()))]
        );
    }

    #[test]
    fn test_object_shorthand_and_broadcast() {
        let node = Node::Object(vec![
            FieldNode {
                key: Node::Identifier("user".into()),
                value: FieldValue::Shorthand(IndexerNode::Key(Box::new(Node::Identifier("user".into())))),
            },
            FieldNode {
                key: Node::Identifier("title".into()),
                value: FieldValue::Expr(spread(key("titles"))),
            },
        ]);
        assert_eq!(
            values(&node, json_value!({"user": "u", "titles": ["a", "b"]})),
            vec![
                json_value!({"user": "u", "title": "a"}),
                json_value!({"user": "u", "title": "b"}),
            ]
        );
    }

    #[test]
    fn test_empty_object_per_lane() {
        assert_eq!(values(&Node::Object(vec![]), json_value!(1)), vec![json_value!({})]);
    }

    #[test]
    fn test_key_indexing() {
        assert_eq!(values(&key("missing"), json_value!({"a": 1})), vec![json_value!(null)]);
        let index = |i: f64| Node::Indexed {
            target: Box::new(Node::Identity),
            indexer: IndexerNode::Key(Box::new(lit(JsonValue::Number(i)))),
        };
        assert_eq!(values(&index(-2.0), json_value!([1, 2, 3])), vec![json_value!(2)]);
        assert_eq!(values(&index(1.7), json_value!([1, 2, 3])), vec![json_value!(2)]);
        assert_eq!(values(&index(9.0), json_value!([1, 2, 3])), vec![json_value!(null)]);
        assert!(run(&index(0.0), json_value!({"a": 1}))[0].is_err());
        assert!(run(&key("a"), json_value!(null))[0].is_err());
    }

    #[test]
    fn test_multi_key_indexing() {
        let node = Node::Indexed {
            target: Box::new(Node::Identity),
            indexer: IndexerNode::Key(Box::new(Node::Parallel(vec![lit(json_value!(4)), lit(json_value!(2))]))),
        };
        assert_eq!(
            values(&node, json_value!(["a", "b", "c", "d", "e"])),
            vec![json_value!("e"), json_value!("c")]
        );
    }

    #[test]
    fn test_indexing_errors_are_per_target() {
        // .[] | .a over [{"a":1}, 5, {"a":2}]
        let node = Node::Indexed {
            target: Box::new(spread(Node::Identity)),
            indexer: IndexerNode::Key(Box::new(Node::Identifier("a".into()))),
        };
        let out = run(&node, json_value!([{"a": 1}, 5, {"a": 2}]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], resolved(json_value!(1)));
        assert!(out[1].is_err());
        assert_eq!(out[2], resolved(json_value!(2)));
    }

    #[test]
    fn test_slicing() {
        let slice = |start: Option<f64>, end: Option<f64>| Node::Indexed {
            target: Box::new(Node::Identity),
            indexer: IndexerNode::Slice {
                start: start.map(|n| Box::new(lit(JsonValue::Number(n)))),
                end: end.map(|n| Box::new(lit(JsonValue::Number(n)))),
            },
        };
        let letters = json_value!(["a", "b", "c", "d", "e"]);
        assert_eq!(values(&slice(Some(2.0), Some(4.0)), letters.clone()), vec![json_value!(["c", "d"])]);
        assert_eq!(values(&slice(Some(-2.0), None), letters.clone()), vec![json_value!(["d", "e"])]);
        assert_eq!(values(&slice(Some(3.0), Some(99.0)), letters.clone()), vec![json_value!(["d", "e"])]);
        assert_eq!(values(&slice(Some(4.0), Some(1.0)), letters), vec![json_value!([])]);
        assert_eq!(values(&slice(Some(1.2), Some(2.5)), json_value!("héllo")), vec![json_value!("él")]);
        assert!(run(&slice(Some(0.0), None), json_value!(7))[0].is_err());
    }

    #[test]
    fn test_spread_mapping_keeps_insertion_order() {
        let input = JsonValue::from_json_str(r#"{"b": 1, "a": 2}"#).unwrap();
        assert_eq!(values(&spread(Node::Identity), input), vec![json_value!(1), json_value!(2)]);
        assert!(run(&spread(Node::Identity), json_value!("s"))[0].is_err());
    }

    #[test]
    fn test_select_passes_input_once_per_truthy_output() {
        let node = call(
            Builtin::Select,
            vec![Node::Parallel(vec![lit(json_value!(true)), lit(json_value!(null)), lit(json_value!(1))])],
        );
        assert_eq!(values(&node, json_value!("x")), vec![json_value!("x"), json_value!("x")]);
    }

    #[test]
    fn test_keyed_builtin_uses_all_key_outputs() {
        let node = call(Builtin::SortBy, vec![Node::Parallel(vec![key("b"), key("a")])]);
        let input = json_value!([{"a": 1, "b": 2}, {"a": 0, "b": 2}, {"a": 5, "b": 1}]);
        assert_eq!(
            values(&node, input),
            vec![json_value!([{"a": 5, "b": 1}, {"a": 0, "b": 2}, {"a": 1, "b": 2}])]
        );
    }

    #[test]
    fn test_unresolved_fails_per_lane() {
        let node = Node::Unresolved {
            name: "nope".into(),
            args: vec![],
            reason: RuntimeError::UnknownFunction("nope".into()),
        };
        assert_eq!(
            run(&node, json_value!(1)),
            vec![Err(RuntimeError::UnknownFunction("nope".into()))]
        );
    }

    #[test]
    fn test_dump_shapes() {
        let node = Node::Piped(vec![
            spread(Node::Identity),
            Node::TryCatch(Box::new(call(Builtin::Length, vec![]))),
        ]);
        assert_eq!(
            node.dump(),
            json!({"piped": [
                {"indexing": {"identity": 0}, "indexer": {"spread": 0}},
                {"trycatch": {"call": {"length": []}}}
            ]})
        );
        assert_eq!(node.size(), 5);
    }
}
