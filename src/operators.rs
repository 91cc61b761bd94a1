// Binary operator semantics
// Each operator is a pure function over two resolved values

use std::cmp::Ordering;

use crate::ast::BinaryOp;
use crate::context::{truncated, RuntimeError};
use crate::utils::{is_truthy, merge_objects, values_equal, MAX_GENERATED_LEN};
use crate::value::JsonValue;

/// Apply `op` to a pair of operands.
pub fn apply(op: BinaryOp, lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, RuntimeError> {
    match op {
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Subtract => subtract(lhs, rhs),
        BinaryOp::Multiply => multiply(lhs, rhs),
        BinaryOp::Divide => divide(lhs, rhs),
        BinaryOp::Modulo => modulo(lhs, rhs),
        BinaryOp::Equal => Ok(JsonValue::Bool(equal(lhs, rhs))),
        BinaryOp::NotEqual => Ok(JsonValue::Bool(!equal(lhs, rhs))),
        BinaryOp::LessThan => compare_numbers(op, lhs, rhs, Ordering::is_lt),
        BinaryOp::LessThanOrEqual => compare_numbers(op, lhs, rhs, Ordering::is_le),
        BinaryOp::GreaterThan => compare_numbers(op, lhs, rhs, Ordering::is_gt),
        BinaryOp::GreaterThanOrEqual => compare_numbers(op, lhs, rhs, Ordering::is_ge),
        BinaryOp::And => Ok(JsonValue::Bool(is_truthy(lhs) && is_truthy(rhs))),
        BinaryOp::Or => Ok(JsonValue::Bool(is_truthy(lhs) || is_truthy(rhs))),
        BinaryOp::Alternative => Ok(alternative(lhs, rhs)),
    }
}

/// `+`: sum, concatenation, or shallow merge. `null` yields the other side.
pub fn add(lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, RuntimeError> {
    match (lhs, rhs) {
        (JsonValue::Null, _) => Ok(rhs.clone()),
        (_, JsonValue::Null) => Ok(lhs.clone()),
        (JsonValue::Number(a), JsonValue::Number(b)) => Ok(JsonValue::Number(a + b)),
        (JsonValue::String(a), JsonValue::String(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(JsonValue::from(joined))
        }
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            let mut joined = Vec::with_capacity(a.len() + b.len());
            joined.extend(a.iter().cloned());
            joined.extend(b.iter().cloned());
            Ok(JsonValue::array(joined))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            Ok(JsonValue::object(merge_objects(a, b, false)))
        }
        _ => Err(RuntimeError::invalid_operands("added", lhs, rhs)),
    }
}

/// `-`: difference, or removal of every element deep-equal to one in `rhs`.
pub fn subtract(lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, RuntimeError> {
    match (lhs, rhs) {
        (JsonValue::Null, _) => Ok(rhs.clone()),
        (_, JsonValue::Null) => Ok(lhs.clone()),
        (JsonValue::Number(a), JsonValue::Number(b)) => Ok(JsonValue::Number(a - b)),
        (JsonValue::Array(a), JsonValue::Array(b)) => Ok(JsonValue::array(
            a.iter()
                .filter(|x| !b.iter().any(|y| values_equal(x, y)))
                .cloned()
                .collect(),
        )),
        _ => Err(RuntimeError::invalid_operands("subtracted", lhs, rhs)),
    }
}

/// `*`: product, string repetition, or recursive merge.
pub fn multiply(lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, RuntimeError> {
    match (lhs, rhs) {
        (JsonValue::Number(a), JsonValue::Number(b)) => Ok(JsonValue::Number(a * b)),
        (JsonValue::String(s), JsonValue::Number(n)) | (JsonValue::Number(n), JsonValue::String(s)) => {
            repeat_string(s, *n)
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            Ok(JsonValue::object(merge_objects(a, b, true)))
        }
        _ => Err(RuntimeError::invalid_operands("multiplied", lhs, rhs)),
    }
}

// A count of zero or less is null; fractional counts round up.
fn repeat_string(s: &str, count: f64) -> Result<JsonValue, RuntimeError> {
    if count.is_nan() || count <= 0.0 {
        return Ok(JsonValue::Null);
    }
    if s.is_empty() {
        return Ok(JsonValue::string(""));
    }
    let times = count.ceil();
    let len = if times <= MAX_GENERATED_LEN as f64 {
        (times as usize).checked_mul(s.len())
    } else {
        None
    };
    match len {
        Some(len) if len <= MAX_GENERATED_LEN => Ok(JsonValue::from(s.repeat(times as usize))),
        _ => Err(RuntimeError::TooLarge(format!(
            "repeat string result too long: {} * {}",
            truncated(&JsonValue::string(s)),
            JsonValue::Number(count)
        ))),
    }
}

/// `/`: quotient, or string split.
pub fn divide(lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, RuntimeError> {
    match (lhs, rhs) {
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            if *b == 0.0 {
                return Err(RuntimeError::DivisionByZero {
                    verb: "divided",
                    lhs: truncated(lhs),
                    rhs: truncated(rhs),
                });
            }
            Ok(JsonValue::Number(a / b))
        }
        (JsonValue::String(a), JsonValue::String(b)) => Ok(split(a, b)),
        _ => Err(RuntimeError::invalid_operands("divided", lhs, rhs)),
    }
}

/// Split `input` on `separator`. An empty separator splits into characters;
/// an empty input yields an empty array.
pub fn split(input: &str, separator: &str) -> JsonValue {
    if input.is_empty() {
        return JsonValue::array(Vec::new());
    }
    let parts: Vec<JsonValue> = if separator.is_empty() {
        input.chars().map(|c| JsonValue::from(c.to_string())).collect()
    } else {
        input.split(separator).map(JsonValue::from).collect()
    };
    JsonValue::array(parts)
}

/// `%`: floating point remainder.
pub fn modulo(lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, RuntimeError> {
    match (lhs, rhs) {
        (JsonValue::Number(a), JsonValue::Number(b)) => Ok(JsonValue::Number(a % b)),
        _ => Err(RuntimeError::invalid_operands("divided (remainder)", lhs, rhs)),
    }
}

/// `==`: deep equality under the total order. NaN is never equal to anything.
pub fn equal(lhs: &JsonValue, rhs: &JsonValue) -> bool {
    let is_nan = |v: &JsonValue| matches!(v, JsonValue::Number(n) if n.is_nan());
    if is_nan(lhs) || is_nan(rhs) {
        return false;
    }
    values_equal(lhs, rhs)
}

fn compare_numbers(
    op: BinaryOp,
    lhs: &JsonValue,
    rhs: &JsonValue,
    accept: fn(Ordering) -> bool,
) -> Result<JsonValue, RuntimeError> {
    match (lhs, rhs) {
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            Ok(JsonValue::Bool(a.partial_cmp(b).is_some_and(accept)))
        }
        _ => Err(RuntimeError::type_mismatch(format!(
            "cannot compare {} ({}) {} {} ({}): only numbers are ordered",
            truncated(lhs),
            lhs.kind_name(),
            op.symbol(),
            truncated(rhs),
            rhs.kind_name()
        ))),
    }
}

/// `//`: the left value unless it is null or false.
pub fn alternative(lhs: &JsonValue, rhs: &JsonValue) -> JsonValue {
    if is_truthy(lhs) {
        lhs.clone()
    } else {
        rhs.clone()
    }
}
