// Utility functions and helpers
// Ordering, equality, merging and combination helpers shared by the
// operator library, the function library and the evaluator

use std::cmp::Ordering;

use crate::value::{JsonValue, Map};

/// Minimum stack space to keep available before recursing (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Stack space allocated each time the red zone is hit (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Largest string (in bytes) or generated stream (in elements) a single
/// built-in may produce. Anything larger fails the lane instead.
pub const MAX_GENERATED_LEN: usize = 1 << 27;

/// Run `f`, growing the stack first if less than the red zone remains.
///
/// Wraps every recursive step of evaluation, merging and comparison so that
/// deeply nested programs and values do not overflow the native stack.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

// ── Truthiness ───────────────────────────────────────────────────────────────

/// `null` and `false` are falsy; everything else is truthy.
#[inline]
pub fn is_falsy(value: &JsonValue) -> bool {
    matches!(value, JsonValue::Null | JsonValue::Bool(false))
}

#[inline]
pub fn is_truthy(value: &JsonValue) -> bool {
    !is_falsy(value)
}

// ── Total order ──────────────────────────────────────────────────────────────

fn kind_rank(value: &JsonValue) -> u8 {
    match value {
        JsonValue::Null => 0,
        JsonValue::Bool(false) => 1,
        JsonValue::Bool(true) => 2,
        JsonValue::Number(_) => 3,
        JsonValue::String(_) => 4,
        JsonValue::Array(_) => 5,
        JsonValue::Object(_) => 6,
    }
}

/// Total order over all values.
///
/// null < false < true < numbers < strings < arrays < objects. Arrays compare
/// element-wise, shorter first on a common prefix. Objects compare their sorted
/// key lists first, then their values in that key order. NaN sorts below every
/// other number and equal to itself.
pub fn compare_values(left: &JsonValue, right: &JsonValue) -> Ordering {
    ensure_sufficient_stack(|| match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => compare_numbers(*a, *b),
        (JsonValue::String(a), JsonValue::String(b)) => a.cmp(b),
        (JsonValue::Array(a), JsonValue::Array(b)) => compare_sequences(a, b),
        (JsonValue::Object(a), JsonValue::Object(b)) => compare_objects(a, b),
        _ => kind_rank(left).cmp(&kind_rank(right)),
    })
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_sequences(a: &[JsonValue], b: &[JsonValue]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let cmp = compare_values(x, y);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_objects(a: &Map, b: &Map) -> Ordering {
    let a_keys = sorted_keys(a);
    let b_keys = sorted_keys(b);
    match a_keys.cmp(&b_keys) {
        Ordering::Equal => {}
        other => return other,
    }
    for key in a_keys {
        if let (Some(x), Some(y)) = (a.get(key), b.get(key)) {
            let cmp = compare_values(x, y);
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
    }
    Ordering::Equal
}

/// Object keys in ascending order.
pub fn sorted_keys(map: &Map) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Deep equality under the total order.
#[inline]
pub fn values_equal(left: &JsonValue, right: &JsonValue) -> bool {
    compare_values(left, right) == Ordering::Equal
}

/// Stable sort under the total order.
pub fn sort_values(values: &mut [JsonValue]) {
    values.sort_by(compare_values);
}

// ── Merging ──────────────────────────────────────────────────────────────────

/// Merge `rhs` into a copy of `lhs`; keys from `rhs` win.
///
/// With `recursive`, a key holding an object on both sides is merged again
/// instead of replaced. Any other pairing is overwritten.
pub fn merge_objects(lhs: &Map, rhs: &Map, recursive: bool) -> Map {
    ensure_sufficient_stack(|| {
        let mut merged = lhs.clone();
        for (key, value) in rhs {
            let combined = match (recursive, merged.get(key), value) {
                (true, Some(JsonValue::Object(left)), JsonValue::Object(right)) => {
                    JsonValue::object(merge_objects(left, right, true))
                }
                _ => value.clone(),
            };
            merged.insert(key.clone(), combined);
        }
        merged
    })
}

// ── Arrays ───────────────────────────────────────────────────────────────────

/// Flatten nested arrays up to `depth` levels.
pub fn flatten(arr: &[JsonValue], depth: usize) -> Vec<JsonValue> {
    ensure_sufficient_stack(|| {
        let mut result = Vec::with_capacity(arr.len());
        for item in arr {
            match item {
                JsonValue::Array(inner) if depth > 0 => result.extend(flatten(inner, depth - 1)),
                _ => result.push(item.clone()),
            }
        }
        result
    })
}

/// Every ordered tuple across `streams`, leftmost stream varying slowest.
///
/// No streams produce one empty tuple; any empty stream produces none.
pub fn cartesian<T>(streams: &[Vec<T>]) -> Vec<Vec<&T>> {
    let mut combos: Vec<Vec<&T>> = vec![Vec::with_capacity(streams.len())];
    for stream in streams {
        let mut next = Vec::with_capacity(combos.len() * stream.len());
        for prefix in &combos {
            for item in stream {
                let mut combo = prefix.clone();
                combo.push(item);
                next.push(combo);
            }
        }
        combos = next;
    }
    combos
}
