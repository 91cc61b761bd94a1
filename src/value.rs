// JsonValue: Rc-wrapped JSON tree with O(1) cloning
// The only representation user data and function results are expressed in

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A JSON value with O(1) clone semantics.
///
/// Strings, arrays and objects are wrapped in `Rc` so that lanes can share
/// sub-trees freely while a program fans one input out into many outputs.
/// Objects keep insertion order, which `keys_unsorted`, `to_entries` and
/// `.[]` expose.
#[derive(Clone, Debug)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<Vec<JsonValue>>),
    Object(Rc<IndexMap<String, JsonValue>>),
}

/// Object representation shared by the evaluator and the function library.
pub type Map = IndexMap<String, JsonValue>;

// ── Type checks ──────────────────────────────────────────────────────────────

impl JsonValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, JsonValue::Bool(_))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, JsonValue::Number(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, JsonValue::String(_))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, JsonValue::Array(_))
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    /// Arrays and objects: the kinds `.[]` can iterate.
    #[inline]
    pub fn is_iterable(&self) -> bool {
        matches!(self, JsonValue::Array(_) | JsonValue::Object(_))
    }

    /// The jq name of this value's kind, as reported by `type`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

impl JsonValue {
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&Vec<JsonValue>> {
        match self {
            JsonValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Index into an object by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(map) => map.get(key),
            _ => None,
        }
    }
}

// ── Constructors ─────────────────────────────────────────────────────────────

impl JsonValue {
    #[inline]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        JsonValue::String(s.into())
    }

    #[inline]
    pub fn array(v: Vec<JsonValue>) -> Self {
        JsonValue::Array(Rc::new(v))
    }

    #[inline]
    pub fn object(m: Map) -> Self {
        JsonValue::Object(Rc::new(m))
    }
}

// ── From impls ───────────────────────────────────────────────────────────────

impl From<bool> for JsonValue {
    #[inline]
    fn from(b: bool) -> Self {
        JsonValue::Bool(b)
    }
}

impl From<i64> for JsonValue {
    #[inline]
    fn from(n: i64) -> Self {
        JsonValue::Number(n as f64)
    }
}

impl From<i32> for JsonValue {
    #[inline]
    fn from(n: i32) -> Self {
        JsonValue::Number(n as f64)
    }
}

impl From<usize> for JsonValue {
    #[inline]
    fn from(n: usize) -> Self {
        JsonValue::Number(n as f64)
    }
}

impl From<f64> for JsonValue {
    #[inline]
    fn from(n: f64) -> Self {
        JsonValue::Number(n)
    }
}

impl From<&str> for JsonValue {
    #[inline]
    fn from(s: &str) -> Self {
        JsonValue::String(s.into())
    }
}

impl From<String> for JsonValue {
    #[inline]
    fn from(s: String) -> Self {
        JsonValue::String(s.into())
    }
}

impl From<Rc<str>> for JsonValue {
    #[inline]
    fn from(s: Rc<str>) -> Self {
        JsonValue::String(s)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    #[inline]
    fn from(v: Vec<JsonValue>) -> Self {
        JsonValue::Array(Rc::new(v))
    }
}

impl From<Map> for JsonValue {
    #[inline]
    fn from(m: Map) -> Self {
        JsonValue::Object(Rc::new(m))
    }
}

// ── PartialEq ────────────────────────────────────────────────────────────────

// Structural equality for host code. Objects compare regardless of key order
// (IndexMap equality is order-insensitive). The query language's `==` goes
// through `utils::compare_values` instead.
impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonValue::Null, JsonValue::Null) => true,
            (JsonValue::Bool(a), JsonValue::Bool(b)) => a == b,
            (JsonValue::Number(a), JsonValue::Number(b)) => a == b,
            (JsonValue::String(a), JsonValue::String(b)) => a == b,
            (JsonValue::Array(a), JsonValue::Array(b)) => a == b,
            (JsonValue::Object(a), JsonValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

/// Compact JSON text, as produced by `tojson` and `tostring`. Goes through
/// `Serialize` so both renderings agree.
impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

// ── Serialization ────────────────────────────────────────────────────────────

impl Serialize for JsonValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            JsonValue::Null => serializer.serialize_none(),
            JsonValue::Bool(b) => serializer.serialize_bool(*b),
            JsonValue::Number(n) => {
                if !n.is_finite() {
                    serializer.serialize_none()
                } else if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            JsonValue::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

// ── Deserialization (single-pass JSON→JsonValue) ─────────────────────────────

impl<'de> serde::Deserialize<'de> for JsonValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "any valid JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonValue, E> {
        Ok(JsonValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonValue, E> {
        Ok(JsonValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonValue, E> {
        Ok(JsonValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonValue, E> {
        Ok(JsonValue::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v.into()))
    }

    fn visit_none<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JsonValue, A::Error> {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(elem) = seq.next_element()? {
            vec.push(elem);
        }
        Ok(JsonValue::array(vec))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JsonValue, A::Error> {
        let mut m = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry()? {
            m.insert(k, v);
        }
        Ok(JsonValue::object(m))
    }
}

// ── JSON string I/O ──────────────────────────────────────────────────────────

impl JsonValue {
    /// Parse a JSON string directly into a JsonValue.
    pub fn from_json_str(s: &str) -> Result<JsonValue, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// ── Conversion from/to serde_json::Value ─────────────────────────────────────

impl From<serde_json::Value> for JsonValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => JsonValue::String(s.into()),
            serde_json::Value::Array(arr) => {
                JsonValue::Array(Rc::new(arr.into_iter().map(JsonValue::from).collect()))
            }
            serde_json::Value::Object(map) => {
                let m: Map = map
                    .into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect();
                JsonValue::Object(Rc::new(m))
            }
        }
    }
}

impl From<&JsonValue> for serde_json::Value {
    fn from(v: &JsonValue) -> Self {
        match v {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(*b),
            JsonValue::Number(n) => {
                if !n.is_finite() {
                    serde_json::Value::Null
                } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::json!(*n)
                }
            }
            JsonValue::String(s) => serde_json::Value::String(s.to_string()),
            JsonValue::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(serde_json::Value::from).collect())
            }
            JsonValue::Object(map) => {
                let m: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect();
                serde_json::Value::Object(m)
            }
        }
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(v: JsonValue) -> Self {
        serde_json::Value::from(&v)
    }
}

// ── json_value! macro ────────────────────────────────────────────────────────

/// Construct a [`JsonValue`] literal, similar to `serde_json::json!`.
///
/// Usage:
///   json_value!(null)           → JsonValue::Null
///   json_value!(true)           → JsonValue::Bool(true)
///   json_value!(42)             → JsonValue::Number(42.0)
///   json_value!("hello")        → JsonValue::String(..)
///   json_value!([1, 2, 3])      → JsonValue::Array(..)
///   json_value!({"k": v, ...})  → JsonValue::Object(..)
///   json_value!(expr)           → JsonValue::from(expr)
#[macro_export]
macro_rules! json_value {
    (null) => {
        $crate::value::JsonValue::Null
    };

    (true) => {
        $crate::value::JsonValue::Bool(true)
    };

    (false) => {
        $crate::value::JsonValue::Bool(false)
    };

    ([ $($tt:tt)* ]) => {
        $crate::json_value!(@array [] $($tt)*)
    };

    ({ $($tt:tt)* }) => {
        {
            #[allow(unused_mut)]
            let mut map = $crate::value::Map::new();
            $crate::json_value!(@object map $($tt)*);
            $crate::value::JsonValue::Object(::std::rc::Rc::new(map))
        }
    };

    // Elements are munched one at a time so that `-1` (two tokens) counts as
    // one element.
    (@array [$($elems:expr,)*]) => {
        $crate::value::JsonValue::Array(::std::rc::Rc::new(vec![$($elems,)*]))
    };

    (@array [$($elems:expr,)*] - $num:tt $(, $($rest:tt)*)?) => {
        $crate::json_value!(@array [$($elems,)* $crate::json_value!(-$num),] $($($rest)*)?)
    };

    (@array [$($elems:expr,)*] $next:tt $(, $($rest:tt)*)?) => {
        $crate::json_value!(@array [$($elems,)* $crate::json_value!($next),] $($($rest)*)?)
    };

    (@object $map:ident) => {};

    (@object $map:ident $key:tt : - $num:tt $(, $($rest:tt)*)?) => {
        $map.insert(($key).to_string(), $crate::json_value!(-$num));
        $crate::json_value!(@object $map $($($rest)*)?);
    };

    (@object $map:ident $key:tt : $val:tt $(, $($rest:tt)*)?) => {
        $map.insert(($key).to_string(), $crate::json_value!($val));
        $crate::json_value!(@object $map $($($rest)*)?);
    };

    ($other:expr) => {
        $crate::value::JsonValue::from($other)
    };
}

// ── Tests ────────────────────────────────────────────────────────────────────
