// Built-in function implementations
// The closed set of named built-ins, their signatures, and pure implementations
// that work on resolved values only (the evaluator does the lane lifting)

use crate::context::{truncated, RuntimeError};
use crate::signature::{ParamType, Parameter, Signature, SignatureError};
use crate::utils::{is_truthy, values_equal, MAX_GENERATED_LEN};
use crate::value::JsonValue;

const NO_ARGS: &[Parameter] = &[];
const ONE_ANY: &[Parameter] = &[Parameter::required(ParamType::Any)];
const ONE_STRING: &[Parameter] = &[Parameter::required(ParamType::String)];
const OPTIONAL_ANY: &[Parameter] = &[Parameter::optional(ParamType::Any)];
const OPTIONAL_NUMBER: &[Parameter] = &[Parameter::optional(ParamType::Number)];
const RANGE_BOUNDS: &[Parameter] = &[
    Parameter::required(ParamType::Number),
    Parameter::optional(ParamType::Number),
    Parameter::optional(ParamType::Number),
];

/// How a built-in consumes its arguments and produces lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One result, or none, per input×arguments combination.
    Standard,
    /// Passes the input through unchanged when the combination tests truthy.
    Select,
    /// Zero or more results per combination.
    Generator,
    /// Evaluates its single argument against each element of the input array.
    Keyed,
}

/// Built-ins expressed as small evaluator subtrees rather than native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derived {
    /// `map(f)` ≡ `[.[] | f]`
    Map,
    /// `with_entries(f)` ≡ `to_entries | map(f) | from_entries`
    WithEntries,
}

impl Derived {
    pub fn from_name(name: &str) -> Option<Derived> {
        match name {
            "map" => Some(Derived::Map),
            "with_entries" => Some(Derived::WithEntries),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Derived::Map => "map",
            Derived::WithEntries => "with_entries",
        }
    }

    pub fn signature(self) -> Signature {
        Signature::new(self.name(), ParamType::Any, ONE_ANY)
    }
}

/// Every natively implemented built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Length,
    Utf8ByteLength,
    Keys,
    KeysUnsorted,
    Has,
    In,
    ToEntries,
    FromEntries,
    Select,
    Arrays,
    Objects,
    Iterables,
    Booleans,
    Numbers,
    Normals,
    Finites,
    Strings,
    Nulls,
    Values,
    Scalars,
    Empty,
    Error,
    Add,
    Any,
    All,
    Flatten,
    Range,
    Floor,
    Sqrt,
    ToNumber,
    ToString,
    Type,
    Infinite,
    Nan,
    IsInfinite,
    IsNan,
    IsFinite,
    IsNormal,
    Sort,
    SortBy,
    GroupBy,
    Min,
    Max,
    MinBy,
    MaxBy,
    Unique,
    UniqueBy,
    Reverse,
    Contains,
    Inside,
    Indices,
    Index,
    Rindex,
    StartsWith,
    EndsWith,
    Combinations,
    Not,
    Join,
    AsciiDowncase,
    AsciiUpcase,
    LtrimStr,
    RtrimStr,
    Split,
    ToJson,
    FromJson,
}

const NAMES: &[(Builtin, &str)] = &[
    (Builtin::Length, "length"),
    (Builtin::Utf8ByteLength, "utf8bytelength"),
    (Builtin::Keys, "keys"),
    (Builtin::KeysUnsorted, "keys_unsorted"),
    (Builtin::Has, "has"),
    (Builtin::In, "in"),
    (Builtin::ToEntries, "to_entries"),
    (Builtin::FromEntries, "from_entries"),
    (Builtin::Select, "select"),
    (Builtin::Arrays, "arrays"),
    (Builtin::Objects, "objects"),
    (Builtin::Iterables, "iterables"),
    (Builtin::Booleans, "booleans"),
    (Builtin::Numbers, "numbers"),
    (Builtin::Normals, "normals"),
    (Builtin::Finites, "finites"),
    (Builtin::Strings, "strings"),
    (Builtin::Nulls, "nulls"),
    (Builtin::Values, "values"),
    (Builtin::Scalars, "scalars"),
    (Builtin::Empty, "empty"),
    (Builtin::Error, "error"),
    (Builtin::Add, "add"),
    (Builtin::Any, "any"),
    (Builtin::All, "all"),
    (Builtin::Flatten, "flatten"),
    (Builtin::Range, "range"),
    (Builtin::Floor, "floor"),
    (Builtin::Sqrt, "sqrt"),
    (Builtin::ToNumber, "tonumber"),
    (Builtin::ToString, "tostring"),
    (Builtin::Type, "type"),
    (Builtin::Infinite, "infinite"),
    (Builtin::Nan, "nan"),
    (Builtin::IsInfinite, "isinfinite"),
    (Builtin::IsNan, "isnan"),
    (Builtin::IsFinite, "isfinite"),
    (Builtin::IsNormal, "isnormal"),
    (Builtin::Sort, "sort"),
    (Builtin::SortBy, "sort_by"),
    (Builtin::GroupBy, "group_by"),
    (Builtin::Min, "min"),
    (Builtin::Max, "max"),
    (Builtin::MinBy, "min_by"),
    (Builtin::MaxBy, "max_by"),
    (Builtin::Unique, "unique"),
    (Builtin::UniqueBy, "unique_by"),
    (Builtin::Reverse, "reverse"),
    (Builtin::Contains, "contains"),
    (Builtin::Inside, "inside"),
    (Builtin::Indices, "indices"),
    (Builtin::Index, "index"),
    (Builtin::Rindex, "rindex"),
    (Builtin::StartsWith, "startswith"),
    (Builtin::EndsWith, "endswith"),
    (Builtin::Combinations, "combinations"),
    (Builtin::Not, "not"),
    (Builtin::Join, "join"),
    (Builtin::AsciiDowncase, "ascii_downcase"),
    (Builtin::AsciiUpcase, "ascii_upcase"),
    (Builtin::LtrimStr, "ltrimstr"),
    (Builtin::RtrimStr, "rtrimstr"),
    (Builtin::Split, "split"),
    (Builtin::ToJson, "tojson"),
    (Builtin::FromJson, "fromjson"),
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(builtin, _)| *builtin)
    }

    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(builtin, _)| *builtin == self)
            .map_or("<builtin>", |(_, n)| n)
    }

    /// Every built-in, in registry order.
    pub fn all() -> impl Iterator<Item = Builtin> {
        NAMES.iter().map(|(builtin, _)| *builtin)
    }

    pub fn shape(self) -> Shape {
        use Builtin::*;
        match self {
            Select | Arrays | Objects | Iterables | Booleans | Numbers | Normals | Finites
            | Strings | Nulls | Values | Scalars | Empty => Shape::Select,
            Range | Combinations => Shape::Generator,
            SortBy | GroupBy | MinBy | MaxBy | UniqueBy => Shape::Keyed,
            _ => Shape::Standard,
        }
    }

    pub fn signature(self) -> Signature {
        use Builtin::*;
        let (input, params) = match self {
            Length | ToNumber | ToString | Type | Infinite | Nan | IsInfinite | IsNan
            | IsFinite | IsNormal | Not | ToJson => (ParamType::Any, NO_ARGS),
            Arrays | Objects | Iterables | Booleans | Numbers | Normals | Finites | Strings
            | Nulls | Values | Scalars | Empty => (ParamType::Any, NO_ARGS),
            Utf8ByteLength | AsciiDowncase | AsciiUpcase | FromJson => {
                (ParamType::String, NO_ARGS)
            }
            Keys | KeysUnsorted => (ParamType::Iterable, NO_ARGS),
            Has => (ParamType::Iterable, ONE_ANY),
            In | Select | Contains | Inside | Indices | Index | Rindex | LtrimStr
            | RtrimStr => (ParamType::Any, ONE_ANY),
            ToEntries => (ParamType::Object, NO_ARGS),
            FromEntries | Add | Any | All | Sort | Min | Max | Unique | Reverse => {
                (ParamType::Array, NO_ARGS)
            }
            Error => (ParamType::Any, OPTIONAL_ANY),
            Flatten | Combinations => (ParamType::Array, OPTIONAL_NUMBER),
            Range => (ParamType::Any, RANGE_BOUNDS),
            Floor | Sqrt => (ParamType::Number, NO_ARGS),
            SortBy | GroupBy | MinBy | MaxBy | UniqueBy => (ParamType::Array, ONE_ANY),
            StartsWith | EndsWith | Split => (ParamType::String, ONE_STRING),
            Join => (ParamType::Array, ONE_STRING),
        };
        Signature::new(self.name(), input, params)
    }

    /// Invoke a Standard, Select or Generator built-in for one combination.
    ///
    /// Returns the values this combination contributes; an empty vector
    /// removes the combination.
    pub fn invoke(self, input: &JsonValue, args: &[&JsonValue]) -> Result<Vec<JsonValue>, RuntimeError> {
        let signature = self.signature();
        signature.validate_arg_count(args.len())?;
        signature.validate_input(input)?;
        for (position, arg) in args.iter().enumerate() {
            signature.validate_arg(position, arg)?;
        }

        match self.shape() {
            Shape::Standard => Ok(self.call_standard(input, args)?.into_iter().collect()),
            Shape::Select => {
                if self.passes(input, args) {
                    Ok(vec![input.clone()])
                } else {
                    Ok(Vec::new())
                }
            }
            Shape::Generator => self.generate(input, args),
            Shape::Keyed => Err(RuntimeError::type_mismatch(format!(
                "{} needs a key filter evaluated per element",
                self.name()
            ))),
        }
    }

    fn passes(self, input: &JsonValue, args: &[&JsonValue]) -> bool {
        use Builtin::*;
        match self {
            Select => args.first().is_some_and(|pred| is_truthy(pred)),
            Arrays => input.is_array(),
            Objects => input.is_object(),
            Iterables => input.is_iterable(),
            Booleans => input.is_bool(),
            Numbers => input.is_number(),
            Normals => types::is_normal(input),
            Finites => types::is_finite(input),
            Strings => input.is_string(),
            Nulls => input.is_null(),
            Values => !input.is_null(),
            Scalars => !input.is_iterable(),
            _ => false,
        }
    }

    fn generate(self, input: &JsonValue, args: &[&JsonValue]) -> Result<Vec<JsonValue>, RuntimeError> {
        match self {
            Builtin::Range => {
                let bounds = args
                    .iter()
                    .map(|a| expect_number(self, a))
                    .collect::<Result<Vec<f64>, _>>()?;
                let (from, upto, by) = match bounds.as_slice() {
                    [upto] => (0.0, *upto, 1.0),
                    [from, upto] => (*from, *upto, 1.0),
                    [from, upto, by] => (*from, *upto, *by),
                    _ => return Err(arity_error(self, args.len())),
                };
                numeric::range(from, upto, by)
            }
            Builtin::Combinations => {
                let values = expect_array(self, input)?;
                match args.first() {
                    Some(n) => array::combinations_n(values, expect_number(self, n)?),
                    None => array::combinations(values),
                }
            }
            _ => Ok(self.call_standard(input, args)?.into_iter().collect()),
        }
    }

    fn call_standard(self, input: &JsonValue, args: &[&JsonValue]) -> Result<Option<JsonValue>, RuntimeError> {
        use Builtin::*;
        let arg = |i: usize| nth_arg(self, args, i);

        let value = match self {
            Length => object::length(input)?,
            Utf8ByteLength => JsonValue::from(expect_str(self, input)?.len()),
            Keys => object::keys(input, true),
            KeysUnsorted => object::keys(input, false),
            Has => JsonValue::Bool(object::has(input, arg(0)?)?),
            In => JsonValue::Bool(object::has(arg(0)?, input)?),
            ToEntries => object::to_entries(input),
            FromEntries => object::from_entries(expect_array(self, input)?)?,
            Error => {
                let message = match args.first() {
                    Some(message) => *message,
                    None => input,
                };
                return Err(RuntimeError::Raised(match message {
                    JsonValue::String(s) => s.to_string(),
                    other => other.to_string(),
                }));
            }
            Add => array::add(expect_array(self, input)?)?,
            Any => JsonValue::Bool(expect_array(self, input)?.iter().any(is_truthy)),
            All => JsonValue::Bool(expect_array(self, input)?.iter().all(is_truthy)),
            Flatten => {
                let depth = match args.first() {
                    Some(depth) => Some(expect_number(self, depth)?),
                    None => None,
                };
                array::flatten(expect_array(self, input)?, depth)?
            }
            Floor => JsonValue::Number(expect_number(self, input)?.floor()),
            Sqrt => JsonValue::Number(expect_number(self, input)?.sqrt()),
            ToNumber => numeric::to_number(input)?,
            ToString => string::to_string(input),
            Type => JsonValue::from(input.kind_name()),
            Infinite => JsonValue::Number(f64::INFINITY),
            Nan => JsonValue::Number(f64::NAN),
            IsInfinite => JsonValue::Bool(matches!(input, JsonValue::Number(n) if n.is_infinite())),
            IsNan => JsonValue::Bool(matches!(input, JsonValue::Number(n) if n.is_nan())),
            IsFinite => JsonValue::Bool(types::is_finite(input)),
            IsNormal => JsonValue::Bool(types::is_normal(input)),
            Sort => array::sort(expect_array(self, input)?),
            Min => return Ok(array::min(expect_array(self, input)?)),
            Max => return Ok(array::max(expect_array(self, input)?)),
            Unique => array::unique(expect_array(self, input)?),
            Reverse => {
                let mut reversed = expect_array(self, input)?.clone();
                reversed.reverse();
                JsonValue::array(reversed)
            }
            Contains => JsonValue::Bool(types::contains(input, arg(0)?)?),
            Inside => JsonValue::Bool(types::contains(arg(0)?, input)?),
            Indices => types::indices(input, arg(0)?)?,
            Index => types::first_or_last_index(input, arg(0)?, false)?,
            Rindex => types::first_or_last_index(input, arg(0)?, true)?,
            StartsWith => JsonValue::Bool(expect_str(self, input)?.starts_with(expect_str(self, arg(0)?)?)),
            EndsWith => JsonValue::Bool(expect_str(self, input)?.ends_with(expect_str(self, arg(0)?)?)),
            Not => JsonValue::Bool(!is_truthy(input)),
            Join => string::join(expect_array(self, input)?, expect_str(self, arg(0)?)?)?,
            AsciiDowncase => JsonValue::from(expect_str(self, input)?.to_ascii_lowercase()),
            AsciiUpcase => JsonValue::from(expect_str(self, input)?.to_ascii_uppercase()),
            LtrimStr => string::trim_affix(input, arg(0)?, false),
            RtrimStr => string::trim_affix(input, arg(0)?, true),
            Split => crate::operators::split(expect_str(self, input)?, expect_str(self, arg(0)?)?),
            ToJson => JsonValue::from(input.to_string()),
            FromJson => string::from_json(expect_str(self, input)?)?,
            Select | Arrays | Objects | Iterables | Booleans | Numbers | Normals | Finites
            | Strings | Nulls | Values | Scalars | Empty | Range | Combinations | SortBy
            | GroupBy | MinBy | MaxBy | UniqueBy => {
                return Err(RuntimeError::type_mismatch(format!(
                    "{} cannot be called as a plain function",
                    self.name()
                )))
            }
        };
        Ok(Some(value))
    }

    /// Apply a Keyed built-in given each element's key.
    ///
    /// `keys[i]` is the key computed for `values[i]`. Returns `None` when the
    /// result is absent (`min_by`/`max_by` of an empty array).
    pub fn apply_keyed(self, values: &[JsonValue], keys: &[JsonValue]) -> Result<Option<JsonValue>, RuntimeError> {
        if values.len() != keys.len() {
            return Err(RuntimeError::type_mismatch(format!(
                "{}: {} keys for {} elements",
                self.name(),
                keys.len(),
                values.len()
            )));
        }
        let result = match self {
            Builtin::SortBy => Some(array::sort_by(values, keys)),
            Builtin::GroupBy => Some(array::group_by(values, keys)),
            Builtin::UniqueBy => Some(array::unique_by(values, keys)),
            Builtin::MinBy => array::min_by(values, keys),
            Builtin::MaxBy => array::max_by(values, keys),
            _ => {
                return Err(RuntimeError::type_mismatch(format!(
                    "{} does not take a key filter",
                    self.name()
                )))
            }
        };
        Ok(result)
    }
}

fn arity_error(builtin: Builtin, actual: usize) -> RuntimeError {
    match builtin.signature().validate_arg_count(actual) {
        Err(e) => e.into(),
        Ok(()) => SignatureError::ArgumentCountMismatch {
            name: builtin.name().to_string(),
            expected: builtin.signature().max_args().to_string(),
            actual,
        }
        .into(),
    }
}

fn nth_arg<'a>(builtin: Builtin, args: &[&'a JsonValue], i: usize) -> Result<&'a JsonValue, RuntimeError> {
    args.get(i).copied().ok_or_else(|| arity_error(builtin, args.len()))
}

fn input_error(builtin: Builtin, expected: ParamType, value: &JsonValue) -> RuntimeError {
    SignatureError::InputMismatch {
        name: builtin.name().to_string(),
        expected,
        found: value.kind_name(),
    }
    .into()
}

fn expect_array(builtin: Builtin, value: &JsonValue) -> Result<&Vec<JsonValue>, RuntimeError> {
    value
        .as_array()
        .ok_or_else(|| input_error(builtin, ParamType::Array, value))
}

fn expect_str(builtin: Builtin, value: &JsonValue) -> Result<&str, RuntimeError> {
    value
        .as_str()
        .ok_or_else(|| input_error(builtin, ParamType::String, value))
}

fn expect_number(builtin: Builtin, value: &JsonValue) -> Result<f64, RuntimeError> {
    value
        .as_f64()
        .ok_or_else(|| input_error(builtin, ParamType::Number, value))
}

/// Built-in string functions
pub mod string {
    use super::*;

    /// tostring - strings unchanged, everything else as compact JSON
    pub fn to_string(value: &JsonValue) -> JsonValue {
        match value {
            JsonValue::String(_) => value.clone(),
            other => JsonValue::from(other.to_string()),
        }
    }

    /// fromjson - parse JSON text
    pub fn from_json(text: &str) -> Result<JsonValue, RuntimeError> {
        JsonValue::from_json_str(text).map_err(|_| RuntimeError::Conversion(text.to_string(), "JSON"))
    }

    /// join(sep) - concatenate strings, numbers and booleans; null joins as ""
    pub fn join(values: &[JsonValue], separator: &str) -> Result<JsonValue, RuntimeError> {
        let mut joined = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                joined.push_str(separator);
            }
            match value {
                JsonValue::Null => {}
                JsonValue::String(s) => joined.push_str(s),
                JsonValue::Number(_) | JsonValue::Bool(_) => joined.push_str(&value.to_string()),
                other => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot join with {} ({})",
                        truncated(other),
                        other.kind_name()
                    )))
                }
            }
        }
        Ok(JsonValue::from(joined))
    }

    /// ltrimstr / rtrimstr - drop a prefix or suffix when present
    pub fn trim_affix(input: &JsonValue, affix: &JsonValue, suffix: bool) -> JsonValue {
        let (Some(s), Some(a)) = (input.as_str(), affix.as_str()) else {
            return input.clone();
        };
        let trimmed = if suffix {
            s.strip_suffix(a)
        } else {
            s.strip_prefix(a)
        };
        match trimmed {
            Some(rest) => JsonValue::from(rest),
            None => input.clone(),
        }
    }

    /// Positions (in characters) of every, possibly overlapping, occurrence.
    pub fn indices(haystack: &str, needle: &str) -> JsonValue {
        if needle.is_empty() {
            return JsonValue::Null;
        }
        let hay: Vec<char> = haystack.chars().collect();
        let pat: Vec<char> = needle.chars().collect();
        let positions = hay
            .windows(pat.len())
            .enumerate()
            .filter(|(_, window)| *window == pat.as_slice())
            .map(|(i, _)| JsonValue::from(i))
            .collect();
        JsonValue::array(positions)
    }
}

/// Built-in numeric functions
pub mod numeric {
    use super::*;

    /// tonumber - numbers unchanged, strings parsed as JSON numbers
    pub fn to_number(value: &JsonValue) -> Result<JsonValue, RuntimeError> {
        match value {
            JsonValue::Number(_) => Ok(value.clone()),
            JsonValue::String(s) => serde_json::from_str::<f64>(s)
                .map(JsonValue::Number)
                .map_err(|_| RuntimeError::Conversion(s.to_string(), "a number")),
            other => Err(RuntimeError::type_mismatch(format!(
                "{} ({}) cannot be parsed as a number",
                truncated(other),
                other.kind_name()
            ))),
        }
    }

    /// range(from; upto; by) - step from `from` towards `upto`, exclusive
    ///
    /// A step pointing away from `upto` (or a zero step) yields nothing.
    pub fn range(from: f64, upto: f64, by: f64) -> Result<Vec<JsonValue>, RuntimeError> {
        if !from.is_finite() || !upto.is_finite() || !by.is_finite() {
            return Err(RuntimeError::type_mismatch(format!(
                "range bounds must be finite: range({}; {}; {})",
                JsonValue::Number(from),
                JsonValue::Number(upto),
                JsonValue::Number(by)
            )));
        }
        let ascending = from < upto;
        if (ascending && by <= 0.0) || (!ascending && by >= 0.0) {
            return Ok(Vec::new());
        }
        let count = ((upto - from) / by).ceil().max(0.0);
        if count > MAX_GENERATED_LEN as f64 {
            return Err(RuntimeError::TooLarge(format!(
                "range too large: range({}; {}; {}) would produce {} values",
                JsonValue::Number(from),
                JsonValue::Number(upto),
                JsonValue::Number(by),
                JsonValue::Number(count)
            )));
        }
        let count = count as usize;
        Ok((0..count)
            .map(|k| JsonValue::Number(from + k as f64 * by))
            .collect())
    }
}

/// Built-in array functions
pub mod array {
    use super::*;
    use crate::operators;
    use crate::utils::{cartesian, compare_values, sort_values};

    /// add - fold with `+`; empty arrays add up to null
    pub fn add(values: &[JsonValue]) -> Result<JsonValue, RuntimeError> {
        values
            .iter()
            .try_fold(JsonValue::Null, |acc, v| operators::add(&acc, v))
    }

    /// flatten / flatten(depth)
    pub fn flatten(values: &[JsonValue], depth: Option<f64>) -> Result<JsonValue, RuntimeError> {
        let depth = match depth {
            None => usize::MAX,
            Some(d) if d < 0.0 => {
                return Err(RuntimeError::type_mismatch("flatten depth must not be negative"))
            }
            Some(d) if d.is_nan() => 0,
            Some(d) => d.floor().min(usize::MAX as f64) as usize,
        };
        Ok(JsonValue::array(crate::utils::flatten(values, depth)))
    }

    pub fn sort(values: &[JsonValue]) -> JsonValue {
        let mut sorted = values.to_vec();
        sort_values(&mut sorted);
        JsonValue::array(sorted)
    }

    /// unique - sorted, with deep-equal duplicates removed
    pub fn unique(values: &[JsonValue]) -> JsonValue {
        let mut sorted = values.to_vec();
        sort_values(&mut sorted);
        sorted.dedup_by(|a, b| values_equal(a, b));
        JsonValue::array(sorted)
    }

    /// min - first minimal element
    pub fn min(values: &[JsonValue]) -> Option<JsonValue> {
        values.iter().min_by(|a, b| compare_values(a, b)).cloned()
    }

    /// max - last maximal element
    pub fn max(values: &[JsonValue]) -> Option<JsonValue> {
        values.iter().max_by(|a, b| compare_values(a, b)).cloned()
    }

    // Element positions stably sorted by key.
    fn order_by_keys(keys: &[JsonValue]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&i, &j| compare_values(&keys[i], &keys[j]));
        order
    }

    // Runs of positions whose keys are equal, in key order.
    fn groups(keys: &[JsonValue]) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in order_by_keys(keys) {
            match groups.last_mut() {
                Some(group) if values_equal(&keys[group[0]], &keys[i]) => group.push(i),
                _ => groups.push(vec![i]),
            }
        }
        groups
    }

    pub fn sort_by(values: &[JsonValue], keys: &[JsonValue]) -> JsonValue {
        JsonValue::array(
            order_by_keys(keys)
                .into_iter()
                .map(|i| values[i].clone())
                .collect(),
        )
    }

    pub fn group_by(values: &[JsonValue], keys: &[JsonValue]) -> JsonValue {
        JsonValue::array(
            groups(keys)
                .into_iter()
                .map(|group| JsonValue::array(group.into_iter().map(|i| values[i].clone()).collect()))
                .collect(),
        )
    }

    pub fn unique_by(values: &[JsonValue], keys: &[JsonValue]) -> JsonValue {
        JsonValue::array(
            groups(keys)
                .into_iter()
                .map(|group| values[group[0]].clone())
                .collect(),
        )
    }

    pub fn min_by(values: &[JsonValue], keys: &[JsonValue]) -> Option<JsonValue> {
        (0..values.len())
            .min_by(|&i, &j| compare_values(&keys[i], &keys[j]))
            .map(|i| values[i].clone())
    }

    pub fn max_by(values: &[JsonValue], keys: &[JsonValue]) -> Option<JsonValue> {
        (0..values.len())
            .max_by(|&i, &j| compare_values(&keys[i], &keys[j]))
            .map(|i| values[i].clone())
    }

    /// combinations - one element from each inner array, leftmost varying slowest
    pub fn combinations(values: &[JsonValue]) -> Result<Vec<JsonValue>, RuntimeError> {
        let streams = values
            .iter()
            .map(|v| match v {
                JsonValue::Array(items) => Ok(items.to_vec()),
                other => Err(RuntimeError::type_mismatch(format!(
                    "cannot take combinations of {} ({})",
                    truncated(other),
                    other.kind_name()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let total = streams
            .iter()
            .try_fold(1usize, |acc, stream| acc.checked_mul(stream.len()));
        check_combinations(total, streams.len())?;
        Ok(collect_combinations(&streams))
    }

    /// combinations(n) - the input array repeated `n` times
    pub fn combinations_n(values: &[JsonValue], n: f64) -> Result<Vec<JsonValue>, RuntimeError> {
        if n.is_nan() || n <= 0.0 {
            return Ok(collect_combinations(&[]));
        }
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let times = n.ceil();
        if times > MAX_COMBINATION_WIDTH as f64 {
            return Err(too_many_combinations());
        }
        let times = times as usize;
        let total = u32::try_from(times)
            .ok()
            .and_then(|t| values.len().checked_pow(t));
        check_combinations(total, times)?;
        let streams = vec![values.to_vec(); times];
        Ok(collect_combinations(&streams))
    }

    const MAX_COMBINATION_WIDTH: usize = 1 << 12;

    // Every combination holds `width` elements, so the bound covers the
    // combinations and their contents together.
    fn check_combinations(total: Option<usize>, width: usize) -> Result<(), RuntimeError> {
        match total.and_then(|t| t.checked_mul(width.max(1))) {
            Some(size) if size <= MAX_GENERATED_LEN && width <= MAX_COMBINATION_WIDTH => Ok(()),
            _ => Err(too_many_combinations()),
        }
    }

    fn too_many_combinations() -> RuntimeError {
        RuntimeError::TooLarge("combinations too large".to_string())
    }

    fn collect_combinations(streams: &[Vec<JsonValue>]) -> Vec<JsonValue> {
        cartesian(streams)
            .into_iter()
            .map(|combo| JsonValue::array(combo.into_iter().cloned().collect()))
            .collect()
    }
}

/// Built-in object functions
pub mod object {
    use super::*;
    use crate::utils::sorted_keys;
    use crate::value::Map;

    /// length - key count, element count, character count; null is 0
    pub fn length(value: &JsonValue) -> Result<JsonValue, RuntimeError> {
        match value {
            JsonValue::Null => Ok(JsonValue::from(0usize)),
            JsonValue::String(s) => Ok(JsonValue::from(s.chars().count())),
            JsonValue::Array(a) => Ok(JsonValue::from(a.len())),
            JsonValue::Object(m) => Ok(JsonValue::from(m.len())),
            other => Err(RuntimeError::type_mismatch(format!(
                "{} ({}) has no length",
                truncated(other),
                other.kind_name()
            ))),
        }
    }

    /// keys / keys_unsorted - object keys, or array positions
    pub fn keys(value: &JsonValue, sorted: bool) -> JsonValue {
        match value {
            JsonValue::Object(m) if sorted => {
                JsonValue::array(sorted_keys(m).into_iter().map(JsonValue::from).collect())
            }
            JsonValue::Object(m) => {
                JsonValue::array(m.keys().map(|k| JsonValue::from(k.as_str())).collect())
            }
            JsonValue::Array(a) => JsonValue::array((0..a.len()).map(JsonValue::from).collect()),
            _ => JsonValue::array(Vec::new()),
        }
    }

    /// has(key) - string key on an object, numeric position on an array
    pub fn has(container: &JsonValue, key: &JsonValue) -> Result<bool, RuntimeError> {
        match (container, key) {
            (JsonValue::Object(m), JsonValue::String(k)) => Ok(m.contains_key(&**k)),
            (JsonValue::Array(a), JsonValue::Number(n)) => Ok(*n >= 0.0 && *n < a.len() as f64),
            _ => Err(RuntimeError::type_mismatch(format!(
                "cannot check whether {} has a key of type {}",
                container.kind_name(),
                key.kind_name()
            ))),
        }
    }

    /// to_entries - `[{key, value}]` in insertion order
    pub fn to_entries(value: &JsonValue) -> JsonValue {
        let Some(map) = value.as_object() else {
            return JsonValue::array(Vec::new());
        };
        JsonValue::array(
            map.iter()
                .map(|(k, v)| {
                    let mut entry = Map::with_capacity(2);
                    entry.insert("key".to_string(), JsonValue::from(k.as_str()));
                    entry.insert("value".to_string(), v.clone());
                    JsonValue::object(entry)
                })
                .collect(),
        )
    }

    /// from_entries - inverse of to_entries; later duplicates win
    pub fn from_entries(entries: &[JsonValue]) -> Result<JsonValue, RuntimeError> {
        let mut map = Map::with_capacity(entries.len());
        for entry in entries {
            match (entry.get("key"), entry.get("value")) {
                (Some(JsonValue::String(key)), Some(value)) => {
                    map.insert(key.to_string(), value.clone());
                }
                _ => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "from_entries expects {{\"key\": string, \"value\": any}}, got {}",
                        truncated(entry)
                    )))
                }
            }
        }
        Ok(JsonValue::object(map))
    }
}

/// Type predicates, containment and searching
pub mod types {
    use super::*;
    use crate::utils::ensure_sufficient_stack;

    pub fn is_normal(value: &JsonValue) -> bool {
        matches!(value, JsonValue::Number(n) if n.is_normal())
    }

    pub fn is_finite(value: &JsonValue) -> bool {
        matches!(value, JsonValue::Number(n) if n.is_finite())
    }

    /// contains(b) - substring, element-wise and key-wise containment
    ///
    /// Top-level kinds must agree; nested kind mismatches are simply not contained.
    pub fn contains(a: &JsonValue, b: &JsonValue) -> Result<bool, RuntimeError> {
        if a.kind_name() != b.kind_name() {
            return Err(RuntimeError::type_mismatch(format!(
                "{} ({}) and {} ({}) cannot have their containment checked",
                truncated(a),
                a.kind_name(),
                truncated(b),
                b.kind_name()
            )));
        }
        Ok(value_contains(a, b))
    }

    fn value_contains(haystack: &JsonValue, needle: &JsonValue) -> bool {
        ensure_sufficient_stack(|| match (haystack, needle) {
            (JsonValue::String(h), JsonValue::String(n)) => h.contains(&**n),
            (JsonValue::Array(h), JsonValue::Array(n)) => n
                .iter()
                .all(|ni| h.iter().any(|hi| value_contains(hi, ni))),
            (JsonValue::Object(h), JsonValue::Object(n)) => n
                .iter()
                .all(|(k, nv)| h.get(k).is_some_and(|hv| value_contains(hv, nv))),
            (h, n) => values_equal(h, n),
        })
    }

    /// indices(x) - every position where `x` occurs
    pub fn indices(input: &JsonValue, needle: &JsonValue) -> Result<JsonValue, RuntimeError> {
        match (input, needle) {
            (JsonValue::Null, _) => Ok(JsonValue::Null),
            (JsonValue::String(h), JsonValue::String(n)) => Ok(string::indices(h, n)),
            (JsonValue::Array(h), JsonValue::Array(n)) => {
                if n.is_empty() {
                    return Ok(JsonValue::Null);
                }
                Ok(JsonValue::array(
                    h.windows(n.len())
                        .enumerate()
                        .filter(|(_, w)| w.iter().zip(n.iter()).all(|(a, b)| values_equal(a, b)))
                        .map(|(i, _)| JsonValue::from(i))
                        .collect(),
                ))
            }
            (JsonValue::Array(h), _) => Ok(JsonValue::array(
                h.iter()
                    .enumerate()
                    .filter(|(_, v)| values_equal(v, needle))
                    .map(|(i, _)| JsonValue::from(i))
                    .collect(),
            )),
            _ => Err(RuntimeError::type_mismatch(format!(
                "cannot search for {} ({}) in {} ({})",
                truncated(needle),
                needle.kind_name(),
                truncated(input),
                input.kind_name()
            ))),
        }
    }

    /// index(x) / rindex(x) - first or last position, or null
    pub fn first_or_last_index(input: &JsonValue, needle: &JsonValue, last: bool) -> Result<JsonValue, RuntimeError> {
        let found = indices(input, needle)?;
        let position = found.as_array().and_then(|positions| {
            if last {
                positions.last().cloned()
            } else {
                positions.first().cloned()
            }
        });
        Ok(position.unwrap_or(JsonValue::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value;
    use pretty_assertions::assert_eq;

    fn call(builtin: Builtin, input: JsonValue, args: &[JsonValue]) -> Result<Vec<JsonValue>, RuntimeError> {
        let args: Vec<&JsonValue> = args.iter().collect();
        builtin.invoke(&input, &args)
    }

    fn one(builtin: Builtin, input: JsonValue, args: &[JsonValue]) -> JsonValue {
        let mut out = call(builtin, input, args).unwrap();
        assert_eq!(out.len(), 1, "{} should produce one value", builtin.name());
        out.remove(0)
    }

    #[test]
    fn test_name_table_round_trips() {
        for builtin in Builtin::all() {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("path"), None);
        assert_eq!(Derived::from_name("map"), Some(Derived::Map));
    }

    #[test]
    fn test_length() {
        assert_eq!(one(Builtin::Length, json_value!("héllo"), &[]), json_value!(5));
        assert_eq!(one(Builtin::Length, json_value!(null), &[]), json_value!(0));
        assert_eq!(one(Builtin::Length, json_value!({"a": 1, "b": 2}), &[]), json_value!(2));
        assert!(call(Builtin::Length, json_value!(true), &[]).is_err());
        assert_eq!(one(Builtin::Utf8ByteLength, json_value!("héllo"), &[]), json_value!(6));
    }

    #[test]
    fn test_keys_sorted_and_unsorted() {
        let obj = JsonValue::from_json_str(r#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        assert_eq!(one(Builtin::Keys, obj.clone(), &[]), json_value!(["a", "b", "c"]));
        assert_eq!(one(Builtin::KeysUnsorted, obj, &[]), json_value!(["b", "a", "c"]));
        assert_eq!(one(Builtin::Keys, json_value!([5, 6]), &[]), json_value!([0, 1]));
    }

    #[test]
    fn test_has_and_in() {
        assert_eq!(one(Builtin::Has, json_value!({"a": 1}), &[json_value!("a")]), json_value!(true));
        assert_eq!(one(Builtin::Has, json_value!([1, 2]), &[json_value!(2)]), json_value!(false));
        assert_eq!(one(Builtin::In, json_value!("b"), &[json_value!({"a": 1})]), json_value!(false));
        assert!(call(Builtin::Has, json_value!({"a": 1}), &[json_value!(0)]).is_err());
    }

    #[test]
    fn test_entries() {
        let entries = one(Builtin::ToEntries, json_value!({"a": 1}), &[]);
        assert_eq!(entries, json_value!([{"key": "a", "value": 1}]));
        assert_eq!(one(Builtin::FromEntries, entries, &[]), json_value!({"a": 1}));
        assert!(call(Builtin::FromEntries, json_value!([{"k": "a"}]), &[]).is_err());
    }

    #[test]
    fn test_select_shape() {
        assert_eq!(call(Builtin::Select, json_value!(3), &[json_value!(true)]).unwrap(), vec![json_value!(3)]);
        assert!(call(Builtin::Select, json_value!(3), &[json_value!(null)]).unwrap().is_empty());
        assert!(call(Builtin::Empty, json_value!(3), &[]).unwrap().is_empty());
        assert_eq!(call(Builtin::Scalars, json_value!("s"), &[]).unwrap(), vec![json_value!("s")]);
        assert!(call(Builtin::Iterables, json_value!(1), &[]).unwrap().is_empty());
        assert!(call(Builtin::Normals, json_value!(0), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_error_carries_message() {
        assert_eq!(
            call(Builtin::Error, json_value!(null), &[json_value!("msg")]),
            Err(RuntimeError::Raised("msg".to_string()))
        );
        assert_eq!(
            call(Builtin::Error, json_value!({"a": 1}), &[]),
            Err(RuntimeError::Raised(r#"{"a":1}"#.to_string()))
        );
    }

    #[test]
    fn test_add_any_all() {
        assert_eq!(one(Builtin::Add, json_value!([1, 2, 3]), &[]), json_value!(6));
        assert_eq!(one(Builtin::Add, json_value!(["a", null, "b"]), &[]), json_value!("ab"));
        assert_eq!(one(Builtin::Add, json_value!([0, 5]), &[]), json_value!(5));
        assert_eq!(one(Builtin::Add, json_value!([]), &[]), json_value!(null));
        assert_eq!(one(Builtin::Any, json_value!([null, 0]), &[]), json_value!(true));
        assert_eq!(one(Builtin::All, json_value!([]), &[]), json_value!(true));
    }

    #[test]
    fn test_flatten() {
        assert_eq!(one(Builtin::Flatten, json_value!([1, [2, [3]]]), &[]), json_value!([1, 2, 3]));
        assert_eq!(one(Builtin::Flatten, json_value!([1, [2, [3]]]), &[json_value!(1)]), json_value!([1, 2, [3]]));
        assert!(call(Builtin::Flatten, json_value!([1]), &[JsonValue::Number(-1.0)]).is_err());
        assert!(call(Builtin::Flatten, json_value!([1]), &[json_value!("x")]).is_err());
    }

    #[test]
    fn test_range() {
        let r = |args: &[JsonValue]| call(Builtin::Range, json_value!(null), args).unwrap();
        assert_eq!(r(&[json_value!(3)]), vec![json_value!(0), json_value!(1), json_value!(2)]);
        assert_eq!(r(&[json_value!(2), json_value!(4)]), vec![json_value!(2), json_value!(3)]);
        assert!(r(&[json_value!(0), json_value!(10), JsonValue::Number(-1.0)]).is_empty());
        assert_eq!(
            JsonValue::array(r(&[json_value!(0), JsonValue::Number(-5.0), JsonValue::Number(-1.0)])),
            json_value!([0, -1, -2, -3, -4])
        );
        assert!(r(&[json_value!(5), json_value!(5)]).is_empty());
        assert!(call(Builtin::Range, json_value!(null), &[JsonValue::Number(f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_range_too_large_fails() {
        assert!(matches!(
            call(Builtin::Range, json_value!(null), &[json_value!(1e19)]),
            Err(RuntimeError::TooLarge(_))
        ));
        assert!(matches!(
            call(Builtin::Range, json_value!(null), &[json_value!(0), json_value!(1), json_value!(1e-30)]),
            Err(RuntimeError::TooLarge(_))
        ));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(one(Builtin::ToNumber, json_value!("1.5"), &[]), json_value!(1.5));
        assert!(call(Builtin::ToNumber, json_value!("abc"), &[]).is_err());
        assert_eq!(one(Builtin::ToString, json_value!([1, "a"]), &[]), json_value!(r#"[1,"a"]"#));
        assert_eq!(one(Builtin::ToString, json_value!("a"), &[]), json_value!("a"));
        assert_eq!(one(Builtin::Type, json_value!({}), &[]), json_value!("object"));
        assert_eq!(one(Builtin::FromJson, json_value!("[1,2]"), &[]), json_value!([1, 2]));
        assert_eq!(one(Builtin::ToJson, json_value!({"a": "b"}), &[]), json_value!(r#"{"a":"b"}"#));
    }

    #[test]
    fn test_float_classification() {
        assert_eq!(one(Builtin::IsInfinite, JsonValue::Number(f64::NEG_INFINITY), &[]), json_value!(true));
        assert_eq!(one(Builtin::IsNan, JsonValue::Number(f64::NAN), &[]), json_value!(true));
        assert_eq!(one(Builtin::IsFinite, json_value!("1"), &[]), json_value!(false));
        assert_eq!(one(Builtin::IsNormal, json_value!(0), &[]), json_value!(false));
        assert_eq!(one(Builtin::Floor, json_value!(2.7), &[]), json_value!(2));
        assert_eq!(one(Builtin::Sqrt, json_value!(9), &[]), json_value!(3));
        assert!(call(Builtin::Floor, json_value!("2"), &[]).is_err());
    }

    #[test]
    fn test_sort_min_max_unique() {
        let mixed = json_value!([3, "a", null, [1], true, {"a": 1}, false, 1]);
        assert_eq!(
            one(Builtin::Sort, mixed, &[]),
            json_value!([null, false, true, 1, 3, "a", [1], {"a": 1}])
        );
        assert_eq!(one(Builtin::Min, json_value!([3, 1, 2]), &[]), json_value!(1));
        assert_eq!(one(Builtin::Max, json_value!([3, 1, 2]), &[]), json_value!(3));
        assert!(call(Builtin::Min, json_value!([]), &[]).unwrap().is_empty());
        assert_eq!(one(Builtin::Unique, json_value!([2, 1, 2, 1]), &[]), json_value!([1, 2]));
        assert_eq!(one(Builtin::Reverse, json_value!([1, 2, 3]), &[]), json_value!([3, 2, 1]));
    }

    #[test]
    fn test_keyed_functions() {
        let values = vec![json_value!({"n": 2}), json_value!({"n": 1}), json_value!({"n": 2, "x": 0})];
        let keys = vec![json_value!([2]), json_value!([1]), json_value!([2])];

        assert_eq!(
            Builtin::SortBy.apply_keyed(&values, &keys).unwrap(),
            Some(json_value!([{"n": 1}, {"n": 2}, {"n": 2, "x": 0}]))
        );
        assert_eq!(
            Builtin::GroupBy.apply_keyed(&values, &keys).unwrap(),
            Some(json_value!([[{"n": 1}], [{"n": 2}, {"n": 2, "x": 0}]]))
        );
        assert_eq!(
            Builtin::UniqueBy.apply_keyed(&values, &keys).unwrap(),
            Some(json_value!([{"n": 1}, {"n": 2}]))
        );
        assert_eq!(Builtin::MinBy.apply_keyed(&values, &keys).unwrap(), Some(json_value!({"n": 1})));
        assert_eq!(Builtin::MaxBy.apply_keyed(&values, &keys).unwrap(), Some(json_value!({"n": 2, "x": 0})));
        assert_eq!(Builtin::MaxBy.apply_keyed(&[], &[]).unwrap(), None);
    }

    #[test]
    fn test_contains_and_inside() {
        assert_eq!(one(Builtin::Contains, json_value!("foobar"), &[json_value!("bar")]), json_value!(true));
        assert_eq!(
            one(Builtin::Contains, json_value!(["foobar", "baz"]), &[json_value!(["baz", "bar"])]),
            json_value!(true)
        );
        assert_eq!(
            one(Builtin::Contains, json_value!({"a": [1, 2], "b": 3}), &[json_value!({"a": [1]})]),
            json_value!(true)
        );
        assert_eq!(
            one(Builtin::Contains, json_value!({"a": 1}), &[json_value!({"b": 1})]),
            json_value!(false)
        );
        assert!(call(Builtin::Contains, json_value!([1]), &[json_value!(1)]).is_err());
        assert_eq!(one(Builtin::Inside, json_value!("bar"), &[json_value!("foobar")]), json_value!(true));
    }

    #[test]
    fn test_indices() {
        assert_eq!(one(Builtin::Indices, json_value!("a,b, cd, efg"), &[json_value!(", ")]), json_value!([3, 7]));
        assert_eq!(one(Builtin::Indices, json_value!([0, 1, 2, 1, 3, 1, 2]), &[json_value!(1)]), json_value!([1, 3, 5]));
        assert_eq!(one(Builtin::Indices, json_value!([0, 1, 2, 1, 3, 1, 2]), &[json_value!([1, 2])]), json_value!([1, 5]));
        assert_eq!(one(Builtin::Index, json_value!("abcb"), &[json_value!("b")]), json_value!(1));
        assert_eq!(one(Builtin::Rindex, json_value!("abcb"), &[json_value!("b")]), json_value!(3));
        assert_eq!(one(Builtin::Index, json_value!("abc"), &[json_value!("z")]), json_value!(null));
        assert_eq!(one(Builtin::Indices, json_value!(null), &[json_value!("z")]), json_value!(null));
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(one(Builtin::StartsWith, json_value!("foobar"), &[json_value!("foo")]), json_value!(true));
        assert_eq!(one(Builtin::EndsWith, json_value!("foobar"), &[json_value!("foo")]), json_value!(false));
        assert!(call(Builtin::StartsWith, json_value!(1), &[json_value!("foo")]).is_err());
        assert_eq!(one(Builtin::Join, json_value!(["a", 1, null, true]), &[json_value!("-")]), json_value!("a-1--true"));
        assert!(call(Builtin::Join, json_value!([[1]]), &[json_value!(",")]).is_err());
        assert_eq!(one(Builtin::AsciiUpcase, json_value!("abC"), &[]), json_value!("ABC"));
        assert_eq!(one(Builtin::LtrimStr, json_value!("foobar"), &[json_value!("foo")]), json_value!("bar"));
        assert_eq!(one(Builtin::RtrimStr, json_value!("foobar"), &[json_value!("foo")]), json_value!("foobar"));
        assert_eq!(one(Builtin::LtrimStr, json_value!(1), &[json_value!("foo")]), json_value!(1));
        assert_eq!(one(Builtin::Split, json_value!("a,b"), &[json_value!(",")]), json_value!(["a", "b"]));
        assert_eq!(one(Builtin::Not, json_value!(null), &[]), json_value!(true));
    }

    #[test]
    fn test_combinations() {
        assert_eq!(
            call(Builtin::Combinations, json_value!([[1, 2], [3, 4]]), &[]).unwrap(),
            vec![json_value!([1, 3]), json_value!([1, 4]), json_value!([2, 3]), json_value!([2, 4])]
        );
        assert_eq!(
            call(Builtin::Combinations, json_value!([0, 1]), &[json_value!(2)]).unwrap(),
            vec![json_value!([0, 0]), json_value!([0, 1]), json_value!([1, 0]), json_value!([1, 1])]
        );
        assert!(call(Builtin::Combinations, json_value!([1]), &[]).is_err());
        assert_eq!(call(Builtin::Combinations, json_value!([1, 2]), &[json_value!(0)]).unwrap(), vec![json_value!([])]);
        assert!(call(Builtin::Combinations, json_value!([]), &[json_value!(1e19)]).unwrap().is_empty());
    }

    #[test]
    fn test_combinations_too_large_fails() {
        assert!(matches!(
            call(Builtin::Combinations, json_value!([0, 1]), &[json_value!(1e19)]),
            Err(RuntimeError::TooLarge(_))
        ));
        assert!(matches!(
            call(Builtin::Combinations, json_value!([0, 1]), &[json_value!(64)]),
            Err(RuntimeError::TooLarge(_))
        ));
        let wide: Vec<JsonValue> = (0..4).map(|_| JsonValue::array((0..1000).map(JsonValue::from).collect())).collect();
        assert!(matches!(
            call(Builtin::Combinations, JsonValue::array(wide), &[]),
            Err(RuntimeError::TooLarge(_))
        ));
    }

    #[test]
    fn test_arity_is_checked() {
        assert!(matches!(
            call(Builtin::Length, json_value!(null), &[json_value!(1)]),
            Err(RuntimeError::Signature(SignatureError::ArgumentCountMismatch { .. }))
        ));
    }
}
