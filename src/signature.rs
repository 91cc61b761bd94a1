// Built-in function signatures: arity and accepted input kinds

use std::fmt;

use thiserror::Error;

use crate::value::JsonValue;

/// Signature validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("{name}/{actual} is not defined: expected {expected} argument(s)")]
    ArgumentCountMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("{name} cannot be applied to {found}: expected {expected}")]
    InputMismatch {
        name: String,
        expected: ParamType,
        found: &'static str,
    },

    #[error("{name} argument {position} must be {expected}, got {found}")]
    ArgumentMismatch {
        name: String,
        position: usize,
        expected: ParamType,
        found: &'static str,
    },
}

/// Kind of value a built-in accepts, as input or as an argument output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Arrays or objects.
    Iterable,
    Any,
}

impl ParamType {
    pub fn matches(self, value: &JsonValue) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_bool(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Iterable => value.is_iterable(),
            ParamType::Any => true,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "a string",
            ParamType::Number => "a number",
            ParamType::Boolean => "a boolean",
            ParamType::Array => "an array",
            ParamType::Object => "an object",
            ParamType::Iterable => "an array or object",
            ParamType::Any => "any value",
        };
        f.write_str(name)
    }
}

/// Function parameter definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub param_type: ParamType,
    pub optional: bool,
}

impl Parameter {
    pub const fn required(param_type: ParamType) -> Self {
        Parameter {
            param_type,
            optional: false,
        }
    }

    pub const fn optional(param_type: ParamType) -> Self {
        Parameter {
            param_type,
            optional: true,
        }
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: &'static str,
    pub input: ParamType,
    pub params: &'static [Parameter],
}

impl Signature {
    pub const fn new(name: &'static str, input: ParamType, params: &'static [Parameter]) -> Self {
        Signature {
            name,
            input,
            params,
        }
    }

    pub fn min_args(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    pub fn max_args(&self) -> usize {
        self.params.len()
    }

    /// Validate argument count
    pub fn validate_arg_count(&self, actual: usize) -> Result<(), SignatureError> {
        let required = self.min_args();
        let max = self.max_args();

        if actual < required || actual > max {
            let expected = if required == max {
                required.to_string()
            } else {
                format!("{} to {}", required, max)
            };
            return Err(SignatureError::ArgumentCountMismatch {
                name: self.name.to_string(),
                expected,
                actual,
            });
        }

        Ok(())
    }

    /// Validate the value a call is applied to.
    pub fn validate_input(&self, input: &JsonValue) -> Result<(), SignatureError> {
        if self.input.matches(input) {
            Ok(())
        } else {
            Err(SignatureError::InputMismatch {
                name: self.name.to_string(),
                expected: self.input,
                found: input.kind_name(),
            })
        }
    }

    /// Validate one argument value against its declared parameter.
    pub fn validate_arg(&self, position: usize, value: &JsonValue) -> Result<(), SignatureError> {
        match self.params.get(position) {
            Some(param) if !param.param_type.matches(value) => {
                Err(SignatureError::ArgumentMismatch {
                    name: self.name.to_string(),
                    position: position + 1,
                    expected: param.param_type,
                    found: value.kind_name(),
                })
            }
            _ => Ok(()),
        }
    }
}
