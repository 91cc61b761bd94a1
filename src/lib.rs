// jq_core - A jq-style query and transformation language core
// Copyright (c) 2025 jq_core contributors
// Licensed under the MIT License

//! # jq_core
//!
//! The core of a jq-style query language over JSON values: a parser, a lowering
//! pass producing an immutable evaluator tree, and a runtime where one input can
//! produce zero, one or many outputs.
//!
//! ## Architecture
//!
//! - `parser` - Source text to `ast::Statement`s
//! - `compiler` - Lowers statements into an `evaluator::Node` tree
//! - `evaluator` - Node tree execution over a `context::Context` of lanes
//! - `functions` - Built-in function library
//! - `operators` - Binary operator semantics
//! - `signature` - Built-in arity and input descriptions
//! - `utils` - Ordering, equality, merging and cartesian expansion
//! - `value` - The `JsonValue` data model
//!
//! ## Example
//!
//! ```
//! use jq_core::{compile, json_value};
//!
//! let program = compile(".[] | select(. > 1)").unwrap();
//! let out = program.evaluate(&json_value!([1, 2, 3])).unwrap();
//! assert_eq!(out, vec![json_value!(2), json_value!(3)]);
//! ```

use thiserror::Error;
use tracing::{debug, debug_span};

pub mod ast;
pub mod compiler;
pub mod context;
pub mod evaluator;
pub mod functions;
pub mod operators;
pub mod parser;
pub mod signature;
pub mod utils;
pub mod value;

pub use compiler::LoweringError;
pub use context::RuntimeError;
pub use parser::ParserError;
pub use value::JsonValue;

use context::Context;
use evaluator::Node;

/// Every failure a compile or evaluation call can report.
#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParserError),

    #[error("lowering error: {0}")]
    Lowering(#[from] LoweringError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compilation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Deepest expression nesting the parser accepts.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_depth: parser::DEFAULT_MAX_DEPTH,
        }
    }
}

/// A compiled program.
///
/// Compile once, then evaluate against as many inputs as needed; the program
/// is never modified by evaluation.
#[derive(Debug, Clone)]
pub struct Program {
    root: Node,
}

impl Program {
    pub fn compile(source: &str) -> Result<Self, Error> {
        Self::compile_with(source, Options::default())
    }

    pub fn compile_with(source: &str, options: Options) -> Result<Self, Error> {
        let _span = debug_span!("compile", len = source.len(), max_depth = options.max_depth).entered();

        let statements = parser::parse_with_depth(source, options.max_depth)?;
        let root = compiler::lower(&statements)?;
        debug!(nodes = root.size(), "lowered program");

        Ok(Program { root })
    }

    /// Run against one input. Outputs come back in order; the first error lane
    /// (in lane order) is returned instead.
    pub fn evaluate(&self, input: &JsonValue) -> Result<Vec<JsonValue>, Error> {
        let _span = debug_span!("evaluate").entered();

        let output = self.root.evaluate(&Context::from_value(input.clone()));
        output.into_values().map_err(|e| {
            debug!(error = %e, "evaluation surfaced an error lane");
            Error::Runtime(e)
        })
    }

    /// Parse JSON text and run against it.
    pub fn evaluate_json(&self, input: &str) -> Result<Vec<JsonValue>, Error> {
        let input = JsonValue::from_json_str(input)?;
        self.evaluate(&input)
    }

    /// Run against a `serde_json::Value`, converting both ways.
    pub fn evaluate_value(&self, input: &serde_json::Value) -> Result<Vec<serde_json::Value>, Error> {
        let input = JsonValue::from(input.clone());
        Ok(self
            .evaluate(&input)?
            .iter()
            .map(serde_json::Value::from)
            .collect())
    }

    /// The evaluator tree, for debugging.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn dump(&self) -> serde_json::Value {
        self.root.dump()
    }
}

/// Compile a program with default options.
pub fn compile(source: &str) -> Result<Program, Error> {
    Program::compile(source)
}

/// Compile and run a program once.
pub fn evaluate(source: &str, input: &JsonValue) -> Result<Vec<JsonValue>, Error> {
    compile(source)?.evaluate(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_program_is_reusable() {
        let program = compile(".a + 1").unwrap();
        assert_eq!(program.evaluate(&json_value!({"a": 1})).unwrap(), vec![json_value!(2)]);
        assert_eq!(program.evaluate(&json_value!({"a": 41})).unwrap(), vec![json_value!(42)]);
    }

    #[test]
    fn test_first_error_lane_is_surfaced() {
        let err = evaluate(".[] | error(.)", &json_value!(["first", "second"])).unwrap_err();
        assert!(matches!(err, Error::Runtime(RuntimeError::Raised(ref m)) if m == "first"));
    }

    #[test]
    fn test_top_level_identifier_is_an_error() {
        let program = Program {
            root: Node::Identifier("user".into()),
        };
        assert!(matches!(
            program.evaluate(&JsonValue::Null),
            Err(Error::Runtime(RuntimeError::UnexpectedIdentifier(_)))
        ));
    }

    #[test]
    fn test_compile_errors_are_classified() {
        assert!(matches!(compile(".a |"), Err(Error::Parse(_))));
        assert!(matches!(compile("1; 2"), Err(Error::Lowering(LoweringError::MultipleExpressions(2)))));
    }

    #[test]
    fn test_max_depth_option() {
        let nested = format!("{}1{}", "[".repeat(20), "]".repeat(20));
        assert!(Program::compile_with(&nested, Options { max_depth: 256 }).is_ok());
        assert!(matches!(
            Program::compile_with(&nested, Options { max_depth: 8 }),
            Err(Error::Parse(ParserError::NestingTooDeep(_)))
        ));
    }

    #[test]
    fn test_evaluate_json_text() {
        let program = compile("keys_unsorted").unwrap();
        assert_eq!(
            program.evaluate_json(r#"{"b": 1, "a": 2}"#).unwrap(),
            vec![json_value!(["b", "a"])]
        );
        assert!(matches!(program.evaluate_json("{"), Err(Error::Json(_))));
    }
}
