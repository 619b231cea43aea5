//! # Expression evaluation
//!
//! Fragments embedded in action parameters are compiled once into an opaque
//! handle and evaluated any number of times against a [`VariableStore`]. The
//! [`ExpressionEvaluator`] trait is the seam for swapping the language; the
//! engine ships [`BuiltinEvaluator`], a small side-effect free language with
//! literals, variables, arithmetic, comparison, logic, indexing and a handful
//! of functions (`len`, `str`, `int`, `float`, `upper`, `lower`, `default`).
//!
//! ```rust
//! use cogwork_engine::expression::{BuiltinEvaluator, ExpressionEvaluator};
//! use cogwork_types::{Value, VariableStore};
//!
//! let evaluator = BuiltinEvaluator;
//! let compiled = evaluator.compile("count * 2 + 1").unwrap();
//!
//! let mut variables = VariableStore::new();
//! variables.set("count", 20);
//! assert_eq!(evaluator.evaluate(&compiled, &variables).unwrap(), Value::Integer(41));
//! ```

mod eval;
mod lexer;
mod parser;

use cogwork_types::{InterpolationError, Value, VariableStore};

use self::parser::Expr;

/// Compiles fragment source text and evaluates compiled forms.
///
/// Evaluation must not mutate the store; implementations are shared across
/// threads, so compiled forms must be `Send + Sync`.
pub trait ExpressionEvaluator: Send + Sync {
    /// Opaque compiled form of one fragment.
    type Compiled: Send + Sync + 'static;

    /// Compile `source`; failures are reported as [`InterpolationError::Compile`].
    fn compile(&self, source: &str) -> Result<Self::Compiled, InterpolationError>;

    /// Evaluate a compiled fragment; failures are reported as [`InterpolationError::Evaluation`].
    fn evaluate(&self, compiled: &Self::Compiled, variables: &VariableStore) -> Result<Value, InterpolationError>;
}

/// The default expression language.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEvaluator;

/// A parsed fragment produced by [`BuiltinEvaluator::compile`].
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
}

impl CompiledExpression {
    /// The fragment text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl ExpressionEvaluator for BuiltinEvaluator {
    type Compiled = CompiledExpression;

    fn compile(&self, source: &str) -> Result<CompiledExpression, InterpolationError> {
        let tokens = lexer::tokenize(source).map_err(|message| InterpolationError::compile(source, message))?;
        let root = parser::parse(tokens).map_err(|message| InterpolationError::compile(source, message))?;
        Ok(CompiledExpression {
            source: source.to_string(),
            root,
        })
    }

    fn evaluate(&self, compiled: &CompiledExpression, variables: &VariableStore) -> Result<Value, InterpolationError> {
        eval::evaluate(&compiled.root, variables).map_err(|message| InterpolationError::evaluation(&compiled.source, message))
    }
}
