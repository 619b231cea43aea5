//! # String interpolation
//!
//! Action parameters may embed expressions between `{` and `}`. The
//! [`Interpolator`] scans a raw string, compiles each fragment through its
//! [`ExpressionEvaluator`] (once per distinct source text per run), evaluates
//! the compiled form against the current [`VariableStore`] and splices the
//! textual result back in.
//!
//! ```rust
//! use cogwork_engine::Interpolator;
//! use cogwork_types::VariableStore;
//!
//! let interpolator = Interpolator::new();
//! let mut variables = VariableStore::new();
//! variables.set("name", "world");
//!
//! assert_eq!(interpolator.resolve("hello {name}", &variables).unwrap(), "hello world");
//! assert_eq!(interpolator.resolve("{{literal}}", &variables).unwrap(), "{literal}");
//! ```

mod fragments;

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use cogwork_types::{InterpolationError, Value, VariableStore};
use tracing::debug;

use crate::expression::{BuiltinEvaluator, ExpressionEvaluator};

use self::fragments::Segment;

type CompiledHandle = Arc<dyn Any + Send + Sync>;

/// Object-safe view of an [`ExpressionEvaluator`] with its compiled type erased.
trait ErasedEvaluator: Send + Sync {
    fn compile_erased(&self, source: &str) -> Result<CompiledHandle, InterpolationError>;
    fn evaluate_erased(&self, compiled: &CompiledHandle, source: &str, variables: &VariableStore) -> Result<Value, InterpolationError>;
}

impl<E: ExpressionEvaluator> ErasedEvaluator for E {
    fn compile_erased(&self, source: &str) -> Result<CompiledHandle, InterpolationError> {
        let compiled = self.compile(source)?;
        Ok(Arc::new(compiled))
    }

    fn evaluate_erased(&self, compiled: &CompiledHandle, source: &str, variables: &VariableStore) -> Result<Value, InterpolationError> {
        let compiled = compiled
            .downcast_ref::<E::Compiled>()
            .ok_or_else(|| InterpolationError::evaluation(source, "compiled form does not belong to this evaluator"))?;
        self.evaluate(compiled, variables)
    }
}

/// Resolves `{ ... }` fragments in parameter strings with a per-run compile cache.
///
/// The cache maps a fragment's exact source text to its compiled form and never
/// expires on its own; call [`Interpolator::clear`] between runs if the
/// interpolator is reused. Failed compilations are not cached.
pub struct Interpolator {
    evaluator: Box<dyn ErasedEvaluator>,
    cache: Mutex<HashMap<String, CompiledHandle>>,
    compile_calls: AtomicUsize,
}

impl Interpolator {
    /// Create an interpolator backed by [`BuiltinEvaluator`].
    pub fn new() -> Self {
        Self::with_evaluator(BuiltinEvaluator)
    }

    /// Create an interpolator backed by a custom expression language.
    pub fn with_evaluator<E: ExpressionEvaluator + 'static>(evaluator: E) -> Self {
        Self {
            evaluator: Box::new(evaluator),
            cache: Mutex::new(HashMap::new()),
            compile_calls: AtomicUsize::new(0),
        }
    }

    /// Resolve every fragment in `raw` and return the spliced text.
    ///
    /// Strings without any brace are returned unchanged without touching the
    /// compiler. The first failing fragment aborts resolution.
    pub fn resolve(&self, raw: &str, variables: &VariableStore) -> Result<String, InterpolationError> {
        if !contains_delimiter(raw) {
            return Ok(raw.to_string());
        }

        let mut output = String::with_capacity(raw.len());
        for segment in fragments::scan(raw)? {
            match segment {
                Segment::Literal(text) => output.push_str(&text),
                Segment::Fragment(source) => output.push_str(&self.evaluate_fragment(source, variables)?.to_text()),
            }
        }
        Ok(output)
    }

    /// Like [`Interpolator::resolve`], but a string consisting of exactly one
    /// fragment yields the fragment's typed value instead of its text.
    pub fn resolve_value(&self, raw: &str, variables: &VariableStore) -> Result<Value, InterpolationError> {
        if !contains_delimiter(raw) {
            return Ok(Value::String(raw.to_string()));
        }

        let segments = fragments::scan(raw)?;
        if let [Segment::Fragment(source)] = segments.as_slice() {
            return self.evaluate_fragment(source, variables);
        }

        let mut output = String::with_capacity(raw.len());
        for segment in segments {
            match segment {
                Segment::Literal(text) => output.push_str(&text),
                Segment::Fragment(source) => output.push_str(&self.evaluate_fragment(source, variables)?.to_text()),
            }
        }
        Ok(Value::String(output))
    }

    /// Number of times the compiler has been invoked, including failed attempts.
    pub fn compiled_count(&self) -> usize {
        self.compile_calls.load(Ordering::Relaxed)
    }

    /// Number of compiled fragments currently cached.
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drop every cached compiled form.
    pub fn clear(&self) {
        self.lock_cache().clear();
    }

    fn evaluate_fragment(&self, source: &str, variables: &VariableStore) -> Result<Value, InterpolationError> {
        let compiled = self.compiled(source)?;
        self.evaluator.evaluate_erased(&compiled, source, variables)
    }

    fn compiled(&self, source: &str) -> Result<CompiledHandle, InterpolationError> {
        let mut cache = self.lock_cache();
        if let Some(compiled) = cache.get(source) {
            return Ok(Arc::clone(compiled));
        }

        debug!(fragment = source, "compiling interpolation fragment");
        self.compile_calls.fetch_add(1, Ordering::Relaxed);
        let compiled = self.evaluator.compile_erased(source)?;
        cache.insert(source.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, CompiledHandle>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolator")
            .field("cached", &self.cache_len())
            .field("compile_calls", &self.compiled_count())
            .finish()
    }
}

fn contains_delimiter(raw: &str) -> bool {
    raw.contains(['{', '}'])
}
