//! The embedded condition language used by conditional invocations.
//!
//! A condition compares earlier results, referenced as
//! `{Invocation Name}.output(.field)*`, with literals and combines the
//! comparisons with `and`, `or` and `not`. Conditions are parsed once into an
//! [`Expression`] and cached by content.

mod ast;
mod evaluator;
mod parser;

pub use ast::{Expression, PathRef};
pub use evaluator::evaluate;
pub use parser::parse;

use crate::error::ConditionError;
use crate::model::Value;
use ahash::{AHashMap, RandomState};
use itertools::Itertools;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A parsed condition together with the references it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    source: String,
    expression: Expression,
    references: Vec<PathRef>,
}

impl CompiledCondition {
    pub fn compile(source: &str) -> Result<Self, ConditionError> {
        let expression = parse(source)?;
        let mut refs = Vec::new();
        expression.collect_references(&mut refs);
        let references = refs.into_iter().cloned().unique().collect();
        Ok(Self {
            source: source.to_string(),
            expression,
            references,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn references(&self) -> &[PathRef] {
        &self.references
    }

    /// Names of the invocations whose results must exist before evaluating.
    pub fn required_invocations(&self) -> Vec<&str> {
        self.references
            .iter()
            .map(|r| r.invocation.as_str())
            .unique()
            .collect()
    }

    pub fn evaluate<F>(&self, lookup: &F) -> Result<bool, ConditionError>
    where
        F: Fn(&PathRef) -> Option<Value>,
    {
        evaluate(&self.expression, lookup)
    }
}

/// Compiled conditions keyed by invocation and content hash.
///
/// Compiling the same text for the same key returns the cached tree;
/// a changed text replaces the previous entry for that key.
#[derive(Debug, Default)]
pub struct ConditionCache {
    hasher: RandomState,
    entries: Mutex<AHashMap<String, (u64, Arc<CompiledCondition>)>>,
    compilations: AtomicUsize,
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(
        &self,
        key: &str,
        source: &str,
    ) -> Result<Arc<CompiledCondition>, ConditionError> {
        let hash = self.hasher.hash_one(source);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached_hash, condition)) = entries.get(key) {
            if *cached_hash == hash && condition.source() == source {
                return Ok(Arc::clone(condition));
            }
        }

        let condition = Arc::new(CompiledCondition::compile(source)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        entries.insert(key.to_string(), (hash, Arc::clone(&condition)));
        Ok(condition)
    }

    pub fn get(&self, key: &str) -> Option<Arc<CompiledCondition>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).map(|(_, condition)| Arc::clone(condition))
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times a condition was actually parsed.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }
}

/// Cache key of a conditional invocation.
pub fn condition_key(process_id: &str, invocation_id: Option<&str>, invocation_name: &str) -> String {
    match invocation_id {
        Some(id) => format!("{}/{}", process_id, id),
        None => format!("{}/{}", process_id, invocation_name),
    }
}
