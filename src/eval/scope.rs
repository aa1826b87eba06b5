//! Name resolution for the evaluator
//!
//! A [`Scope`] answers the questions an expression can ask about its
//! surroundings: which macros exist (for `defined`), what a field label holds,
//! how many elements an array has and which resource is being built.

use super::value::Value;
use crate::parser::ast::{ResType, ResourceAttributes};
use rustc_hash::{FxHashMap, FxHashSet};

/// Header of the resource whose body is being evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContext {
    pub type_code: ResType,
    pub id: i64,
    pub name: Option<Vec<u8>>,
    pub attributes: ResourceAttributes,
    /// Bytes of the resource; only known once it has been laid out
    pub data: Option<Vec<u8>>,
}

pub trait Scope {
    fn is_macro_defined(&self, _name: &str) -> bool {
        false
    }

    /// Value of a field label; `indices` selects the element inside nested arrays.
    fn label_value(&self, _name: &str, _indices: &[i64]) -> Option<Value> {
        None
    }

    fn array_count(&self, _name: &str) -> Option<i64> {
        None
    }

    /// 1-based position of the current iteration of an enclosing array
    fn array_index(&self, _name: &str) -> Option<i64> {
        None
    }

    fn resource(&self) -> Option<&ResourceContext> {
        None
    }
}

/// Knows nothing: plain constant expressions only
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {}

/// General-purpose scope backed by hash maps
#[derive(Debug, Clone, Default)]
pub struct EvalScope {
    macros: FxHashSet<String>,
    labels: FxHashMap<(String, Vec<i64>), Value>,
    array_counts: FxHashMap<String, i64>,
    array_indices: FxHashMap<String, i64>,
    resource: Option<ResourceContext>,
}

impl EvalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_macro(&mut self, name: impl Into<String>) {
        self.macros.insert(name.into());
    }

    pub fn set_label(&mut self, name: impl Into<String>, value: Value) {
        self.labels.insert((name.into(), Vec::new()), value);
    }

    pub fn set_label_at(&mut self, name: impl Into<String>, indices: Vec<i64>, value: Value) {
        self.labels.insert((name.into(), indices), value);
    }

    pub fn set_array_count(&mut self, name: impl Into<String>, count: i64) {
        self.array_counts.insert(name.into(), count);
    }

    pub fn set_array_index(&mut self, name: impl Into<String>, index: i64) {
        self.array_indices.insert(name.into(), index);
    }

    pub fn set_resource(&mut self, resource: ResourceContext) {
        self.resource = Some(resource);
    }
}

impl Scope for EvalScope {
    fn is_macro_defined(&self, name: &str) -> bool {
        self.macros.contains(name)
    }

    fn label_value(&self, name: &str, indices: &[i64]) -> Option<Value> {
        self.labels.get(&(name.to_string(), indices.to_vec())).cloned()
    }

    fn array_count(&self, name: &str) -> Option<i64> {
        self.array_counts.get(name).copied()
    }

    fn array_index(&self, name: &str) -> Option<i64> {
        self.array_indices.get(name).copied()
    }

    fn resource(&self) -> Option<&ResourceContext> {
        self.resource.as_ref()
    }
}
