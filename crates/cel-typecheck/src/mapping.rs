//! Substitution mapping from type parameters to their bound types.

use std::collections::HashMap;
use std::sync::Arc;

use cel_typecheck_common::CelType;

/// A copy-on-write table binding type parameters to types.
///
/// `copy` is constant time: the table is shared until the first `add` on
/// either side, so a trial unification can work on a copy and be discarded
/// without touching the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    bindings: Arc<HashMap<CelType, CelType>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `from` to `to`, replacing any previous binding.
    pub fn add(&mut self, from: CelType, to: CelType) {
        Arc::make_mut(&mut self.bindings).insert(from, to);
    }

    /// The type `from` is bound to, or None when unbound.
    pub fn find(&self, from: &CelType) -> Option<&CelType> {
        self.bindings.get(from)
    }

    pub fn copy(&self) -> Mapping {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
