//! Owner of every [`Binding`], keyed by document.

use crate::{
    binding::Binding,
    error::{Error, Result},
    host::DocId,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub struct Registry {
    bindings: Mutex<FxHashMap<DocId, Arc<Binding>>>,
    limit: Mutex<usize>,
}

impl Registry {
    /// Create a registry that refuses new bindings once `limit` are open.
    pub fn new(limit: usize) -> Self {
        Self {
            bindings: Mutex::new(FxHashMap::default()),
            limit: Mutex::new(limit),
        }
    }

    pub fn get(&self, doc: DocId) -> Option<Arc<Binding>> {
        self.bindings.lock().get(&doc).cloned()
    }

    /// Return the binding for `doc`, creating it with `create` on first reference.
    ///
    /// The registry lock is held while `create` runs, so two racing callers never both
    /// build a binding for the same document.
    pub fn get_or_create(
        &self,
        doc: DocId,
        create: impl FnOnce() -> Result<Binding>,
    ) -> Result<Arc<Binding>> {
        let mut bindings = self.bindings.lock();
        if let Some(binding) = bindings.get(&doc) {
            return Ok(binding.clone());
        }

        let limit = *self.limit.lock();
        if bindings.len() >= limit {
            return Err(Error::RegistryFull { doc, limit });
        }

        let binding = Arc::new(create()?);
        bindings.insert(doc, binding.clone());
        tracing::debug!(%doc, open = bindings.len(), "bound document");
        Ok(binding)
    }

    pub fn remove(&self, doc: DocId) -> Option<Arc<Binding>> {
        self.bindings.lock().remove(&doc)
    }

    /// Every open binding, in no particular order.
    pub fn all(&self) -> Vec<Arc<Binding>> {
        self.bindings.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    /// Applies to future bindings only; open ones are kept.
    pub fn set_limit(&self, limit: usize) {
        *self.limit.lock() = limit;
    }
}
