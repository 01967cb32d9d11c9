use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{CoreError, Record};

pub type AdapterResult<T> = Result<T, CoreError>;

/// A pollable data source.
///
/// `fetch` returns only records the adapter has not produced before; an empty
/// vector means "nothing new" and is distinct from an error. The scheduler
/// never inspects the error beyond its presence. Calls for one adapter are
/// sequential, so implementations need not support concurrent `fetch`.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self) -> AdapterResult<Vec<Record>>;
}

/// Maps a configured source name to a new adapter instance.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn SourceAdapter>>;
}

/// Identity memory owned by one adapter.
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: Mutex<HashSet<String>>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Returns true when the id was not seen before.
    pub fn insert(&self, id: impl Into<String>) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
