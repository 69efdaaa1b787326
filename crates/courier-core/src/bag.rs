//! Per-dispatch shared key/value store.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::Api;

type Slot = Arc<dyn Any + Send + Sync>;

/// Mutable key/value store shared by every task of one dispatch.
///
/// Cloning the bag clones the handle, not the contents. Writers are not
/// coordinated: when two tasks write the same key, the last write wins.
#[derive(Clone)]
pub struct ContextBag {
    inner: Arc<BagInner>,
}

struct BagInner {
    values: Mutex<HashMap<String, Slot>>,
    api: Api,
}

impl ContextBag {
    /// Creates an empty bag bound to `api`.
    pub fn new(api: Api) -> Self {
        Self {
            inner: Arc::new(BagInner {
                values: Mutex::new(HashMap::new()),
                api,
            }),
        }
    }

    /// Stores `value` under `key`, returning `true` if a previous value was replaced.
    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) -> bool {
        self.inner
            .values
            .lock()
            .insert(key.into(), Arc::new(value))
            .is_some()
    }

    /// Cloned value under `key`, if present and of type `T`.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        self.get_arc::<T>(key).map(|value| T::clone(&value))
    }

    /// Shared value under `key`, if present and of type `T`.
    pub fn get_arc<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let slot = self.inner.values.lock().get(key).cloned()?;
        slot.downcast::<T>().ok()
    }

    /// Removes the value under `key`; returns `true` if one was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.values.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.values.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values.lock().is_empty()
    }

    /// Snapshot of the current keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.values.lock().keys().cloned().collect()
    }

    /// Drops every stored value.
    pub fn clear(&self) {
        self.inner.values.lock().clear();
    }

    /// The API handle this bag is bound to.
    pub fn api(&self) -> &Api {
        &self.inner.api
    }
}

impl fmt::Debug for ContextBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBag")
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}
