use std::sync::{Arc, Mutex, PoisonError};

/// Load-once slot for an expensive shared resource such as network weights.
///
/// The first successful `get_or_load` stores the value; later calls return
/// the same `Arc` without running the loader. Concurrent callers block on the
/// slot until the in-progress load finishes. A failed load leaves the slot
/// empty so the next call retries.
pub struct ModelStore<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> ModelStore<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn get_or_load<E>(&self, load: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref loaded) = *guard {
            return Ok(loaded.clone());
        }
        let loaded = Arc::new(load()?);
        *guard = Some(loaded.clone());
        Ok(loaded)
    }

    /// The loaded value, without triggering a load.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

impl<T> Default for ModelStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
