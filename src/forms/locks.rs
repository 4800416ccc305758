use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-form write locks.
///
/// Every mutation of a stored form runs while holding the form's guard, so
/// two appends to the same form never interleave their read-modify-write.
/// Different forms never contend. Idle entries are pruned on acquire.
#[derive(Debug, Default)]
pub struct FormLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FormLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `form_id`.
    pub async fn acquire(&self, form_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // Only the table holds an idle entry.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table.entry(form_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of forms with a held or awaited lock
    pub fn len(&self) -> usize {
        let table = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        table
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }

    /// Whether no form lock is held or awaited
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
