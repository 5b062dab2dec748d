//! Per-document locks serializing read-modify-write transitions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use crate::error::ServerError;

#[derive(Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for exclusive access to `document_id`.
    pub async fn acquire(
        &self,
        document_id: &str,
        timeout: Duration,
    ) -> Result<OwnedMutexGuard<()>, ServerError> {
        let lock = {
            let mut map = self
                .inner
                .lock()
                .map_err(|e| ServerError::Internal(format!("Lock table poisoned: {}", e)))?;
            // Entries only the table references are idle.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(document_id.to_string()).or_default().clone()
        };

        tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                ServerError::Conflict(format!(
                    "Document {} is busy, retry the request",
                    document_id
                ))
            })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_times_out() {
        let locks = DocumentLocks::new();
        let guard = locks.acquire("d1", Duration::from_millis(50)).await.unwrap();

        let err = locks.acquire("d1", Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));

        // Other documents are independent.
        locks.acquire("d2", Duration::from_millis(20)).await.unwrap();

        drop(guard);
        locks.acquire("d1", Duration::from_millis(20)).await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = DocumentLocks::new();
        for i in 0..10 {
            let _g = locks.acquire(&format!("d{}", i), Duration::from_millis(20)).await.unwrap();
        }
        let _g = locks.acquire("last", Duration::from_millis(20)).await.unwrap();
        assert_eq!(locks.len(), 1);
    }
}
