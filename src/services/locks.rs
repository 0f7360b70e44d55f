use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Async mutexes keyed by string; distinct keys never contend.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    entries: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) async fn lock(&self, key: impl Into<String>) -> OwnedMutexGuard<()> {
        let mutex = self.entry(key.into());
        mutex.lock_owned().await
    }

    fn entry(&self, key: String) -> Arc<Mutex<()>> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        if entries.len() > PRUNE_THRESHOLD {
            entries.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        }

        entries
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

pub(crate) fn attempt_key(attempt_id: &str) -> String {
    format!("attempt:{attempt_id}")
}

pub(crate) fn exam_key(exam_id: &str) -> String {
    format!("exam:{exam_id}")
}

pub(crate) fn start_key(exam_id: &str, student_id: &str) -> String {
    format!("start:{exam_id}:{student_id}")
}

pub(crate) fn publication_key(exam_id: &str) -> String {
    format!("publication:{exam_id}")
}
