//! In-process value source used by the simulation and tests.

use super::ValueSource;
use crate::error::{PanelError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Cells {
    values: HashMap<String, String>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
}

/// Thread-safe map of value cells with failure injection.
///
/// A key marked failing returns an error; a key marked hanging never
/// completes. A key with no value is reported as unavailable.
#[derive(Default)]
pub struct MemoryValueSource {
    cells: RwLock<Cells>,
    reads: AtomicU64,
}

impl MemoryValueSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let source = Self::new();
        for (key, value) in values {
            source.set(key, value);
        }
        source
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.cells.write().values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.cells.read().values.get(key).cloned()
    }

    pub fn set_failing(&self, key: &str, failing: bool) {
        let mut cells = self.cells.write();
        if failing {
            cells.failing.insert(key.to_string());
        } else {
            cells.failing.remove(key);
        }
    }

    pub fn set_hanging(&self, key: &str, hanging: bool) {
        let mut cells = self.cells.write();
        if hanging {
            cells.hanging.insert(key.to_string());
        } else {
            cells.hanging.remove(key);
        }
    }

    /// Number of reads attempted so far, across all keys.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValueSource for MemoryValueSource {
    async fn read(&self, key: &str) -> Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let outcome = {
            let cells = self.cells.read();
            if cells.hanging.contains(key) {
                None
            } else if cells.failing.contains(key) {
                Some(Err(PanelError::SourceUnavailable(key.to_string())))
            } else {
                Some(
                    cells
                        .values
                        .get(key)
                        .cloned()
                        .ok_or_else(|| PanelError::SourceUnavailable(key.to_string())),
                )
            }
        };

        match outcome {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_pending;

    #[test]
    fn test_read_returns_value_verbatim() {
        let source = MemoryValueSource::with_values([("temp.txt", "70\n")]);
        let value = tokio_test::block_on(source.read("temp.txt")).unwrap();
        assert_eq!(value, "70\n");
        assert_eq!(source.read_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_failing_keys_error() {
        let source = MemoryValueSource::with_values([("fan.txt", "Auto")]);
        assert!(source.read("mode.txt").await.is_err());

        source.set_failing("fan.txt", true);
        assert!(source.read("fan.txt").await.is_err());

        source.set_failing("fan.txt", false);
        assert_eq!(source.read("fan.txt").await.unwrap(), "Auto");
    }

    #[test]
    fn test_hanging_key_never_completes() {
        let source = MemoryValueSource::with_values([("mode.txt", "Cool")]);
        source.set_hanging("mode.txt", true);
        let mut read = tokio_test::task::spawn(source.read("mode.txt"));
        assert_pending!(read.poll());

        // The hang is decided when the read starts
        source.set_hanging("mode.txt", false);
        assert_pending!(read.poll());
    }
}
