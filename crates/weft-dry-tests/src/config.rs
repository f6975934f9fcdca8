// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use weft_config::{ConfigError, ConfigStore};

/// In-memory [`ConfigStore`] that counts calls and can simulate failures.
///
/// Clones share state, so a test can hand one clone to a
/// [`weft_config::ConfigService`] and inspect the other.
///
/// ```
/// use weft_config::{load_scheduler_config, ConfigService};
/// use weft_dry_tests::InMemoryConfigStore;
///
/// let store = InMemoryConfigStore::new();
/// let cfg = load_scheduler_config(&ConfigService::new(store.clone())).unwrap();
/// assert_eq!(cfg.max_retries, weft_core::DEFAULT_MAX_RETRIES);
/// assert_eq!(store.load_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Blobs>>,
}

#[derive(Default)]
struct Blobs {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `data`.
    pub fn with_data(data: HashMap<String, Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Blobs {
                data,
                ..Blobs::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Blobs> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seeds `key` without touching the save counter.
    pub fn insert(&self, key: &str, bytes: &[u8]) {
        self.lock().data.insert(key.to_owned(), bytes.to_vec());
    }

    /// Makes every following load fail with [`ConfigError::Unavailable`].
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Makes every following save fail with [`ConfigError::Unavailable`].
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Load attempts so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Save attempts so far, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.lock().data.keys().cloned().collect()
    }

    /// True when `key` is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    /// Clears data, counters and failure flags.
    pub fn reset(&self) {
        *self.lock() = Blobs::default();
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Unavailable("simulated load failure".into()));
        }
        inner
            .data
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound { key: key.to_owned() })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Unavailable("simulated save failure".into()));
        }
        inner.data.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
