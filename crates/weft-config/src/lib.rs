// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistence for scheduler tunables.
//!
//! A [`ConfigStore`] keeps raw JSON documents by key and [`ConfigService`]
//! turns them into typed values and back. [`load_scheduler_config`] reads the
//! [`SchedulerConfig`](weft_core::SchedulerConfig) stored under
//! [`SCHEDULER_CONFIG_KEY`] and falls back to defaults on a fresh install.
#![forbid(unsafe_code)]

mod fs;
mod scheduler;

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use fs::FsConfigStore;
pub use scheduler::{load_scheduler_config, save_scheduler_config, SCHEDULER_CONFIG_KEY};

/// Where config documents live.
pub trait ConfigStore {
    /// Raw document under `key`; [`ConfigError::NotFound`] when there is none.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces the document under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Reasons a config document could not be read, decoded or accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing is stored under the key.
    #[error("no config stored under {key:?}")]
    NotFound {
        /// Requested key.
        key: String,
    },
    /// The key cannot name a document in this store.
    #[error("unusable config key {key:?}")]
    BadKey {
        /// Rejected key.
        key: String,
    },
    /// Reading or writing a config file failed.
    #[error("config file {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// The document is not JSON of the expected shape.
    #[error("config {key:?} is not valid JSON for its type: {source}")]
    Json {
        /// Key of the document.
        key: String,
        /// Underlying decode or encode failure.
        source: serde_json::Error,
    },
    /// The document decoded but holds values a scheduler cannot run with.
    #[error("config {key:?} rejected: {reason}")]
    Invalid {
        /// Key of the document.
        key: String,
        /// Which value was refused.
        reason: &'static str,
    },
    /// The store cannot be reached at all.
    #[error("config store unavailable: {0}")]
    Unavailable(String),
}

/// Typed JSON access to the documents of a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Service reading and writing through `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Decodes the document under `key`.
    ///
    /// A missing or empty document is `Ok(None)`: a fresh install has nothing
    /// stored yet.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ConfigError::Json { key: key.to_owned(), source })
    }

    /// Encodes `value` as pretty JSON and stores it under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)
            .map_err(|source| ConfigError::Json { key: key.to_owned(), source })?;
        self.store.save_raw(key, &data)
    }
}
