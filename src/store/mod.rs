//! Slot Store Module - durable key/value persistence for the workflow
//!
//! The signing workflow persists exactly two values: the exported
//! private-key record and the hex-encoded signature. This module
//! abstracts that two-slot store behind a trait so the durable backend
//! can be swapped for an in-memory one in tests.

mod local;
mod memory;

pub use local::LocalSlotStore;
pub use memory::MemorySlotStore;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

/// Named slots used by the signing workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// JSON-serialized private-key record
    Key,
    /// Lowercase hex signature
    Signature,
}

impl Slot {
    /// Stable storage name for the slot
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Key => "key",
            Slot::Signature => "signature",
        }
    }

    pub(crate) fn all() -> [Slot; 2] {
        [Slot::Key, Slot::Signature]
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for slot storage backends
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Read a slot, `None` if absent
    async fn get(&self, slot: Slot) -> Result<Option<String>, StoreError>;

    /// Write a slot, replacing any previous value
    async fn set(&self, slot: Slot, value: &str) -> Result<(), StoreError>;

    /// Remove both slots as a single logical operation
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Slot store configuration
#[derive(Clone, Debug)]
pub enum StoreConfig {
    Memory,
    Local { path: PathBuf },
}

/// Factory function to create a slot store based on configuration
pub fn create_slot_store(config: StoreConfig) -> Result<Arc<dyn SlotStore>, StoreError> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemorySlotStore::new())),
        StoreConfig::Local { path } => Ok(Arc::new(LocalSlotStore::open(path)?)),
    }
}
