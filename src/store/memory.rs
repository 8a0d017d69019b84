use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Slot, SlotStore, StoreError};

/// In-memory slot store implementation
///
/// Holds values for the lifetime of the process only. Used as the
/// injectable test double and for ephemeral sessions.
pub struct MemorySlotStore {
    slots: RwLock<HashMap<Slot, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySlotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn get(&self, slot: Slot) -> Result<Option<String>, StoreError> {
        Ok(self.slots.read().get(&slot).cloned())
    }

    async fn set(&self, slot: Slot, value: &str) -> Result<(), StoreError> {
        self.slots.write().insert(slot, value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.slots.write().clear();
        Ok(())
    }
}
