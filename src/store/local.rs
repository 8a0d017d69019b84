use std::path::Path;

use async_trait::async_trait;

use super::{Slot, SlotStore, StoreError};

/// Durable slot store backed by an embedded sled database
///
/// Survives process restarts; the workflow decides at startup whether
/// previously persisted values are kept or discarded.
pub struct LocalSlotStore {
    db: sled::Db,
}

impl LocalSlotStore {
    /// Open (or create) the slot database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

#[async_trait]
impl SlotStore for LocalSlotStore {
    async fn get(&self, slot: Slot) -> Result<Option<String>, StoreError> {
        match self.db.get(slot.as_str())? {
            Some(raw) => {
                let value = String::from_utf8(raw.to_vec())
                    .map_err(|e| StoreError::Corrupt(format!("slot {}: {}", slot, e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, slot: Slot, value: &str) -> Result<(), StoreError> {
        self.db.insert(slot.as_str(), value.as_bytes())?;
        self.db.flush_async().await?;
        tracing::debug!("Wrote slot {}", slot);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        // Both slots go in one batch so a partial clear is never observable
        let mut batch = sled::Batch::default();
        for slot in Slot::all() {
            batch.remove(slot.as_str());
        }
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;
        tracing::debug!("Cleared all slots");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalSlotStore::open(dir.path().join("slots")).unwrap();

        assert!(store.get(Slot::Key).await.unwrap().is_none());

        store.set(Slot::Key, r#"{"kty":"EC"}"#).await.unwrap();
        assert_eq!(
            store.get(Slot::Key).await.unwrap().unwrap(),
            r#"{"kty":"EC"}"#
        );
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slots");

        {
            let store = LocalSlotStore::open(&path).unwrap();
            store.set(Slot::Signature, "deadbeef").await.unwrap();
        }

        let store = LocalSlotStore::open(&path).unwrap();
        assert_eq!(
            store.get(Slot::Signature).await.unwrap().unwrap(),
            "deadbeef"
        );
    }

    #[tokio::test]
    async fn test_clear_removes_both_slots() {
        let dir = TempDir::new().unwrap();
        let store = LocalSlotStore::open(dir.path().join("slots")).unwrap();

        store.set(Slot::Key, "record").await.unwrap();
        store.set(Slot::Signature, "cafe").await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get(Slot::Key).await.unwrap().is_none());
        assert!(store.get(Slot::Signature).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = LocalSlotStore::open(dir.path().join("slots")).unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get(Slot::Key).await.unwrap().is_none());
    }
}
