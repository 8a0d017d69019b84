//! Key Management Module - ECDSA P-384 keypair lifecycle
//!
//! Generates the signing keypair, exports the private key to its
//! persistable JWK-shaped record, and imports stored records back into
//! sign-only operational handles.

mod record;

pub use record::KeyRecord;

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p384::ecdsa::SigningKey;
use p384::SecretKey;
use thiserror::Error;

use crate::store::{Slot, SlotStore, StoreError};

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key generation failed: {0}")]
    Generation(String),

    #[error("Key export failed: {0}")]
    Export(String),

    #[error("Key import failed: {0}")]
    Import(String),

    #[error("Key storage error: {0}")]
    Store(#[from] StoreError),
}

/// Operational signing handle imported from a stored record
///
/// Bound to the "sign" usage only and consumed by a single signing
/// operation; it carries no persistable form.
pub struct OperationalKey {
    inner: SigningKey,
}

impl OperationalKey {
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

/// Owns keypair generation and export/import against the slot store
pub struct KeyManager {
    store: Arc<dyn SlotStore>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Generate a P-384 signing keypair and persist its private record.
    ///
    /// A no-op when a record already exists: the stored record is
    /// returned unchanged and no new key material is created. Nothing is
    /// persisted if generation or export fails.
    pub async fn generate(&self) -> Result<KeyRecord, KeyError> {
        if let Some(existing) = self.stored().await? {
            tracing::debug!("Key record already present, skipping generation");
            return Ok(existing);
        }

        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        let record = KeyRecord::from_secret_key(&secret)?;
        self.store.set(Slot::Key, &record.to_json()?).await?;
        tracing::info!("Generated and persisted new P-384 key record");
        Ok(record)
    }

    /// Read the persisted key record, if any
    pub async fn stored(&self) -> Result<Option<KeyRecord>, KeyError> {
        match self.store.get(Slot::Key).await? {
            Some(json) => Ok(Some(KeyRecord::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Import a stored record into a sign-only operational key.
    ///
    /// Rejects records with a foreign key type or curve, records not
    /// authorized for signing, and records whose public coordinates do
    /// not match the private scalar.
    pub async fn import(&self, record: &KeyRecord) -> Result<OperationalKey, KeyError> {
        if record.kty != record::KEY_TYPE {
            return Err(KeyError::Import(format!(
                "unsupported key type {:?}",
                record.kty
            )));
        }
        if record.crv != record::CURVE {
            return Err(KeyError::Import(format!(
                "unsupported curve {:?}",
                record.crv
            )));
        }
        if !record.allows(record::USAGE_SIGN) {
            return Err(KeyError::Import(
                "record is not authorized for signing".to_string(),
            ));
        }

        let scalar = URL_SAFE_NO_PAD
            .decode(&record.d)
            .map_err(|e| KeyError::Import(format!("invalid private scalar encoding: {}", e)))?;
        let secret = SecretKey::from_slice(&scalar)
            .map_err(|e| KeyError::Import(format!("invalid private scalar: {}", e)))?;

        // The public coordinates must belong to the private scalar
        let derived =
            KeyRecord::from_secret_key(&secret).map_err(|e| KeyError::Import(e.to_string()))?;
        if derived.x != record.x || derived.y != record.y {
            return Err(KeyError::Import(
                "public coordinates do not match the private scalar".to_string(),
            ));
        }

        Ok(OperationalKey {
            inner: SigningKey::from(secret),
        })
    }
}
