//! Workflow Module - the key-lifecycle and signing state machine
//!
//! Orchestrates key generation, fresh-import signing, and reset against
//! the slot store, and exposes the current status to the embedding UI
//! layer.
//!
//! Transitions:
//! - `NoKey` --generate_key--> `KeyReady`
//! - `KeyReady` --start_signing--> `Signing` --> `Signed` on success,
//!   back to `KeyReady` on failure
//! - any --reset--> `NoKey`

use std::sync::Arc;

use thiserror::Error;

use crate::keys::{KeyManager, KeyRecord};
use crate::signing::{Payload, SignatureRecord, Signer};
use crate::store::{LocalSlotStore, Slot, SlotStore};
use crate::{CredSignConfig, CredSignError};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("No signing key has been generated yet")]
    KeyMissing,

    #[error("A signing operation is already in progress")]
    SigningInProgress,

    #[error("The credential has already been signed")]
    AlreadySigned,
}

/// Current position in the signing workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    /// No key record exists yet
    NoKey,
    /// A key record is stored and ready to sign with
    KeyReady,
    /// A signing operation is in flight
    Signing,
    /// A signature has been produced and persisted
    Signed,
}

/// Orchestrates the key-lifecycle and signing workflow
///
/// Owns the injected slot store and the current status. All transitions
/// go through the trigger methods, so the status is an explicit tag and
/// never derived from which values happen to be present.
pub struct WorkflowController {
    store: Arc<dyn SlotStore>,
    keys: KeyManager,
    signer: Signer,
    payload: Payload,
    status: WorkflowStatus,
}

impl WorkflowController {
    /// Create a controller over an injected store.
    ///
    /// Starts a fresh session: any key or signature persisted by a prior
    /// run is discarded and the workflow begins at `NoKey`.
    pub async fn new(
        store: Arc<dyn SlotStore>,
        payload: Payload,
    ) -> Result<Self, CredSignError> {
        store.clear().await?;
        Ok(Self {
            keys: KeyManager::new(Arc::clone(&store)),
            signer: Signer::new(Arc::clone(&store)),
            store,
            payload,
            status: WorkflowStatus::NoKey,
        })
    }

    /// Create a controller with a durable store at the configured path
    pub async fn with_config(
        config: &CredSignConfig,
        payload: Payload,
    ) -> Result<Self, CredSignError> {
        let store = LocalSlotStore::open(&config.data_path)?;
        Self::new(Arc::new(store), payload).await
    }

    /// Current workflow status
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// The payload this workflow signs
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Generate the signing keypair and move to `KeyReady`.
    ///
    /// A no-op once a key exists: the stored record is returned and the
    /// status is left alone.
    pub async fn generate_key(&mut self) -> Result<KeyRecord, CredSignError> {
        if self.status == WorkflowStatus::Signing {
            return Err(WorkflowError::SigningInProgress.into());
        }

        let record = self.keys.generate().await?;
        if self.status == WorkflowStatus::NoKey {
            self.status = WorkflowStatus::KeyReady;
            tracing::info!("Key generated, workflow is ready to sign");
        }
        Ok(record)
    }

    /// Import the stored key and sign the payload.
    ///
    /// Only legal from `KeyReady`. On success the signature is persisted
    /// and the workflow moves to `Signed`; on failure it returns to
    /// `KeyReady` with no signature persisted.
    pub async fn start_signing(&mut self) -> Result<SignatureRecord, CredSignError> {
        match self.status {
            WorkflowStatus::KeyReady => {}
            WorkflowStatus::NoKey => return Err(WorkflowError::KeyMissing.into()),
            WorkflowStatus::Signing => return Err(WorkflowError::SigningInProgress.into()),
            WorkflowStatus::Signed => return Err(WorkflowError::AlreadySigned.into()),
        }

        self.status = WorkflowStatus::Signing;
        match self.sign_payload().await {
            Ok(signature) => {
                self.status = WorkflowStatus::Signed;
                tracing::info!("Credential signed and signature persisted");
                Ok(signature)
            }
            Err(e) => {
                // The in-flight state must never stick after a failure
                self.status = WorkflowStatus::KeyReady;
                tracing::warn!("Signing failed, returning to KeyReady: {}", e);
                Err(e)
            }
        }
    }

    /// A fresh import precedes every signing attempt; the operational
    /// key is never cached across payloads.
    async fn sign_payload(&self) -> Result<SignatureRecord, CredSignError> {
        let record = self
            .keys
            .stored()
            .await?
            .ok_or(WorkflowError::KeyMissing)?;
        let key = self.keys.import(&record).await?;
        Ok(self.signer.sign(key, &self.payload).await?)
    }

    /// Clear both slots and return to `NoKey`. Idempotent.
    pub async fn reset(&mut self) -> Result<(), CredSignError> {
        self.store.clear().await?;
        self.status = WorkflowStatus::NoKey;
        tracing::info!("Workflow reset");
        Ok(())
    }

    /// The stored record's private scalar, for display by the UI layer
    pub async fn private_scalar(&self) -> Result<Option<String>, CredSignError> {
        Ok(self
            .keys
            .stored()
            .await?
            .map(|record| record.private_scalar().to_string()))
    }

    /// The persisted signature in hex form, if any
    pub async fn signature_hex(&self) -> Result<Option<String>, CredSignError> {
        Ok(self.store.get(Slot::Signature).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::verify_signature;
    use crate::store::{MemorySlotStore, StoreError};
    use async_trait::async_trait;

    fn sample_payload() -> Payload {
        let credential = serde_json::json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "credentialSubject": { "id": "did:example:subject" },
            "issuer": "did:example:issuer",
            "issuanceDate": "2023-01-04",
        });
        Payload::new(credential.to_string().into_bytes())
    }

    async fn controller() -> WorkflowController {
        WorkflowController::new(Arc::new(MemorySlotStore::new()), sample_payload())
            .await
            .unwrap()
    }

    /// Store that accepts key writes but fails signature writes
    #[derive(Default)]
    struct FlakySignatureStore {
        inner: MemorySlotStore,
    }

    #[async_trait]
    impl SlotStore for FlakySignatureStore {
        async fn get(&self, slot: Slot) -> Result<Option<String>, StoreError> {
            self.inner.get(slot).await
        }

        async fn set(&self, slot: Slot, value: &str) -> Result<(), StoreError> {
            if slot == Slot::Signature {
                return Err(StoreError::Corrupt("injected write failure".to_string()));
            }
            self.inner.set(slot, value).await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn test_full_signing_cycle() {
        let mut wf = controller().await;
        assert_eq!(wf.status(), WorkflowStatus::NoKey);

        let record = wf.generate_key().await.unwrap();
        assert_eq!(wf.status(), WorkflowStatus::KeyReady);
        assert!(!record.private_scalar().is_empty());

        // The key slot holds a JWK-shaped record with the private scalar
        let stored = wf.store.get(Slot::Key).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(json["kty"], "EC");
        assert_eq!(json["crv"], "P-384");
        assert!(json["d"].is_string());

        let signature = wf.start_signing().await.unwrap();
        assert_eq!(wf.status(), WorkflowStatus::Signed);

        let hex = wf.signature_hex().await.unwrap().unwrap();
        assert_eq!(hex, signature.to_hex());
        assert_eq!(hex, hex.to_lowercase());
        assert!(!hex.is_empty());

        wf.reset().await.unwrap();
        assert_eq!(wf.status(), WorkflowStatus::NoKey);
        assert!(wf.store.get(Slot::Key).await.unwrap().is_none());
        assert!(wf.store.get(Slot::Signature).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fresh_session_discards_prior_values() {
        let store: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        store.set(Slot::Key, "stale record").await.unwrap();
        store.set(Slot::Signature, "stale signature").await.unwrap();

        let wf = WorkflowController::new(Arc::clone(&store), sample_payload())
            .await
            .unwrap();

        assert_eq!(wf.status(), WorkflowStatus::NoKey);
        assert!(store.get(Slot::Key).await.unwrap().is_none());
        assert!(store.get(Slot::Signature).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_is_idempotent() {
        let mut wf = controller().await;

        let first = wf.generate_key().await.unwrap();
        let second = wf.generate_key().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(wf.status(), WorkflowStatus::KeyReady);
    }

    #[tokio::test]
    async fn test_signing_requires_a_key() {
        let mut wf = controller().await;

        assert!(wf.start_signing().await.is_err());
        assert_eq!(wf.status(), WorkflowStatus::NoKey);
        assert!(wf.signature_hex().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_signing_rejected() {
        let mut wf = controller().await;
        wf.generate_key().await.unwrap();
        let signature = wf.start_signing().await.unwrap();

        assert!(wf.start_signing().await.is_err());
        assert_eq!(wf.status(), WorkflowStatus::Signed);

        // The persisted signature is untouched
        let hex = wf.signature_hex().await.unwrap().unwrap();
        assert_eq!(hex, signature.to_hex());
    }

    #[tokio::test]
    async fn test_generate_after_signing_keeps_signature() {
        let mut wf = controller().await;
        let record = wf.generate_key().await.unwrap();
        wf.start_signing().await.unwrap();

        let again = wf.generate_key().await.unwrap();

        assert_eq!(record, again);
        assert_eq!(wf.status(), WorkflowStatus::Signed);
        assert!(wf.signature_hex().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_signature_verifies_against_record() {
        let mut wf = controller().await;
        let record = wf.generate_key().await.unwrap();
        let signature = wf.start_signing().await.unwrap();

        verify_signature(&record, wf.payload(), &signature).unwrap();
        assert_eq!(signature.to_hex().len(), 2 * SignatureRecord::LEN);
    }

    #[tokio::test]
    async fn test_failed_signing_returns_to_key_ready() {
        let store = Arc::new(FlakySignatureStore::default());
        let mut wf = WorkflowController::new(store, sample_payload())
            .await
            .unwrap();
        wf.generate_key().await.unwrap();

        assert!(wf.start_signing().await.is_err());
        assert_eq!(wf.status(), WorkflowStatus::KeyReady);
        assert!(wf.signature_hex().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let mut wf = controller().await;
        wf.generate_key().await.unwrap();

        wf.reset().await.unwrap();
        wf.reset().await.unwrap();

        assert_eq!(wf.status(), WorkflowStatus::NoKey);
    }

    #[tokio::test]
    async fn test_private_scalar_follows_key_lifecycle() {
        let mut wf = controller().await;
        assert!(wf.private_scalar().await.unwrap().is_none());

        let record = wf.generate_key().await.unwrap();
        assert_eq!(
            wf.private_scalar().await.unwrap().unwrap(),
            record.private_scalar()
        );

        wf.reset().await.unwrap();
        assert!(wf.private_scalar().await.unwrap().is_none());
    }
}
