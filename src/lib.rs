//! CredSign Core - Client-Side Verifiable Credential Signing
//!
//! This crate provides the key-lifecycle and signing core for a
//! client-side credential wallet: ECDSA P-384 keypair generation, export
//! of the private key to a persistable JWK-shaped record, fresh-import
//! signing over an opaque credential payload, and durable local
//! persistence of the resulting signature.

pub mod keys;
pub mod signing;
pub mod store;
pub mod workflow;

use thiserror::Error;

/// Main error type for CredSign operations
#[derive(Error, Debug)]
pub enum CredSignError {
    #[error("Key management error: {0}")]
    Key(#[from] keys::KeyError),

    #[error("Signing error: {0}")]
    Signing(#[from] signing::SignError),

    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] workflow::WorkflowError),
}

pub type Result<T> = std::result::Result<T, CredSignError>;

/// Core configuration for the signing workflow
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CredSignConfig {
    /// Local storage path for the slot database
    pub data_path: String,
}

impl Default for CredSignConfig {
    fn default() -> Self {
        Self {
            data_path: "./credsign_data".to_string(),
        }
    }
}

// Re-export core functionality
pub use keys::{KeyManager, KeyRecord, OperationalKey};
pub use signing::{verify_signature, Payload, SignatureRecord, Signer};
pub use store::{
    create_slot_store, LocalSlotStore, MemorySlotStore, Slot, SlotStore, StoreConfig,
};
pub use workflow::{WorkflowController, WorkflowStatus};
