//! Signing Module - ECDSA P-384 signatures over credential payloads
//!
//! Computes the signature over the SHA-256 digest of the payload and
//! persists the result in its hexadecimal text form.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::keys::{KeyRecord, OperationalKey};
use crate::store::{Slot, SlotStore, StoreError};

#[derive(Error, Debug)]
pub enum SignError {
    #[error("Signing primitive failed: {0}")]
    Primitive(String),

    #[error("Invalid verification key: {0}")]
    InvalidKey(String),

    #[error("Malformed signature: {0}")]
    InvalidSignature(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Signature storage error: {0}")]
    Store(#[from] StoreError),
}

/// Byte-serialized credential payload, opaque to the signing core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap serialized credential bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Raw ECDSA P-384 signature (`r || s`)
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureRecord(Vec<u8>);

impl SignatureRecord {
    /// Signature length for ECDSA P-384: r and s, 48 bytes each
    pub const LEN: usize = 96;

    /// Create from raw signature bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hexadecimal text form (the persisted representation)
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from the persisted hexadecimal form
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != Self::LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SignatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureRecord({})", self.to_hex())
    }
}

/// Produces and persists signatures over credential payloads
pub struct Signer {
    store: Arc<dyn SlotStore>,
}

impl Signer {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Sign the payload with an imported operational key.
    ///
    /// The signature is computed over the SHA-256 digest of the payload;
    /// the hex form is persisted only after the primitive succeeds. The
    /// key handle is consumed by the call.
    pub async fn sign(
        &self,
        key: OperationalKey,
        payload: &Payload,
    ) -> Result<SignatureRecord, SignError> {
        let digest = Sha256::digest(payload.as_bytes());
        let signature: Signature = key
            .signing_key()
            .sign_prehash(&digest)
            .map_err(|e| SignError::Primitive(e.to_string()))?;

        let record = SignatureRecord::from_bytes(signature.to_bytes().to_vec());
        self.store.set(Slot::Signature, &record.to_hex()).await?;
        tracing::info!(
            "Signed credential payload ({} signature bytes)",
            record.as_bytes().len()
        );
        Ok(record)
    }
}

/// Verify a signature against the public coordinates of a key record.
///
/// Signature-level verification for round-trip checks; the payload stays
/// an opaque byte string.
pub fn verify_signature(
    record: &KeyRecord,
    payload: &Payload,
    signature: &SignatureRecord,
) -> Result<(), SignError> {
    let verifying_key = verifying_key_from_record(record)?;
    let ecdsa_sig = Signature::from_slice(signature.as_bytes())
        .map_err(|e| SignError::InvalidSignature(e.to_string()))?;

    let digest = Sha256::digest(payload.as_bytes());
    verifying_key
        .verify_prehash(&digest, &ecdsa_sig)
        .map_err(|_| SignError::VerificationFailed)
}

/// Rebuild the verifying key from the record's affine coordinates
fn verifying_key_from_record(record: &KeyRecord) -> Result<VerifyingKey, SignError> {
    let x = decode_coordinate(&record.x)?;
    let y = decode_coordinate(&record.y)?;
    let point = p384::EncodedPoint::from_affine_coordinates(
        p384::FieldBytes::from_slice(&x),
        p384::FieldBytes::from_slice(&y),
        false,
    );
    VerifyingKey::from_encoded_point(&point).map_err(|e| SignError::InvalidKey(e.to_string()))
}

fn decode_coordinate(encoded: &str) -> Result<Vec<u8>, SignError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| SignError::InvalidKey(format!("invalid coordinate encoding: {}", e)))?;
    if bytes.len() != 48 {
        return Err(SignError::InvalidKey(format!(
            "coordinate must be 48 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
