//! JWK-shaped private key record
//!
//! The persistable form of the signing key: a JSON object carrying the
//! ECDSA P-384 key material in the standard JWK field layout, restricted
//! to the "sign" usage.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p384::elliptic_curve::sec1::ToEncodedPoint;
use p384::SecretKey;
use serde::{Deserialize, Serialize};

use super::KeyError;

/// JWK key type for elliptic-curve keys
pub const KEY_TYPE: &str = "EC";

/// JWK curve identifier for NIST P-384
pub const CURVE: &str = "P-384";

/// Usage flag required for signing
pub const USAGE_SIGN: &str = "sign";

/// Persistable private-key record in JWK field layout
///
/// Immutable once generated; the store holds at most one at a time.
/// Field order follows the alphabetical JWK serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Curve identifier ("P-384")
    pub crv: String,

    /// Private scalar, base64url without padding (48 bytes)
    pub d: String,

    /// Extractable flag
    pub ext: bool,

    /// Permitted usages; must include "sign"
    pub key_ops: Vec<String>,

    /// Key type ("EC")
    pub kty: String,

    /// Public x coordinate, base64url without padding (48 bytes)
    pub x: String,

    /// Public y coordinate, base64url without padding (48 bytes)
    pub y: String,
}

impl KeyRecord {
    /// Export a secret key into its persistable form
    pub fn from_secret_key(secret: &SecretKey) -> Result<Self, KeyError> {
        let point = secret.public_key().to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| KeyError::Export("public key is the identity point".to_string()))?;
        let y = point
            .y()
            .ok_or_else(|| KeyError::Export("public key is the identity point".to_string()))?;

        Ok(Self {
            crv: CURVE.to_string(),
            d: URL_SAFE_NO_PAD.encode(secret.to_bytes()),
            ext: true,
            key_ops: vec![USAGE_SIGN.to_string()],
            kty: KEY_TYPE.to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        })
    }

    /// Serialize to the JSON form stored in the `key` slot
    pub fn to_json(&self) -> Result<String, KeyError> {
        serde_json::to_string(self).map_err(|e| KeyError::Export(e.to_string()))
    }

    /// Parse a record from its stored JSON form
    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        serde_json::from_str(json).map_err(|e| KeyError::Import(e.to_string()))
    }

    /// The encoded private scalar (displayed by the UI layer)
    pub fn private_scalar(&self) -> &str {
        &self.d
    }

    /// Whether the record permits the given usage
    pub fn allows(&self, usage: &str) -> bool {
        self.key_ops.iter().any(|op| op == usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> KeyRecord {
        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        KeyRecord::from_secret_key(&secret).unwrap()
    }

    #[test]
    fn test_export_shape() {
        let record = sample_record();

        assert_eq!(record.kty, "EC");
        assert_eq!(record.crv, "P-384");
        assert!(record.ext);
        assert_eq!(record.key_ops, vec!["sign".to_string()]);
        assert!(record.allows("sign"));
        assert!(!record.allows("verify"));
    }

    #[test]
    fn test_scalar_and_coordinates_decode_to_field_size() {
        let record = sample_record();

        for encoded in [&record.d, &record.x, &record.y] {
            let bytes = URL_SAFE_NO_PAD.decode(encoded).unwrap();
            assert_eq!(bytes.len(), 48);
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let record = sample_record();

        let json = record.to_json().unwrap();
        let parsed = KeyRecord::from_json(&json).unwrap();

        assert_eq!(record, parsed);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(KeyRecord::from_json("not json").is_err());
        assert!(KeyRecord::from_json(r#"{"kty":"EC"}"#).is_err());
    }
}
