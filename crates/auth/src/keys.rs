//! Ed25519 key pair loading.
//!
//! Key material arrives as base64 text wrapping a PEM document: a PKCS#8
//! `PRIVATE KEY` for signing and an SPKI `PUBLIC KEY` for verification. Both
//! are parsed structurally; the intermediate buffers are dropped once the
//! token keys are built.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;

pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Unusable key material. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("{which} key is not valid base64")]
    Base64 { which: &'static str },

    #[error("{which} key does not contain a PEM block")]
    MissingPemBlock { which: &'static str },

    #[error("{which} key has PEM label '{found}', expected '{expected}'")]
    UnexpectedPemLabel {
        which: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{which} key is not an Ed25519 key: {reason}")]
    Unsupported { which: &'static str, reason: String },

    #[error("public key does not belong to the private key")]
    Mismatch,
}

/// Signing and verification keys, loaded once at startup.
///
/// `Debug` is redacted; the pair is never serialized.
pub struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    verifying: VerifyingKey,
}

impl KeyPair {
    /// Load a key pair from base64-of-PEM strings.
    pub fn from_base64_pem(private_b64: &str, public_b64: &str) -> Result<Self, KeyError> {
        let private_pem = decode_pem_text(private_b64, "private", PRIVATE_KEY_LABEL)?;
        let public_pem = decode_pem_text(public_b64, "public", PUBLIC_KEY_LABEL)?;

        let signing = SigningKey::from_pkcs8_pem(&private_pem).map_err(|e| KeyError::Unsupported {
            which: "private",
            reason: e.to_string(),
        })?;
        let verifying =
            VerifyingKey::from_public_key_pem(&public_pem).map_err(|e| KeyError::Unsupported {
                which: "public",
                reason: e.to_string(),
            })?;

        if signing.verifying_key() != verifying {
            return Err(KeyError::Mismatch);
        }

        let encoding = EncodingKey::from_ed_pem(private_pem.as_bytes()).map_err(|e| {
            KeyError::Unsupported {
                which: "private",
                reason: e.to_string(),
            }
        })?;
        // The verifier takes the raw 32-byte public key.
        let decoding = DecodingKey::from_ed_der(verifying.as_bytes());

        tracing::info!("loaded Ed25519 token signing key pair");

        Ok(Self {
            encoding,
            decoding,
            verifying,
        })
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &"Ed25519")
            .finish_non_exhaustive()
    }
}

fn decode_pem_text(
    b64: &str,
    which: &'static str,
    expected: &'static str,
) -> Result<String, KeyError> {
    let bytes = STANDARD
        .decode(b64.trim())
        .map_err(|_| KeyError::Base64 { which })?;
    let text = String::from_utf8(bytes).map_err(|_| KeyError::MissingPemBlock { which })?;

    let label = pem_label(&text).ok_or(KeyError::MissingPemBlock { which })?;
    if label != expected {
        return Err(KeyError::UnexpectedPemLabel {
            which,
            expected,
            found: label.to_string(),
        });
    }

    Ok(text.trim().to_string())
}

/// Label of the first `-----BEGIN <label>-----` line. The body is validated by
/// the PKCS#8 / SPKI parsers.
fn pem_label(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find_map(|line| {
        line.strip_prefix("-----BEGIN ")?.strip_suffix("-----")
    })
}
