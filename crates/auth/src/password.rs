//! Argon2id password hashing with self-describing records.
//!
//! A record carries everything needed to re-derive its key, in six
//! `$`-delimited fields (the first one empty):
//!
//! ```text
//! $argon2id$v=19$m=65536,t=3,p=2$<salt>$<key>
//! ```
//!
//! Salt and key use the standard base64 alphabet without padding. Verification
//! always re-derives with the record's own cost parameters, so records written
//! under older defaults keep verifying after the defaults change.

use argon2::password_hash::Output;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use thiserror::Error;

pub const ALGORITHM_TAG: &str = "argon2id";
pub const SUPPORTED_VERSION: u32 = 0x13;
pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
/// Largest memory cost a stored record may ask for (4 GiB).
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The stored record is malformed. Never a verification mismatch.
    #[error("the encoded hash is not in the correct format: {0}")]
    Format(&'static str),

    /// The record was produced by an Argon2 version this build cannot verify.
    #[error("incompatible argon2 version {found} (supported: {supported})")]
    IncompatibleVersion { found: u32, supported: u32 },

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),
}

/// Tunable Argon2 costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 2,
        }
    }
}

/// Password hashing capability.
///
/// Object-safe so use cases can hold `Arc<dyn PasswordHashing>` and tests can
/// substitute a deterministic double.
pub trait PasswordHashing: Send + Sync {
    /// Hash a plaintext password into an encoded record.
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Check a plaintext password against an encoded record.
    ///
    /// `Ok(false)` is a mismatch; `Err` means the record itself is unusable.
    fn verify(&self, password: &str, record: &str) -> Result<bool, PasswordError>;
}

/// Decoded form of a password record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    version: u32,
    params: CostParams,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl PasswordRecord {
    pub fn parse(encoded: &str) -> Result<Self, PasswordError> {
        let parts: Vec<&str> = encoded.split('$').collect();
        if parts.len() != 6 || !parts[0].is_empty() {
            return Err(PasswordError::Format("expected 6 '$'-delimited fields"));
        }
        if parts[1] != ALGORITHM_TAG {
            return Err(PasswordError::Format("unsupported algorithm tag"));
        }

        let version = parts[2]
            .strip_prefix("v=")
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or(PasswordError::Format("malformed version field"))?;
        if version != SUPPORTED_VERSION {
            return Err(PasswordError::IncompatibleVersion {
                found: version,
                supported: SUPPORTED_VERSION,
            });
        }

        let params = parse_params(parts[3])?;

        let salt = STANDARD_NO_PAD
            .decode(parts[4])
            .map_err(|_| PasswordError::Format("salt is not valid base64"))?;
        let key = STANDARD_NO_PAD
            .decode(parts[5])
            .map_err(|_| PasswordError::Format("key is not valid base64"))?;
        if key.len() < Output::MIN_LENGTH || key.len() > Output::MAX_LENGTH {
            return Err(PasswordError::Format("derived key length out of range"));
        }

        Ok(Self {
            version,
            params,
            salt,
            key,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn params(&self) -> CostParams {
        self.params
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl core::fmt::Display for PasswordRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "${}$v={}$m={},t={},p={}${}${}",
            ALGORITHM_TAG,
            self.version,
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            STANDARD_NO_PAD.encode(&self.salt),
            STANDARD_NO_PAD.encode(&self.key),
        )
    }
}

fn parse_params(field: &str) -> Result<CostParams, PasswordError> {
    const MALFORMED: PasswordError = PasswordError::Format("malformed cost parameters");

    let mut values = field.split(',');
    let mut next = |prefix: &str| -> Result<u32, PasswordError> {
        values
            .next()
            .and_then(|kv| kv.strip_prefix(prefix))
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or(MALFORMED)
    };

    let params = CostParams {
        memory_kib: next("m=")?,
        iterations: next("t=")?,
        parallelism: next("p=")?,
    };
    if values.next().is_some() {
        return Err(MALFORMED);
    }
    if params.memory_kib > MAX_MEMORY_KIB {
        return Err(PasswordError::Format("memory cost exceeds limit"));
    }
    Ok(params)
}

fn derive_key(
    password: &str,
    salt: &[u8],
    params: CostParams,
    key_len: usize,
) -> Result<Vec<u8>, argon2::Error> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(key_len),
    )?;
    let mut key = vec![0u8; key_len];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params).hash_password_into(
        password.as_bytes(),
        salt,
        &mut key,
    )?;
    Ok(key)
}

/// Argon2id hasher with fixed cost parameters for new records.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    params: CostParams,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom costs for newly hashed records (tests, cost migration).
    pub fn with_params(params: CostParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> CostParams {
        self.params
    }

    pub fn hash_password(&self, password: &str) -> Result<PasswordRecord, PasswordError> {
        let mut salt = vec![0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| PasswordError::Entropy(e.to_string()))?;

        let key = derive_key(password, &salt, self.params, KEY_LEN)
            .map_err(|e| PasswordError::Derivation(e.to_string()))?;

        Ok(PasswordRecord {
            version: SUPPORTED_VERSION,
            params: self.params,
            salt,
            key,
        })
    }

    pub fn verify_password(
        &self,
        password: &str,
        record: &PasswordRecord,
    ) -> Result<bool, PasswordError> {
        // A record argon2 refuses to run (cost out of range, salt too short) is
        // malformed, not a mismatch.
        let derived = derive_key(password, &record.salt, record.params, record.key.len())
            .map_err(|_| PasswordError::Format("record parameters rejected by argon2"))?;

        let derived = Output::new(&derived)
            .map_err(|e| PasswordError::Derivation(e.to_string()))?;
        let stored = Output::new(&record.key)
            .map_err(|_| PasswordError::Format("derived key length out of range"))?;

        // `Output` equality is constant time.
        Ok(derived == stored)
    }
}

impl PasswordHashing for PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Ok(self.hash_password(password)?.to_string())
    }

    fn verify(&self, password: &str, record: &str) -> Result<bool, PasswordError> {
        let record = PasswordRecord::parse(record)?;
        self.verify_password(password, &record)
    }
}
