//! One-way credential hashing.
//!
//! # Invariants
//! - Raw credentials are never stored, logged, or echoed in errors.
//! - Hashes are salted per call; equal inputs produce different hashes.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// bcrypt work factor used unless configured otherwise.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Lowest bcrypt work factor accepted.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Highest bcrypt work factor accepted.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Hashing/verification failure. Never carries the credential itself.
#[derive(Debug)]
pub struct CredentialError {
    reason: String,
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential hashing failed: {}", self.reason)
    }
}

impl Error for CredentialError {}

impl From<bcrypt::BcryptError> for CredentialError {
    fn from(value: bcrypt::BcryptError) -> Self {
        Self {
            reason: value.to_string(),
        }
    }
}

/// Slow, salted one-way hash for point credentials.
pub trait CredentialHasher: Send + Sync {
    fn hash_credential(&self, raw: &str) -> Result<String, CredentialError>;
    /// Returns whether `raw` matches `hash`.
    fn verify_credential(&self, raw: &str, hash: &str) -> Result<bool, CredentialError>;
}

/// bcrypt-backed hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Creates a hasher with the given work factor (valid range 4..=31).
    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(CredentialError {
                reason: format!(
                    "bcrypt cost {cost} outside {}..={}",
                    MIN_BCRYPT_COST,
                    MAX_BCRYPT_COST
                ),
            });
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash_credential(&self, raw: &str) -> Result<String, CredentialError> {
        Ok(bcrypt::hash(raw, self.cost)?)
    }

    fn verify_credential(&self, raw: &str, hash: &str) -> Result<bool, CredentialError> {
        Ok(bcrypt::verify(raw, hash)?)
    }
}
