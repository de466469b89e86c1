//! Target and solution types

use crate::core::constants::{NONCE_LENGTH, SHORT_HASH_LENGTH};
use crate::core::Address;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The 12-character short hash of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "&str", into = "String")]
pub struct ShortHash([u8; SHORT_HASH_LENGTH]);

impl ShortHash {
    /// Create a short hash from exactly 12 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SHORT_HASH_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Previous block length must be {}, got {}",
                SHORT_HASH_LENGTH,
                bytes.len()
            )));
        }

        let mut array = [0u8; SHORT_HASH_LENGTH];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    /// Get the short hash as bytes
    pub fn as_bytes(&self) -> &[u8; SHORT_HASH_LENGTH] {
        &self.0
    }
}

impl FromStr for ShortHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bytes(s.as_bytes())
    }
}

impl TryFrom<&str> for ShortHash {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::from_str(value)
    }
}

impl From<ShortHash> for String {
    fn from(hash: ShortHash) -> Self {
        hash.to_string()
    }
}

impl fmt::Display for ShortHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::str::from_utf8(&self.0).unwrap_or("????????????"))
    }
}

/// A target to mine for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Short hash of the previous block
    pub prev_block: ShortHash,

    /// Work threshold; a nonce solves this target iff its score is below it
    pub work: i64,
}

impl Target {
    /// Create a target, validating that the work value is positive
    pub fn new(prev_block: ShortHash, work: i64) -> Result<Self> {
        if work <= 0 {
            return Err(Error::invalid_argument(format!(
                "Work must be positive, got {}",
                work
            )));
        }

        Ok(Self { prev_block, work })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} work {}", self.prev_block, self.work)
    }
}

/// A 12-byte ASCII nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LENGTH]);

impl Nonce {
    /// Create a nonce from the leading bytes of a kernel solution buffer.
    ///
    /// The kernel may write up to 15 bytes; only the first 12 form the
    /// nonce, the rest is padding and is dropped here.
    pub fn from_solution_buffer(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < NONCE_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Nonce length must be at least {}, got {}",
                NONCE_LENGTH,
                buffer.len()
            )));
        }

        let mut array = [0u8; NONCE_LENGTH];
        array.copy_from_slice(&buffer[..NONCE_LENGTH]);
        Ok(Self(array))
    }

    /// Get the nonce as bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_LENGTH] {
        &self.0
    }

    /// Get the nonce as a string slice
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????????????")
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A solution for a specific target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// The target that this solution applies to
    pub target: Target,

    /// The address this solution is valid for
    pub address: Address,

    /// The winning nonce
    pub nonce: Nonce,
}

impl Solution {
    /// Create a solution
    pub fn new(target: Target, address: Address, nonce: Nonce) -> Self {
        Self {
            target,
            address,
            nonce,
        }
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "address {} nonce {} ({})",
            self.address, self.nonce, self.target
        )
    }
}
