//! Address and prefix types

use crate::core::constants::{ADDRESS_LENGTH, PREFIX_LENGTH};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 10-character Krist address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "&str", into = "String")]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Create an address from exactly 10 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ADDRESS_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Address length must be {}, got {}",
                ADDRESS_LENGTH,
                bytes.len()
            )));
        }

        let mut array = [0u8; ADDRESS_LENGTH];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    /// Get the address as bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        // constructed from validated ASCII
        std::str::from_utf8(&self.0).unwrap_or("??????????")
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !s.is_ascii() {
            return Err(Error::invalid_argument("Address must be ASCII"));
        }
        Self::from_bytes(s.as_bytes())
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::from_str(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.as_str().to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 2-character prefix distinguishing miners that share an address.
///
/// Every nonce a device generates starts with its prefix, so two miners with
/// distinct prefixes can never evaluate the same nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix([u8; PREFIX_LENGTH]);

impl Prefix {
    /// Create a prefix from exactly 2 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PREFIX_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Prefix length must be {}, got {}",
                PREFIX_LENGTH,
                bytes.len()
            )));
        }

        let mut array = [0u8; PREFIX_LENGTH];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    /// Create a prefix from a byte value, formatted as two hex characters
    pub fn from_byte(value: u8) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        Self([HEX[(value >> 4) as usize], HEX[(value & 0xf) as usize]])
    }

    /// Generate a random prefix
    pub fn random() -> Self {
        Self::from_byte(rand::random())
    }

    /// Get the prefix as bytes
    pub fn as_bytes(&self) -> &[u8; PREFIX_LENGTH] {
        &self.0
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::str::from_utf8(&self.0).unwrap_or("??"))
    }
}
