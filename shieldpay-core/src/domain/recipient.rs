//! Recipient address validation

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Required length of a recipient address, in characters
pub const RECIPIENT_LEN: usize = 44;

/// A structurally valid recipient address.
///
/// Only constructed through [`Recipient::parse`]: exactly 44 characters,
/// all from the base-58 alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient(String);

impl Recipient {
    pub fn parse(input: &str) -> Result<Self> {
        let candidate = input.trim();
        if candidate.chars().count() != RECIPIENT_LEN {
            return Err(Error::validation(format!(
                "Invalid public key: expected {} characters, got {}",
                RECIPIENT_LEN,
                candidate.chars().count()
            )));
        }
        bs58::decode(candidate)
            .into_vec()
            .map_err(|_| Error::validation("Invalid public key: not a base-58 string"))?;
        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
