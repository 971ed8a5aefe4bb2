//! Custodial account domain model

use std::fmt;
use std::path::{Path, PathBuf};

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Length of a keypair in the ledger tooling's format (secret || public)
pub const KEYPAIR_LEN: usize = 64;

/// Secret keypair bytes.
///
/// Debug output is redacted; the raw bytes only leave this type through
/// [`KeyMaterial::to_json`], which is used for the one-time disclosure and
/// for writing the record file.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial(<{} bytes redacted>)", self.0.len())
    }
}

impl KeyMaterial {
    /// Generate a fresh ed25519 keypair from the OS random source
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    fn generate_with(rng: &mut impl RngCore) -> Result<Self> {
        let mut secret = [0u8; 32];
        rng.try_fill_bytes(&mut secret)
            .map_err(|e| Error::KeyGeneration(format!("random source failed: {}", e)))?;
        let signing_key = SigningKey::from_bytes(&secret);
        Ok(Self(signing_key.to_keypair_bytes().to_vec()))
    }

    /// Wrap raw bytes without validating them (see [`KeyMaterial::public_id`])
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse the JSON byte-array format written by the ledger tooling
    pub fn from_json(content: &str) -> Result<Self> {
        let bytes: Vec<u8> = serde_json::from_str(content)
            .map_err(|e| Error::key_derivation(format!("unreadable keypair: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Serialize as a JSON byte array
    pub fn to_json(&self) -> String {
        // Vec<u8> serialization cannot fail
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Derive the base-58 public identifier.
    ///
    /// Fails if the material is not 64 bytes or if the public half does not
    /// belong to the secret half.
    pub fn public_id(&self) -> Result<String> {
        let bytes: [u8; KEYPAIR_LEN] = self.0.as_slice().try_into().map_err(|_| {
            Error::key_derivation(format!(
                "expected {} key bytes, found {}",
                KEYPAIR_LEN,
                self.0.len()
            ))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|_| Error::key_derivation("public key does not match secret key"))?;
        Ok(bs58::encode(signing_key.verifying_key().as_bytes()).into_string())
    }
}

/// What the caller may reveal after `get_or_create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disclosure {
    /// Freshly generated: the raw keypair JSON may be shown once
    New { secret_json: String },
    Existing,
}

impl Disclosure {
    pub fn is_new(&self) -> bool {
        matches!(self, Disclosure::New { .. })
    }
}

/// The identity a ledger operation is signed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub public_id: String,
    /// Location of the keypair file handed to the ledger tooling
    pub key_path: PathBuf,
}

impl Signer {
    pub fn new(public_id: impl Into<String>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            public_id: public_id.into(),
            key_path: key_path.into(),
        }
    }
}

/// One custodial keypair per end user
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub user_id: String,
    pub key_material: KeyMaterial,
    pub public_id: String,
    pub key_path: PathBuf,
}

impl AccountRecord {
    /// Build a record, deriving its public identifier
    pub fn new(
        user_id: impl Into<String>,
        key_material: KeyMaterial,
        key_path: &Path,
    ) -> Result<Self> {
        let public_id = key_material.public_id()?;
        Ok(Self {
            user_id: user_id.into(),
            key_material,
            public_id,
            key_path: key_path.to_path_buf(),
        })
    }

    pub fn signer(&self) -> Signer {
        Signer::new(self.public_id.clone(), self.key_path.clone())
    }

    /// Validate an external user identity.
    ///
    /// The identity names files on disk, so only ASCII letters, digits,
    /// `-` and `_` are accepted.
    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(Error::validation("user id cannot be empty"));
        }
        if !user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(format!("invalid user id: {}", user_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_material_derives_public_id() {
        let material = KeyMaterial::generate().unwrap();
        let public_id = material.public_id().unwrap();
        let decoded = bs58::decode(&public_id).into_vec().unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn test_json_roundtrip_keeps_public_id() {
        let material = KeyMaterial::generate().unwrap();
        let parsed = KeyMaterial::from_json(&material.to_json()).unwrap();
        assert_eq!(parsed.public_id().unwrap(), material.public_id().unwrap());
    }

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    #[test]
    fn test_random_source_failure_is_key_generation_error() {
        let result = KeyMaterial::generate_with(&mut BrokenRng);

        match result {
            Err(Error::KeyGeneration(msg)) => assert!(msg.contains("entropy source unavailable")),
            other => panic!("expected key generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_material_is_rejected() {
        let material = KeyMaterial::from_bytes(vec![1, 2, 3]);
        assert!(matches!(material.public_id(), Err(Error::KeyDerivation(_))));
    }

    #[test]
    fn test_mismatched_public_half_is_rejected() {
        let mut bytes = KeyMaterial::generate().unwrap().0;
        bytes[40] ^= 0xff;
        let material = KeyMaterial::from_bytes(bytes);
        assert!(matches!(material.public_id(), Err(Error::KeyDerivation(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let material = KeyMaterial::generate().unwrap();
        let debug = format!("{:?}", material);
        assert!(debug.contains("redacted"));
        assert!(!debug.contains(&material.to_json()));
    }

    #[test]
    fn test_user_id_validation() {
        assert!(AccountRecord::validate_user_id("7651550366").is_ok());
        assert!(AccountRecord::validate_user_id("alice_01").is_ok());
        assert!(AccountRecord::validate_user_id("").is_err());
        assert!(AccountRecord::validate_user_id("../etc").is_err());
    }
}
