//! Account store - one custodial keypair file per user

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domain::result::{Error, Result};
use crate::domain::{AccountRecord, Disclosure, KeyMaterial};

/// Keypair files under `<data dir>/keypairs/<user_id>.json`
#[derive(Debug, Clone)]
pub struct AccountStore {
    keys_dir: PathBuf,
}

impl AccountStore {
    /// Open the store, creating the key directory (0700 on unix) if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let keys_dir = data_dir.join("keypairs");
        fs::create_dir_all(&keys_dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&keys_dir, fs::Permissions::from_mode(0o700))?;
        }

        Ok(Self { keys_dir })
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    /// Path of the record file for `user_id`
    pub fn key_path(&self, user_id: &str) -> PathBuf {
        self.keys_dir.join(format!("{}.json", user_id))
    }

    /// Return the user's record, creating it on first use.
    ///
    /// The secret is only disclosed when this call created the record.
    /// Concurrent first calls for one user still produce a single record:
    /// the file is written aside and linked into place, and the loser of
    /// the race loads the winner's record.
    pub fn get_or_create(&self, user_id: &str) -> Result<(AccountRecord, Disclosure)> {
        AccountRecord::validate_user_id(user_id)?;

        if let Some(record) = self.load(user_id)? {
            return Ok((record, Disclosure::Existing));
        }

        let material = KeyMaterial::generate()?;
        let path = self.key_path(user_id);
        let record = AccountRecord::new(user_id, material, &path)?;
        let secret_json = record.key_material.to_json();

        match self.persist(&path, &secret_json) {
            Ok(()) => Ok((record, Disclosure::New { secret_json })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = self.load(user_id)?.ok_or(Error::NoWallet)?;
                Ok((existing, Disclosure::Existing))
            }
            Err(e) => Err(Error::KeyGeneration(format!(
                "could not store keypair for {}: {}",
                user_id, e
            ))),
        }
    }

    /// Load an existing record, `None` if the user has no wallet yet
    pub fn load(&self, user_id: &str) -> Result<Option<AccountRecord>> {
        AccountRecord::validate_user_id(user_id)?;
        let path = self.key_path(user_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let material = KeyMaterial::from_json(&content)?;
        Ok(Some(AccountRecord::new(user_id, material, &path)?))
    }

    /// Derive the public identifier of a stored record
    pub fn public_id(&self, record: &AccountRecord) -> Result<String> {
        record.key_material.public_id()
    }

    /// Write the file next to its final name, then link it into place.
    /// Linking fails with `AlreadyExists` if another writer got there first.
    fn persist(&self, path: &Path, content: &str) -> std::io::Result<()> {
        let tmp = self
            .keys_dir
            .join(format!(".{}.tmp", bs58::encode(rand::random::<[u8; 8]>()).into_string()));

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let written = options.open(&tmp).and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        });
        let linked = written.and_then(|_| fs::hard_link(&tmp, path));
        let _ = fs::remove_file(&tmp);
        linked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_call_creates_and_discloses() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();

        let (record, disclosure) = store.get_or_create("7651550366").unwrap();

        assert!(disclosure.is_new());
        assert!(store.key_path("7651550366").exists());
        if let Disclosure::New { secret_json } = disclosure {
            assert_eq!(secret_json, record.key_material.to_json());
        }
    }

    #[test]
    fn test_second_call_returns_same_record_without_secret() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();

        let (first, _) = store.get_or_create("alice").unwrap();
        let (second, disclosure) = store.get_or_create("alice").unwrap();

        assert_eq!(disclosure, Disclosure::Existing);
        assert_eq!(first.public_id, second.public_id);
        assert_eq!(store.public_id(&second).unwrap(), first.public_id);
    }

    #[test]
    fn test_load_missing_user() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        assert!(store.load("nobody").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_key_derivation_error() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        fs::write(store.key_path("bob"), "[1,2,3]").unwrap();

        assert!(matches!(store.load("bob"), Err(Error::KeyDerivation(_))));
        assert!(matches!(store.get_or_create("bob"), Err(Error::KeyDerivation(_))));
    }

    #[test]
    fn test_invalid_user_id_is_rejected() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        assert!(matches!(store.get_or_create("../x"), Err(Error::Validation(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_record_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        store.get_or_create("carol").unwrap();

        let file_mode = fs::metadata(store.key_path("carol")).unwrap().permissions().mode();
        let dir_mode = fs::metadata(store.keys_dir()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        store.get_or_create("dave").unwrap();

        let names: Vec<_> = fs::read_dir(store.keys_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["dave.json".to_string()]);
    }
}
