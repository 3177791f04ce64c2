//! Local credential check feeding the completion leg.
//!
//! The SSO handshake only needs `{username, display name, email}` from
//! whatever authenticated the user. [`StaticUserDirectory`] is a small
//! file-backed implementation; any other source can implement
//! [`Authenticator`].

use std::collections::HashMap;
use std::path::Path;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use discourse_sso::AuthenticatedIdentity;
use serde::Deserialize;
use thiserror::Error;

/// Verifies local credentials.
pub trait Authenticator: Send + Sync {
    /// Return the identity for valid credentials, `None` otherwise.
    fn authenticate(&self, username: &str, password: &str) -> Option<AuthenticatedIdentity>;
}

/// Errors loading a user directory or hashing a password.
#[derive(Debug, Error)]
pub enum UserDirectoryError {
    #[error("failed to read user directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse user directory: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("user '{0}' has an invalid password_hash (expected an argon2 PHC string)")]
    InvalidHash(String),

    #[error("user '{0}' is defined more than once")]
    DuplicateUser(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// One `[[users]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// Falls back to `username` when absent.
    #[serde(default)]
    pub display_name: Option<String>,
    pub email: String,
    /// Argon2 PHC string (see `discourse-sso hash-password`).
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
struct UserFile {
    #[serde(default)]
    users: Vec<UserRecord>,
}

struct UserEntry {
    identity: AuthenticatedIdentity,
    password_hash: String,
}

/// Fixed set of users loaded at startup.
///
/// ```toml
/// [[users]]
/// username = "mythz"
/// display_name = "mythz"
/// email = "demisbellot@gmail.com"
/// password_hash = "$argon2id$v=19$m=19456,t=2,p=1$nxwqfks9jhDGpffS47QJGA$k4H5gZV6lOI7AlIxXa0t0FITlKIG6C9KddnV9NviyDQ"
/// ```
#[derive(Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, UserEntry>,
}

impl StaticUserDirectory {
    /// A directory that rejects every login.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, UserDirectoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, UserDirectoryError> {
        let file: UserFile = toml::from_str(content)?;
        Self::from_records(file.users)
    }

    pub fn from_records(records: Vec<UserRecord>) -> Result<Self, UserDirectoryError> {
        let mut users = HashMap::with_capacity(records.len());

        for record in records {
            let password_hash = record.password_hash.trim().to_string();
            let parsed = PasswordHash::new(&password_hash)
                .map_err(|_| UserDirectoryError::InvalidHash(record.username.clone()))?;
            if !parsed.algorithm.as_str().starts_with("argon2") {
                return Err(UserDirectoryError::InvalidHash(record.username));
            }

            let identity = AuthenticatedIdentity {
                display_name: record
                    .display_name
                    .unwrap_or_else(|| record.username.clone()),
                username: record.username.clone(),
                email: record.email,
            };

            let entry = UserEntry {
                identity,
                password_hash,
            };
            if users.insert(record.username.clone(), entry).is_some() {
                return Err(UserDirectoryError::DuplicateUser(record.username));
            }
        }

        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Authenticator for StaticUserDirectory {
    fn authenticate(&self, username: &str, password: &str) -> Option<AuthenticatedIdentity> {
        let entry = self.users.get(username)?;
        let parsed = PasswordHash::new(&entry.password_hash).ok()?;

        // Cost parameters come from the stored PHC string.
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
            .then(|| entry.identity.clone())
    }
}

/// Hash `password` with Argon2id (m=19456 KiB, t=2, p=1) and a random salt,
/// returning the PHC string stored in the user directory.
pub fn hash_password(password: &str) -> Result<String, UserDirectoryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserDirectoryError::Hashing(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Low-cost Argon2id hashes of "p@ssw0rd" (m=64, t=1, p=1), distinct salts.
    pub(crate) const MYTHZ_HASH: &str =
        "$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQtbXl0aHohIQ$We0KM9bUZBiNVrTPZk+5QvWYhm4WeUwsQzsZVL5Jbkw";
    pub(crate) const DREID_HASH: &str =
        "$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQtZHJlaWQhIQ$ej77QXLemmEv2P0O3JovAKb5QQG69gBC6wgi/GFSWGw";

    fn users_toml() -> String {
        format!(
            r#"
[[users]]
username = "mythz"
display_name = "Demis"
email = "demisbellot@gmail.com"
password_hash = "{MYTHZ_HASH}"

[[users]]
username = "dreid"
email = "dreid@test.com"
password_hash = "{DREID_HASH}"
"#
        )
    }

    #[test]
    fn test_hash_password_returns_salted_argon2id() {
        let first = hash_password("p@ssw0rd").unwrap();
        let second = hash_password("p@ssw0rd").unwrap();

        assert!(first.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
        assert_ne!(first, second);

        let directory = StaticUserDirectory::from_records(vec![UserRecord {
            username: "mythz".into(),
            display_name: None,
            email: "demisbellot@gmail.com".into(),
            password_hash: first,
        }])
        .unwrap();
        assert!(directory.authenticate("mythz", "p@ssw0rd").is_some());
        assert!(directory.authenticate("mythz", "p@ssw0rd!").is_none());
    }

    #[test]
    fn test_same_password_different_digests() {
        assert_ne!(MYTHZ_HASH, DREID_HASH);
    }

    #[test]
    fn test_authenticate_valid_credentials() {
        let directory = StaticUserDirectory::from_toml_str(&users_toml()).unwrap();
        let identity = directory.authenticate("mythz", "p@ssw0rd").unwrap();

        assert_eq!(identity.username, "mythz");
        assert_eq!(identity.display_name, "Demis");
        assert_eq!(identity.email, "demisbellot@gmail.com");
    }

    #[test]
    fn test_display_name_defaults_to_username() {
        let directory = StaticUserDirectory::from_toml_str(&users_toml()).unwrap();
        let identity = directory.authenticate("dreid", "p@ssw0rd").unwrap();
        assert_eq!(identity.display_name, "dreid");
    }

    #[test]
    fn test_authenticate_rejects_wrong_password_and_unknown_user() {
        let directory = StaticUserDirectory::from_toml_str(&users_toml()).unwrap();
        assert!(directory.authenticate("mythz", "wrong").is_none());
        assert!(directory.authenticate("nobody", "p@ssw0rd").is_none());
    }

    #[test]
    fn test_empty_directory_rejects_everyone() {
        let directory = StaticUserDirectory::empty();
        assert!(directory.is_empty());
        assert!(directory.authenticate("mythz", "p@ssw0rd").is_none());
    }

    #[test]
    fn test_invalid_hash_rejected() {
        for hash in [
            "abc",
            // Unsalted SHA-256 hex is no longer accepted.
            "a075d17f3d453073853f813838c15b8023b8c487038436354fe599c3942e1f95",
            "$pbkdf2-sha256$i=1000$c2FsdA$aGFzaA",
        ] {
            let content = format!(
                r#"
[[users]]
username = "mythz"
email = "demisbellot@gmail.com"
password_hash = "{hash}"
"#
            );
            assert!(
                matches!(
                    StaticUserDirectory::from_toml_str(&content),
                    Err(UserDirectoryError::InvalidHash(ref name)) if name == "mythz"
                ),
                "hash: {}",
                hash
            );
        }
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let record = UserRecord {
            username: "mythz".into(),
            display_name: None,
            email: "demisbellot@gmail.com".into(),
            password_hash: MYTHZ_HASH.into(),
        };
        assert!(matches!(
            StaticUserDirectory::from_records(vec![record.clone(), record]),
            Err(UserDirectoryError::DuplicateUser(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.toml");
        std::fs::write(&path, users_toml()).unwrap();

        let directory = StaticUserDirectory::load(&path).unwrap();
        assert_eq!(directory.len(), 2);
    }
}
