//! SQLCipher-backed credential store.
//!
//! A [`Store`] is one encrypted file holding a single `credentials` table.
//! The whole file is encrypted at rest by SQLCipher with the passphrase
//! supplied at creation; the key is applied with `PRAGMA key` on every
//! connection. No plaintext ever touches disk outside the encrypted file.
//!
//! No connection is held between operations: every call opens the database,
//! applies the key, runs its statement, and closes again on all exit paths,
//! so no long-lived file lock is kept while the store sits idle. Operations
//! on one instance are serialized by an internal mutex.
//!
//! # Schema
//!
//! `credentials(id INTEGER PRIMARY KEY, name TEXT, uri TEXT, username TEXT,
//! password TEXT)`. An absent URI is stored as the empty string and reads
//! back as absent.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use url::Url;

use crate::credential::Credential;
use crate::error::{KeyringError, Result};
use crate::paths;

const CREATE_CREDENTIALS_TABLE: &str = "CREATE TABLE IF NOT EXISTS credentials (
    id INTEGER PRIMARY KEY,
    name TEXT,
    uri TEXT,
    username TEXT,
    password TEXT
)";

/// An encrypted on-disk table of [`Credential`]s.
///
/// Obtained through [`Store::create`] or [`Store::load`]; owned exclusively
/// by whoever holds it (normally a [`Keyring`](crate::keyring::Keyring)).
/// Dropping the store releases every resource without touching the file.
pub struct Store {
    name: String,
    path: PathBuf,
    passphrase: String,
    /// Serializes operations: the per-operation connection must never be
    /// driven by two threads at once.
    op_lock: Mutex<()>,
}

impl Store {
    // -- Lifecycle ----------------------------------------------------------

    /// Create a new encrypted store named `name`.
    ///
    /// # Errors
    ///
    /// - [`KeyringError::InvalidArgument`] if `name` or `password` is empty.
    /// - [`KeyringError::StoreExists`] if a store file already exists and
    ///   `overwrite` is false; the existing file is left untouched.
    pub fn create(name: &str, password: &str, overwrite: bool) -> Result<Self> {
        Self::create_in(&paths::keyring_dir()?, name, password, overwrite)
    }

    pub(crate) fn create_in(
        dir: &Path,
        name: &str,
        password: &str,
        overwrite: bool,
    ) -> Result<Self> {
        validate_name_and_password(name, password)?;
        std::fs::create_dir_all(dir)?;

        let path = paths::store_path_in(dir, name);
        if path.exists() {
            if overwrite {
                std::fs::remove_file(&path)?;
            } else {
                return Err(KeyringError::StoreExists {
                    name: name.to_string(),
                });
            }
        }

        let store = Self {
            name: name.to_string(),
            path,
            passphrase: password.to_string(),
            op_lock: Mutex::new(()),
        };
        store.initialize(true)?;

        tracing::info!(name, path = %store.path.display(), "created keyring store");
        Ok(store)
    }

    /// Load an existing encrypted store named `name`.
    ///
    /// # Errors
    ///
    /// - [`KeyringError::InvalidArgument`] if `name` or `password` is empty.
    /// - [`KeyringError::StoreNotFound`] if no store file exists for `name`.
    /// - [`KeyringError::AccessDenied`] if the passphrase is wrong or the
    ///   file is corrupt. The two cannot be told apart: the only signal is
    ///   the encrypted database failing its first read.
    pub fn load(name: &str, password: &str) -> Result<Self> {
        Self::load_in(&paths::keyring_dir()?, name, password)
    }

    pub(crate) fn load_in(dir: &Path, name: &str, password: &str) -> Result<Self> {
        validate_name_and_password(name, password)?;

        let path = paths::store_path_in(dir, name);
        if !path.exists() {
            return Err(KeyringError::StoreNotFound {
                name: name.to_string(),
            });
        }

        let store = Self {
            name: name.to_string(),
            path,
            passphrase: password.to_string(),
            op_lock: Mutex::new(()),
        };
        store
            .initialize(false)
            .map_err(|e| KeyringError::AccessDenied {
                reason: e.to_string(),
            })?;

        tracing::info!(name, path = %store.path.display(), "loaded keyring store");
        Ok(store)
    }

    /// Whether a store file exists for `name`. No decryption is attempted.
    pub fn exists(name: &str) -> bool {
        paths::keyring_dir()
            .map(|dir| Self::exists_in(&dir, name))
            .unwrap_or(false)
    }

    pub(crate) fn exists_in(dir: &Path, name: &str) -> bool {
        paths::store_path_in(dir, name).exists()
    }

    /// Delete the store file for `name` without opening it.
    ///
    /// Returns whether a file was deleted.
    pub fn destroy_named(name: &str) -> Result<bool> {
        Self::destroy_named_in(&paths::keyring_dir()?, name)
    }

    pub(crate) fn destroy_named_in(dir: &Path, name: &str) -> Result<bool> {
        let path = paths::store_path_in(dir, name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        tracing::info!(name, "destroyed keyring store");
        Ok(true)
    }

    /// Delete this store's file and consume the store.
    ///
    /// Returns whether the file deletion succeeded; on failure the file may
    /// remain on disk and can be removed later with [`Store::destroy_named`].
    pub fn destroy(self) -> bool {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(name = %self.name, "destroyed keyring store");
                true
            }
            Err(e) => {
                tracing::warn!(name = %self.name, error = %e, "failed to delete store file");
                false
            }
        }
    }

    /// The name of the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The location of the store file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // -- Credential CRUD ----------------------------------------------------

    /// Every credential in the store, in storage order.
    pub fn get_all_credentials(&self) -> Result<Vec<Credential>> {
        let _op = self.lock_ops()?;
        let conn = self.connect(false)?;

        let mut stmt = conn.prepare("SELECT id, name, uri, username, password FROM credentials")?;
        let rows = stmt.query_map([], row_to_credential)?;

        let mut credentials = Vec::new();
        for row in rows {
            credentials.push(row?);
        }

        tracing::debug!(store = %self.name, count = credentials.len(), "listed credentials");
        Ok(credentials)
    }

    /// The credential with the given id, if present.
    pub fn lookup_credential(&self, id: i32) -> Result<Option<Credential>> {
        let _op = self.lock_ops()?;
        let conn = self.connect(false)?;

        let credential = conn
            .query_row(
                "SELECT id, name, uri, username, password FROM credentials WHERE id = ?1",
                params![id],
                row_to_credential,
            )
            .optional()?;
        Ok(credential)
    }

    /// Every credential whose name exactly equals `name` (case-sensitive).
    pub fn lookup_credentials(&self, name: &str) -> Result<Vec<Credential>> {
        let _op = self.lock_ops()?;
        let conn = self.connect(false)?;

        let mut stmt = conn.prepare(
            "SELECT id, name, uri, username, password FROM credentials WHERE name = ?1",
        )?;
        let rows = stmt.query_map(params![name], row_to_credential)?;

        let mut credentials = Vec::new();
        for row in rows {
            credentials.push(row?);
        }
        Ok(credentials)
    }

    /// Insert a new credential keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError::CredentialExists`] if a row with the same id
    /// is already present.
    pub fn add_credential(&self, credential: &Credential) -> Result<()> {
        let _op = self.lock_ops()?;
        let conn = self.connect(false)?;

        let result = conn.execute(
            "INSERT INTO credentials (id, name, uri, username, password)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                credential.id(),
                credential.name,
                uri_text(credential),
                credential.username,
                credential.password,
            ],
        );

        match result {
            Ok(_) => {
                tracing::info!(store = %self.name, id = credential.id(), "added credential");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(KeyringError::CredentialExists {
                    id: credential.id(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the row matching `credential`'s id with its other fields.
    ///
    /// Returns `false` (a no-op) when no row has that id.
    pub fn update_credential(&self, credential: &Credential) -> Result<bool> {
        let _op = self.lock_ops()?;
        let conn = self.connect(false)?;

        let rows = conn.execute(
            "UPDATE credentials SET name = ?1, uri = ?2, username = ?3, password = ?4
             WHERE id = ?5",
            params![
                credential.name,
                uri_text(credential),
                credential.username,
                credential.password,
                credential.id(),
            ],
        )?;

        if rows > 0 {
            tracing::info!(store = %self.name, id = credential.id(), "updated credential");
        }
        Ok(rows > 0)
    }

    /// Remove the row with the given id; returns whether a row was removed.
    pub fn delete_credential(&self, id: i32) -> Result<bool> {
        let _op = self.lock_ops()?;
        let conn = self.connect(false)?;

        let rows = conn.execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::info!(store = %self.name, id, "deleted credential");
        }
        Ok(rows > 0)
    }

    // -- Internal helpers ---------------------------------------------------

    fn lock_ops(&self) -> Result<MutexGuard<'_, ()>> {
        self.op_lock
            .lock()
            .map_err(|_| KeyringError::Internal("store operation lock poisoned".into()))
    }

    /// Open the keyed database and make sure the schema exists.
    fn initialize(&self, create: bool) -> Result<()> {
        let conn = self.connect(create)?;
        conn.execute_batch(CREATE_CREDENTIALS_TABLE)?;
        Ok(())
    }

    /// Open a connection for one operation and apply the encryption key.
    ///
    /// The probe query is the first statement against the keyed file; it is
    /// what fails when the key is wrong or the file is not a valid store.
    fn connect(&self, create: bool) -> Result<Connection> {
        let flags = if create {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };

        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.pragma_update(None, "key", &self.passphrase)?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(conn)
    }
}

/// An absent URI is written as the empty string.
fn uri_text(credential: &Credential) -> &str {
    credential.uri.as_ref().map(Url::as_str).unwrap_or("")
}

fn row_to_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<Credential> {
    let id: i32 = row.get(0)?;
    let name: String = row.get(1)?;
    let uri: Option<String> = row.get(2)?;
    let username: Option<String> = row.get(3)?;
    let password: Option<String> = row.get(4)?;

    Ok(Credential::with_id(
        id,
        name,
        parse_uri(uri),
        username.unwrap_or_default(),
        password.unwrap_or_default(),
    ))
}

/// An empty or NULL stored string reads back as "no URI"; anything that no
/// longer parses does too, rather than failing the whole row.
fn parse_uri(stored: Option<String>) -> Option<Url> {
    stored
        .filter(|s| !s.is_empty())
        .and_then(|s| Url::parse(&s).ok())
}

fn validate_name_and_password(name: &str, password: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeyringError::InvalidArgument {
            reason: "the store name must not be empty".into(),
        });
    }
    if password.is_empty() {
        return Err(KeyringError::InvalidArgument {
            reason: "the store password must not be empty".into(),
        });
    }
    Ok(())
}
