//! Keyring error types.
//!
//! Every public API in this crate surfaces failures through [`KeyringError`].
//! The store layer reports precise variants so callers can tell a missing
//! file from a wrong passphrase; the [`Keyring`](crate::keyring::Keyring)
//! façade deliberately collapses most of them into "no keyring for you".

/// Unified error type for the latchkey crate.
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    /// An empty name or passphrase was supplied where one is required.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Store creation targeted an existing file without overwrite permission.
    #[error("a store named `{name}` already exists")]
    StoreExists { name: String },

    /// Store load targeted a file that does not exist.
    #[error("no store named `{name}` was found")]
    StoreNotFound { name: String },

    /// The store file could not be opened — wrong passphrase or corrupt file.
    /// The two are indistinguishable: there is no integrity check beyond the
    /// encrypted database failing to read.
    #[error("unable to access the store: {reason}")]
    AccessDenied { reason: String },

    /// A credential with this id is already present in the store.
    #[error("a credential with id {id} already exists")]
    CredentialExists { id: i32 },

    /// No native secret-service backend is implemented for this platform.
    #[error("no system credential backend for this platform")]
    PlatformUnsupported,

    /// The native secret service is unreachable, locked, or errored.
    #[error("system secret service failure: {reason}")]
    SecretService { reason: String },

    /// SQLite error from `rusqlite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors that don't fit a specific
    /// variant.  Prefer a typed variant whenever possible.
    #[error("internal keyring error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeyringError>;
