//! Encrypted desktop keyring for application credentials.
//!
//! This crate stores structured secrets (name / URI / username / password
//! records) in per-application SQLCipher-encrypted store files, and parks
//! each store's passphrase in the operating system's native secret facility
//! so users are never prompted for it.
//!
//! # Modules
//!
//! - [`keyring`] — the [`Keyring`] façade: open-or-create by name, CRUD.
//! - [`store`] — the encrypted on-disk [`Store`] underneath a keyring.
//! - [`credential`] — the [`Credential`] value type.
//! - [`system_vault`] — platform secret-service backends for passphrases.
//! - [`password`] — cryptographically random password generation.
//! - [`paths`] — deterministic store file locations.
//! - [`error`] — unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use latchkey::{Credential, Keyring};
//!
//! # async fn example() -> latchkey::Result<()> {
//! // Open this application's keyring, creating it on first use. The store
//! // passphrase is fetched from (or minted into) the OS secret service.
//! let Some(keyring) = Keyring::access("org.example.app", None).await else {
//!     return Ok(()); // no usable keyring on this system
//! };
//!
//! keyring.add_credential(&Credential::new(
//!     "mail",
//!     None,
//!     "user@example.com",
//!     "hunter2",
//! ))?;
//!
//! for credential in keyring.get_all_credentials()? {
//!     println!("{} ({})", credential.name, credential.username);
//! }
//! # Ok(())
//! # }
//! ```

pub mod credential;
pub mod error;
pub mod keyring;
pub mod password;
pub mod paths;
pub mod store;
pub mod system_vault;

// Re-export the most commonly used types at the crate root for convenience.
pub use credential::Credential;
pub use error::{KeyringError, Result};
pub use keyring::Keyring;
pub use password::{PasswordContent, PasswordGenerator};
pub use store::Store;
pub use system_vault::SystemVault;
