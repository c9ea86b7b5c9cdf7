//! The keyring façade.
//!
//! A [`Keyring`] wraps exactly one [`Store`] and reconciles its passphrase
//! with the system vault: [`Keyring::access`] either loads the existing
//! store, creates a fresh one under a known passphrase, or generates and
//! parks a brand-new passphrase before creating. Callers get back either an
//! open keyring or nothing — wrong passphrases, missing backends, and vault
//! hiccups all share the same remedy, so they all collapse to `None` here
//! (each cause is still logged).
//!
//! An open keyring is the only kind there is: destroying one consumes it,
//! and dropping one releases its resources, so credential calls on a dead
//! keyring cannot be written.

use std::path::Path;

use crate::credential::Credential;
use crate::error::{KeyringError, Result};
use crate::paths;
use crate::store::Store;
use crate::system_vault::{self, SystemVault};

/// An open, named, encrypted credential container.
pub struct Keyring {
    store: Store,
}

impl Keyring {
    // -- Lifecycle ----------------------------------------------------------

    /// Open the keyring `name`, creating it on first use.
    ///
    /// With `password` supplied, the system vault is never consulted and the
    /// store is loaded (or created) under that passphrase. Without one, the
    /// vault is asked for the saved passphrase; if it has none, a fresh
    /// random passphrase is generated and parked there before the store is
    /// created.
    ///
    /// Returns `None` when the keyring cannot be opened for any reason —
    /// wrong passphrase, corrupt store, unusable vault. Nothing is modified
    /// in that case.
    pub async fn access(name: &str, password: Option<&str>) -> Option<Self> {
        let dir = match paths::keyring_dir() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(name, error = %e, "keyring storage directory unavailable");
                return None;
            }
        };

        let vault = match system_vault::platform_vault() {
            Ok(vault) => Some(vault),
            Err(e) => {
                tracing::warn!(name, error = %e, "no system vault on this platform");
                None
            }
        };

        Self::access_in(&dir, vault.as_deref(), name, password).await
    }

    pub(crate) async fn access_in(
        dir: &Path,
        vault: Option<&dyn SystemVault>,
        name: &str,
        password: Option<&str>,
    ) -> Option<Self> {
        // A supplied empty password counts as "not supplied".
        let mut password = password.filter(|p| !p.is_empty()).map(str::to_owned);

        if password.is_none() {
            if let Some(vault) = vault {
                match system_vault::get_password_with(vault, name).await {
                    Ok(saved) => password = saved,
                    Err(e) => {
                        tracing::warn!(name, error = %e, "could not query the system vault for a saved passphrase");
                    }
                }
            }
        }

        if let Some(password) = password {
            return match Store::load_in(dir, name, &password) {
                Ok(store) => Some(Self { store }),
                Err(KeyringError::StoreNotFound { .. }) => {
                    // A passphrase is known but the file is gone: start fresh
                    // under the same passphrase.
                    match Store::create_in(dir, name, &password, false) {
                        Ok(store) => Some(Self { store }),
                        Err(e) => {
                            tracing::warn!(name, error = %e, "could not create keyring store");
                            None
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(name, error = %e, "could not open keyring store");
                    None
                }
            };
        }

        // No passphrase anywhere: mint one, park it, create the store.
        let vault = match vault {
            Some(vault) => vault,
            None => {
                tracing::warn!(name, "no passphrase supplied and no system vault available");
                return None;
            }
        };

        let password = match system_vault::set_password_with(vault, name).await {
            Ok(password) => password,
            Err(e) => {
                tracing::warn!(name, error = %e, "could not park a fresh passphrase in the system vault");
                return None;
            }
        };

        match Store::create_in(dir, name, &password, false) {
            Ok(store) => Some(Self { store }),
            Err(e) => {
                tracing::warn!(name, error = %e, "could not create keyring store");
                None
            }
        }
    }

    /// Whether a keyring named `name` exists on disk.
    pub fn exists(name: &str) -> bool {
        Store::exists(name)
    }

    /// Destroy the keyring `name` without opening it: the saved passphrase
    /// is removed best-effort, then the store file is deleted.
    ///
    /// Returns whether a store file was deleted.
    pub async fn destroy_named(name: &str) -> Result<bool> {
        if let Err(e) = system_vault::delete_password(name).await {
            tracing::warn!(name, error = %e, "failed to remove the saved passphrase from the system vault");
        }
        Store::destroy_named(name)
    }

    /// The name of this keyring.
    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// Destroy this keyring and all its data.
    ///
    /// The store deletion is the operation of record: when it succeeds, the
    /// saved passphrase is also removed from the system vault, but a failure
    /// there is only logged. Returns whether the store file was destroyed.
    pub async fn destroy(self) -> bool {
        let vault = system_vault::platform_vault().ok();
        self.destroy_with(vault.as_deref()).await
    }

    pub(crate) async fn destroy_with(self, vault: Option<&dyn SystemVault>) -> bool {
        let name = self.store.name().to_owned();
        if !self.store.destroy() {
            return false;
        }
        if let Some(vault) = vault {
            if let Err(e) = system_vault::delete_password_with(vault, &name).await {
                tracing::warn!(name = %name, error = %e, "failed to remove the saved passphrase from the system vault");
            }
        }
        true
    }

    // -- Credential CRUD (forwarded to the store) ---------------------------

    /// Every credential in the keyring.
    pub fn get_all_credentials(&self) -> Result<Vec<Credential>> {
        self.store.get_all_credentials()
    }

    /// The credential with the given id, if present.
    pub fn lookup_credential(&self, id: i32) -> Result<Option<Credential>> {
        self.store.lookup_credential(id)
    }

    /// Every credential whose name exactly equals `name`.
    pub fn lookup_credentials(&self, name: &str) -> Result<Vec<Credential>> {
        self.store.lookup_credentials(name)
    }

    /// Add a credential to the keyring.
    pub fn add_credential(&self, credential: &Credential) -> Result<()> {
        self.store.add_credential(credential)
    }

    /// Update a credential already in the keyring; `false` if its id is
    /// unknown.
    pub fn update_credential(&self, credential: &Credential) -> Result<bool> {
        self.store.update_credential(credential)
    }

    /// Remove the credential with the given id; `false` if none was there.
    pub fn delete_credential(&self, id: i32) -> Result<bool> {
        self.store.delete_credential(id)
    }
}
