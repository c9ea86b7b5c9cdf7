//! Native secret-service integration for store passphrases.
//!
//! A store's passphrase must survive restarts without the user re-entering
//! it, so it is parked in the operating system's secret facility, keyed by
//! the keyring name. This module abstracts over the platform backends:
//!
//! - **Windows**: Credential Manager generic credentials via `wincred`.
//! - **Linux**: the D-Bus Secret Service (GNOME Keyring / KWallet) via the
//!   `secret-service` crate.
//! - **Anything else**: [`platform_vault`] fails fast with
//!   [`KeyringError::PlatformUnsupported`] rather than degrading silently.
//!
//! Only store passphrases travel through here — credentials themselves never
//! leave the encrypted store file.

use async_trait::async_trait;

use crate::error::Result;
use crate::password::{DEFAULT_PASSWORD_LENGTH, PasswordGenerator};

#[cfg(not(any(windows, target_os = "linux")))]
use crate::error::KeyringError;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over a platform-native secret vault.
///
/// Implementations must be `Send + Sync`; calls may suspend, since some
/// backends talk to a session service over IPC.
#[async_trait]
pub trait SystemVault: Send + Sync {
    /// The secret stored under `name`, or `None` if none has been stored.
    ///
    /// "Never stored" is not an error; only platform-level failures are.
    async fn get_secret(&self, name: &str) -> Result<Option<String>>;

    /// Store (or overwrite) the secret for `name`.
    async fn store_secret(&self, name: &str, secret: &str) -> Result<()>;

    /// Remove any secret stored under `name`; a no-op if absent.
    async fn delete_secret(&self, name: &str) -> Result<()>;
}

/// The native vault for the current platform.
///
/// # Errors
///
/// Returns [`KeyringError::PlatformUnsupported`] where no backend exists.
pub fn platform_vault() -> Result<Box<dyn SystemVault>> {
    #[cfg(windows)]
    {
        Ok(Box::new(WindowsCredentialVault))
    }
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(SecretServiceVault))
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Err(KeyringError::PlatformUnsupported)
    }
}

// ---------------------------------------------------------------------------
// Password-level API
// ---------------------------------------------------------------------------

/// The saved passphrase for the keyring `name`, or `None` if none is saved.
///
/// An empty stored secret counts as "no passphrase": stores written by the
/// delete-by-blanking convention of some desktop services read back as
/// absent.
pub async fn get_password(name: &str) -> Result<Option<String>> {
    get_password_with(platform_vault()?.as_ref(), name).await
}

pub(crate) async fn get_password_with(
    vault: &dyn SystemVault,
    name: &str,
) -> Result<Option<String>> {
    let secret = vault.get_secret(name).await?;
    Ok(secret.filter(|s| !s.is_empty()))
}

/// Generate a fresh random passphrase for the keyring `name`, park it in the
/// native vault, and return it.
pub async fn set_password(name: &str) -> Result<String> {
    set_password_with(platform_vault()?.as_ref(), name).await
}

pub(crate) async fn set_password_with(vault: &dyn SystemVault, name: &str) -> Result<String> {
    let password = PasswordGenerator::default().next(DEFAULT_PASSWORD_LENGTH)?;
    vault.store_secret(name, &password).await?;
    tracing::info!(name, "stored keyring passphrase in the system vault");
    Ok(password)
}

/// Remove the saved passphrase for the keyring `name`, if any.
pub async fn delete_password(name: &str) -> Result<()> {
    delete_password_with(platform_vault()?.as_ref(), name).await
}

pub(crate) async fn delete_password_with(vault: &dyn SystemVault, name: &str) -> Result<()> {
    vault.delete_secret(name).await?;
    tracing::info!(name, "deleted keyring passphrase from the system vault");
    Ok(())
}

// ---------------------------------------------------------------------------
// Windows Credential Manager
// ---------------------------------------------------------------------------

/// Windows Credential Manager backend.
///
/// Secrets are generic credentials whose target name is the keyring name,
/// persisted machine-local.
#[cfg(windows)]
pub struct WindowsCredentialVault;

#[cfg(windows)]
mod wincred {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;

    use winapi::um::errhandlingapi::GetLastError;
    use winapi::um::wincred::{
        CRED_PERSIST_LOCAL_MACHINE, CRED_TYPE_GENERIC, CREDENTIALW, CredDeleteW, CredFree,
        CredReadW, CredWriteW, PCREDENTIALW,
    };

    use crate::error::{KeyringError, Result};

    /// Marker recorded in the credential's user-name field.
    const VAULT_USER: &str = "Latchkey";

    /// Win32 `ERROR_NOT_FOUND`.
    const ERROR_NOT_FOUND: u32 = 1168;

    fn to_wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(Some(0)).collect()
    }

    pub fn read(name: &str) -> Result<Option<String>> {
        let target = to_wide(name);
        unsafe {
            let mut handle: PCREDENTIALW = ptr::null_mut();
            if CredReadW(target.as_ptr(), CRED_TYPE_GENERIC, 0, &mut handle) == 0 {
                let code = GetLastError();
                if code == ERROR_NOT_FOUND {
                    return Ok(None);
                }
                return Err(KeyringError::SecretService {
                    reason: format!("CredReadW failed with error {code}"),
                });
            }

            let credential = &*handle;
            let blob = std::slice::from_raw_parts(
                credential.CredentialBlob,
                credential.CredentialBlobSize as usize,
            );
            let secret = String::from_utf8_lossy(blob).into_owned();
            CredFree(handle as *mut _);
            Ok(Some(secret))
        }
    }

    pub fn write(name: &str, secret: &str) -> Result<()> {
        let target = to_wide(name);
        let user = to_wide(VAULT_USER);
        let blob = secret.as_bytes();

        unsafe {
            let mut credential = CREDENTIALW {
                Flags: 0,
                Type: CRED_TYPE_GENERIC,
                TargetName: target.as_ptr() as *mut _,
                Comment: ptr::null_mut(),
                LastWritten: std::mem::zeroed(),
                CredentialBlobSize: blob.len() as u32,
                CredentialBlob: blob.as_ptr() as *mut _,
                Persist: CRED_PERSIST_LOCAL_MACHINE,
                AttributeCount: 0,
                Attributes: ptr::null_mut(),
                TargetAlias: ptr::null_mut(),
                UserName: user.as_ptr() as *mut _,
            };

            if CredWriteW(&mut credential, 0) == 0 {
                return Err(KeyringError::SecretService {
                    reason: format!("CredWriteW failed with error {}", GetLastError()),
                });
            }
        }
        Ok(())
    }

    pub fn delete(name: &str) -> Result<()> {
        let target = to_wide(name);
        unsafe {
            if CredDeleteW(target.as_ptr(), CRED_TYPE_GENERIC, 0) == 0 {
                let code = GetLastError();
                if code != ERROR_NOT_FOUND {
                    return Err(KeyringError::SecretService {
                        reason: format!("CredDeleteW failed with error {code}"),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(windows)]
#[async_trait]
impl SystemVault for WindowsCredentialVault {
    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        wincred::read(name)
    }

    async fn store_secret(&self, name: &str, secret: &str) -> Result<()> {
        wincred::write(name, secret)
    }

    async fn delete_secret(&self, name: &str) -> Result<()> {
        wincred::delete(name)
    }
}

// ---------------------------------------------------------------------------
// Linux Secret Service
// ---------------------------------------------------------------------------

/// D-Bus Secret Service backend.
///
/// Items live in the default collection (created when missing) and are keyed
/// by an `application` attribute equal to the lowercased keyring name. The
/// session connection is process-wide: established once on first use and
/// reused for the lifetime of the process.
#[cfg(target_os = "linux")]
pub struct SecretServiceVault;

#[cfg(target_os = "linux")]
mod dbus {
    use secret_service::{Collection, EncryptionType, SecretService};
    use tokio::sync::OnceCell;

    use crate::error::{KeyringError, Result};

    /// Content type recorded on stored secrets.
    pub const SECRET_CONTENT_TYPE: &str = "text/plain; charset=utf8";

    static SERVICE: OnceCell<SecretService<'static>> = OnceCell::const_new();

    pub fn service_error(e: secret_service::Error) -> KeyringError {
        KeyringError::SecretService {
            reason: e.to_string(),
        }
    }

    async fn service() -> Result<&'static SecretService<'static>> {
        SERVICE
            .get_or_try_init(|| async {
                tracing::debug!("connecting to the D-Bus secret service");
                SecretService::connect(EncryptionType::Dh)
                    .await
                    .map_err(service_error)
            })
            .await
    }

    /// The default collection, created and unlocked as needed.
    pub async fn unlocked_collection() -> Result<Collection<'static>> {
        let service = service().await?;
        let collection = match service.get_default_collection().await {
            Ok(collection) => collection,
            Err(secret_service::Error::NoResult) => service
                .create_collection("Default keyring", "default")
                .await
                .map_err(service_error)?,
            Err(e) => return Err(service_error(e)),
        };
        collection.unlock().await.map_err(service_error)?;
        Ok(collection)
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl SystemVault for SecretServiceVault {
    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        use std::collections::HashMap;

        let collection = dbus::unlocked_collection().await?;
        let application = name.to_lowercase();
        let items = collection
            .search_items(HashMap::from([("application", application.as_str())]))
            .await
            .map_err(dbus::service_error)?;

        match items.first() {
            Some(item) => {
                let secret = item.get_secret().await.map_err(dbus::service_error)?;
                Ok(Some(String::from_utf8_lossy(&secret).into_owned()))
            }
            None => Ok(None),
        }
    }

    async fn store_secret(&self, name: &str, secret: &str) -> Result<()> {
        use std::collections::HashMap;

        let collection = dbus::unlocked_collection().await?;
        let application = name.to_lowercase();
        let attributes = HashMap::from([("application", application.as_str())]);

        let items = collection
            .search_items(attributes.clone())
            .await
            .map_err(dbus::service_error)?;

        if let Some(item) = items.first() {
            item.set_secret(secret.as_bytes(), dbus::SECRET_CONTENT_TYPE)
                .await
                .map_err(dbus::service_error)?;
        } else {
            collection
                .create_item(
                    name,
                    attributes,
                    secret.as_bytes(),
                    false,
                    dbus::SECRET_CONTENT_TYPE,
                )
                .await
                .map_err(dbus::service_error)?;
        }
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<()> {
        use std::collections::HashMap;

        let collection = dbus::unlocked_collection().await?;
        let application = name.to_lowercase();
        let items = collection
            .search_items(HashMap::from([("application", application.as_str())]))
            .await
            .map_err(dbus::service_error)?;

        for item in items {
            item.delete().await.map_err(dbus::service_error)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
