//! Deterministic on-disk locations for keyring stores.
//!
//! Every store lives at `<config_dir>/latchkey/keyrings/<name>.lring`. The
//! base directory comes from the platform's configuration directory; the
//! custom extension keeps store files from colliding with anything a user
//! would open as a plain database.

use std::path::{Path, PathBuf};

use crate::error::{KeyringError, Result};

/// File extension identifying the encrypted store format.
pub const STORE_EXTENSION: &str = "lring";

/// The directory that holds every keyring store file.
pub fn keyring_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        KeyringError::Internal("could not resolve the user configuration directory".into())
    })?;
    Ok(base.join("latchkey").join("keyrings"))
}

/// Path of the store file for `name` inside `dir`.
pub fn store_path_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{STORE_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_path_uses_custom_extension() {
        let path = store_path_in(Path::new("/tmp/rings"), "org.example.app");
        assert_eq!(path, PathBuf::from("/tmp/rings/org.example.app.lring"));
    }

    #[test]
    fn keyring_dir_is_under_config() {
        // dirs::config_dir is None only on unsupported platforms.
        let dir = keyring_dir().unwrap();
        assert!(dir.ends_with("latchkey/keyrings"));
    }
}
