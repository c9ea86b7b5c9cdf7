//! Integration tests for the latchkey crate.
//!
//! These exercise the public name-based API, which resolves store files
//! under the real user configuration directory. Every test uses a unique
//! store name and destroys it on the way out. Flows that need a live D-Bus
//! Secret Service are ignored by default.

use latchkey::{Credential, Keyring, KeyringError, Store};
use url::Url;

/// A store name no other test (or test run) will collide with.
fn unique_name(tag: &str) -> String {
    format!("org.latchkey.itest.{tag}.{}", std::process::id())
}

// ═══════════════════════════════════════════════════════════════════════
//  Store lifecycle by name
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn store_lifecycle_on_disk() {
    let name = unique_name("store-lifecycle");
    assert!(!Store::exists(&name));

    let store = Store::create(&name, "pw-123", false).unwrap();
    assert!(Store::exists(&name));

    let credential = Credential::new(
        "forge",
        Some(Url::parse("https://forge.example.com").unwrap()),
        "builder",
        "s3cret",
    );
    store.add_credential(&credential).unwrap();
    drop(store);

    // Reload with the right passphrase and read everything back.
    let store = Store::load(&name, "pw-123").unwrap();
    let back = store.lookup_credential(credential.id()).unwrap().unwrap();
    assert_eq!(back, credential);
    assert_eq!(back.uri, credential.uri);
    assert_eq!(back.password, "s3cret");
    drop(store);

    // The wrong passphrase must never yield readable data.
    assert!(matches!(
        Store::load(&name, "pw-456"),
        Err(KeyringError::AccessDenied { .. })
    ));

    assert!(Store::destroy_named(&name).unwrap());
    assert!(!Store::exists(&name));
}

#[test]
fn create_collision_leaves_the_original_untouched() {
    let name = unique_name("store-collision");

    let store = Store::create(&name, "first-pw", false).unwrap();
    store
        .add_credential(&Credential::new("entry", None, "user", "pw"))
        .unwrap();
    drop(store);

    assert!(matches!(
        Store::create(&name, "second-pw", false),
        Err(KeyringError::StoreExists { .. })
    ));

    let store = Store::load(&name, "first-pw").unwrap();
    assert_eq!(store.get_all_credentials().unwrap().len(), 1);
    assert!(store.destroy());
}

// ═══════════════════════════════════════════════════════════════════════
//  Keyring with an explicit passphrase
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn keyring_roundtrip_with_explicit_password() {
    let name = unique_name("keyring-explicit");

    let keyring = Keyring::access(&name, Some("chosen-pw")).await.unwrap();
    assert_eq!(keyring.name(), name);

    let mut credential = Credential::new("mail", None, "user@example.com", "old");
    keyring.add_credential(&credential).unwrap();

    credential.password = "new".into();
    assert!(keyring.update_credential(&credential).unwrap());

    let found = keyring.lookup_credentials("mail").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].password, "new");
    drop(keyring);

    // Same passphrase reopens the same data; a wrong one opens nothing.
    let keyring = Keyring::access(&name, Some("chosen-pw")).await.unwrap();
    assert_eq!(keyring.get_all_credentials().unwrap().len(), 1);
    drop(keyring);

    assert!(Keyring::access(&name, Some("not-the-pw")).await.is_none());

    assert!(Store::destroy_named(&name).unwrap());
}

#[tokio::test]
async fn destroyed_keyring_leaves_nothing_behind() {
    let name = unique_name("keyring-destroy");

    let keyring = Keyring::access(&name, Some("pw")).await.unwrap();
    let credential = Credential::new("ephemeral", None, "user", "pw");
    keyring.add_credential(&credential).unwrap();

    assert!(keyring.destroy().await);
    assert!(!Keyring::exists(&name));

    // Re-accessing is a fresh creation with no memory of the old contents.
    let keyring = Keyring::access(&name, Some("pw")).await.unwrap();
    assert_eq!(keyring.lookup_credential(credential.id()).unwrap(), None);
    assert!(keyring.destroy().await);
}

// ═══════════════════════════════════════════════════════════════════════
//  Keyring through the system vault
// ═══════════════════════════════════════════════════════════════════════

/// Full orchestration against the real OS secret facility: first access
/// mints and parks a passphrase, second access reuses it. Needs an
/// unlocked session keyring, so it runs with --ignored.
#[tokio::test]
#[ignore = "requires a live native secret service"]
async fn keyring_roundtrip_through_system_vault() {
    let name = unique_name("keyring-vault");

    let keyring = Keyring::access(&name, None).await.unwrap();
    let credential = Credential::new("mail", None, "user", "pw");
    keyring.add_credential(&credential).unwrap();
    drop(keyring);

    let keyring = Keyring::access(&name, None).await.unwrap();
    assert_eq!(
        keyring
            .lookup_credential(credential.id())
            .unwrap()
            .unwrap()
            .password,
        "pw"
    );

    assert!(keyring.destroy().await);
    assert!(!Keyring::exists(&name));
}
