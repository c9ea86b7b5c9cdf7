//! The credential value type.

use std::cmp::Ordering;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// One secret record held in a keyring.
///
/// Identity is the 32-bit `id`, assigned once at construction and never
/// reassigned; equality, ordering, and hashing consider nothing else. Two
/// credentials with equal ids are the same credential even when every other
/// field differs.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    id: i32,
    /// Display label. Not unique within a store.
    pub name: String,
    /// The site or service this credential belongs to.
    pub uri: Option<Url>,
    /// May be empty.
    pub username: String,
    /// The secret payload. May be empty.
    pub password: String,
}

impl Credential {
    /// Construct a credential with a fresh identity.
    pub fn new(
        name: impl Into<String>,
        uri: Option<Url>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            uri,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Rebuild a credential from a stored row, keeping its persisted id.
    pub(crate) fn with_id(
        id: i32,
        name: String,
        uri: Option<Url>,
        username: String,
        password: String,
    ) -> Self {
        Self {
            id,
            name,
            uri,
            username,
            password,
        }
    }

    /// The immutable identity of this credential.
    pub fn id(&self) -> i32 {
        self.id
    }
}

/// A 32-bit identity: the hash of a random UUID, truncated.
///
/// Collisions are possible in a 32-bit space; the store reports one as a
/// duplicate-id failure on insert rather than assuming global uniqueness.
fn fresh_id() -> i32 {
    let mut hasher = DefaultHasher::new();
    Uuid::new_v4().hash(&mut hasher);
    hasher.finish() as i32
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Credential {}

impl Hash for Credential {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Ord for Credential {
    /// Ordering is by id only — stable, but not a meaningful sort order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl PartialOrd for Credential {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_credentials_have_distinct_ids() {
        let a = Credential::new("mail", None, "user", "pw");
        let b = Credential::new("mail", None, "user", "pw");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn equality_ignores_everything_but_id() {
        let a = Credential::new("mail", None, "user", "pw");
        let mut b = a.clone();
        b.name = "renamed".into();
        b.username = "other".into();
        b.password = "changed".into();
        assert_eq!(a, b);
    }

    #[test]
    fn ordering_follows_id() {
        let a = Credential::with_id(1, "a".into(), None, String::new(), String::new());
        let b = Credential::with_id(2, "b".into(), None, String::new(), String::new());
        assert!(a < b);
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }

    #[test]
    fn debug_redacts_password() {
        let credential = Credential::new("mail", None, "user", "hunter2");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn serde_roundtrip_preserves_identity() {
        let uri = Url::parse("https://mail.example.com").unwrap();
        let credential = Credential::new("mail", Some(uri), "user", "pw");
        let json = serde_json::to_string(&credential).unwrap();
        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(credential, back);
        assert_eq!(credential.uri, back.uri);
    }
}
