use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Well known credential keys.
pub mod keys {
    /// Authorization code returned on the redirect back from the provider.
    pub const CODE: &str = "code";
    /// Access token obtained from the token exchange.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token, when the provider issues one.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Token type, usually `bearer`.
    pub const TOKEN_TYPE: &str = "token_type";
    /// Lifetime of the access token in seconds.
    pub const EXPIRES_IN: &str = "expires_in";
    /// The provider-issued id of the user.
    pub const ID: &str = "id";
}

/// A bag of provider-specific authentication material.
///
/// Values are never changed in place once handed out; [`Credentials::with`]
/// consumes the bag and returns a derived copy.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(HashMap<String, String>);

impl Credentials {
    /// Create an empty set of credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credentials holding only the authorization code received on the callback.
    pub fn from_code(code: impl Into<String>) -> Self {
        Self::new().with(keys::CODE, code)
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The authorization code, if present.
    pub fn code(&self) -> Option<&str> {
        self.get(keys::CODE)
    }

    /// The access token, if an exchange already happened.
    pub fn access_token(&self) -> Option<&str> {
        self.get(keys::ACCESS_TOKEN)
    }

    /// The provider-native user id.
    pub fn id(&self) -> Option<&str> {
        self.get(keys::ID)
    }

    /// Iterate over the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Credentials").field("keys", &keys).finish()
    }
}
