use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The fixed set of keys a provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// OAuth2 client id.
    ClientId,
    /// OAuth2 client secret.
    Secret,
    /// Callback URL registered with the provider.
    RedirectUrl,
    /// Requested scope.
    Scope,
    /// Authorization endpoint.
    AuthUrl,
    /// Token endpoint.
    TokenUrl,
}

impl ConfigKey {
    /// Every key, in a fixed order.
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::ClientId,
        ConfigKey::Secret,
        ConfigKey::RedirectUrl,
        ConfigKey::Scope,
        ConfigKey::AuthUrl,
        ConfigKey::TokenUrl,
    ];

    /// Canonical name, e.g. `ClientID`.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::ClientId => "ClientID",
            ConfigKey::Secret => "Secret",
            ConfigKey::RedirectUrl => "RedirectURL",
            ConfigKey::Scope => "Scope",
            ConfigKey::AuthUrl => "AuthURL",
            ConfigKey::TokenUrl => "TokenURL",
        }
    }

    fn env_suffix(self) -> &'static str {
        match self {
            ConfigKey::ClientId => "CLIENT_ID",
            ConfigKey::Secret => "SECRET",
            ConfigKey::RedirectUrl => "REDIRECT_URL",
            ConfigKey::Scope => "SCOPE",
            ConfigKey::AuthUrl => "AUTH_URL",
            ConfigKey::TokenUrl => "TOKEN_URL",
        }
    }

    /// Parse a key name. Case, `_` and `-` are ignored, so `ClientID`,
    /// `client_id` and `client-id` are the same key.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "clientid" => Some(ConfigKey::ClientId),
            "secret" | "clientsecret" => Some(ConfigKey::Secret),
            "redirecturl" | "redirecturi" => Some(ConfigKey::RedirectUrl),
            "scope" => Some(ConfigKey::Scope),
            "authurl" => Some(ConfigKey::AuthUrl),
            "tokenurl" => Some(ConfigKey::TokenUrl),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration owned by a single provider.
///
/// Unrecognized keys are dropped when loading. Missing required keys are only
/// reported when an operation needs them.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct ProviderConfig {
    values: HashMap<ConfigKey, String>,
}

impl ProviderConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual trio every provider constructor takes.
    pub fn client(
        client_id: impl Into<String>,
        secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self::new()
            .with(ConfigKey::ClientId, client_id)
            .with(ConfigKey::Secret, secret)
            .with(ConfigKey::RedirectUrl, redirect_url)
    }

    /// Build from arbitrary name/value pairs, ignoring unknown names.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let values = pairs
            .into_iter()
            .filter_map(|(k, v)| ConfigKey::parse(k.as_ref()).map(|key| (key, v.into())))
            .collect();
        Self { values }
    }

    /// Read `<PREFIX>_CLIENT_ID`, `<PREFIX>_SECRET`, `<PREFIX>_REDIRECT_URL`,
    /// `<PREFIX>_SCOPE`, `<PREFIX>_AUTH_URL` and `<PREFIX>_TOKEN_URL`.
    pub fn from_env(prefix: &str) -> Self {
        let values = ConfigKey::ALL
            .iter()
            .filter_map(|key| {
                std::env::var(format!("{prefix}_{}", key.env_suffix()))
                    .ok()
                    .map(|v| (*key, v))
            })
            .collect();
        Self { values }
    }

    /// Return the configuration with `key` set to `value`.
    pub fn with(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    /// Fill `key` with `value` only when it is not configured yet.
    pub fn with_default(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.values.entry(key).or_insert_with(|| value.into());
        self
    }

    /// Value for `key`, if configured.
    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Value for `key`, or a [`AuthError::Configuration`] error when it is absent or empty.
    pub fn require(&self, key: ConfigKey) -> Result<&str, AuthError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(AuthError::missing_config(key.as_str())),
        }
    }
}

impl From<HashMap<String, String>> for ProviderConfig {
    fn from(map: HashMap<String, String>) -> Self {
        Self::from_pairs(map)
    }
}

impl From<ProviderConfig> for HashMap<String, String> {
    fn from(config: ProviderConfig) -> Self {
        config
            .values
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in ConfigKey::ALL {
            if let Some(value) = self.get(key) {
                if key == ConfigKey::Secret {
                    map.entry(&key.as_str(), &"<redacted>");
                } else {
                    map.entry(&key.as_str(), &value);
                }
            }
        }
        map.finish()
    }
}
