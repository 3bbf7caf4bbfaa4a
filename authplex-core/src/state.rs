use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use log::warn;
use rand::RngCore;
use serde_json::Value;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

type HmacSha256 = Hmac<Sha256>;

/// Key under which the post-login redirect target is conventionally stored.
pub const AFTER_KEY: &str = "after";

const SEPARATOR: char = '.';

static SECURITY_KEY: RwLock<Option<SecurityKey>> = RwLock::new(None);

/// Secret used to sign [`State`] payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityKey(Vec<u8>);

impl SecurityKey {
    /// Wrap existing key material.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self(key.as_ref().to_vec())
    }

    /// Generate a random 32-byte key.
    ///
    /// States signed with a generated key do not survive a process restart.
    pub fn generate() -> Self {
        let mut key = vec![0u8; 32];
        rand::rng().fill_bytes(&mut key);
        Self(key)
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        if self.0.is_empty() {
            return Err(AuthError::Configuration("security key is empty".into()));
        }
        HmacSha256::new_from_slice(&self.0)
            .map_err(|e| AuthError::Configuration(format!("unusable security key: {e}")))
    }
}

impl AsRef<[u8]> for SecurityKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecurityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityKey(..)")
    }
}

/// Set the process-wide key used by [`State::encode`] and [`State::decode`].
///
/// Calling this again rotates the key: every state issued under the previous
/// key fails verification from now on.
pub fn set_security_key(key: impl AsRef<[u8]>) {
    let mut guard = SECURITY_KEY.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(SecurityKey::new(key));
}

/// The current process-wide key, if one was set.
pub fn security_key() -> Option<SecurityKey> {
    SECURITY_KEY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn current_key() -> Result<SecurityKey, AuthError> {
    security_key().ok_or_else(|| AuthError::Configuration("security key has not been set".into()))
}

/// Caller data carried through the provider redirect, signed so it comes back unaltered.
///
/// The wire form is `base64url(json) "." base64url(hmac_sha256(json))`. Keys
/// are kept sorted so the same data always produces the same bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    data: BTreeMap<String, Value>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a state carrying only the post-login redirect target.
    pub fn after(url: impl Into<String>) -> Self {
        Self::new().with(AFTER_KEY, url.into())
    }

    /// Return the state with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value stored under `key`; `None` for absent or non-string values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// The post-login redirect target, if any.
    pub fn after_url(&self) -> Option<&str> {
        self.get_str(AFTER_KEY)
    }

    /// All carried data.
    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Encode and sign with the process-wide key.
    pub fn encode(&self) -> Result<String, AuthError> {
        self.encode_with(&current_key()?)
    }

    /// Encode and sign with an explicit key.
    pub fn encode_with(&self, key: &SecurityKey) -> Result<String, AuthError> {
        let payload = serde_json::to_vec(&self.data)
            .map_err(|e| AuthError::MalformedState(format!("unserializable state: {e}")))?;
        let mut mac = key.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}{SEPARATOR}{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify and decode with the process-wide key.
    pub fn decode(encoded: &str) -> Result<Self, AuthError> {
        Self::decode_with(&current_key()?, encoded)
    }

    /// Verify and decode with an explicit key.
    ///
    /// The signature is checked before the payload is parsed, so nothing from
    /// a forged state is ever interpreted.
    pub fn decode_with(key: &SecurityKey, encoded: &str) -> Result<Self, AuthError> {
        let result = Self::verify(key, encoded);
        if let Err(e) = &result {
            if e.is_tampering() {
                warn!("Rejected OAuth state, possible tampering: {e}");
            }
        }
        result
    }

    fn verify(key: &SecurityKey, encoded: &str) -> Result<Self, AuthError> {
        let (payload_part, signature_part) = encoded
            .split_once(SEPARATOR)
            .ok_or_else(|| AuthError::MalformedState("missing signature".into()))?;
        if signature_part.contains(SEPARATOR) {
            return Err(AuthError::MalformedState("unexpected separator".into()));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| AuthError::MalformedState(format!("payload: {e}")))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_part)
            .map_err(|e| AuthError::MalformedState(format!("signature: {e}")))?;

        let mut mac = key.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidStateSignature)?;

        let data = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::MalformedState(format!("payload is not a JSON object: {e}")))?;
        Ok(Self { data })
    }
}
