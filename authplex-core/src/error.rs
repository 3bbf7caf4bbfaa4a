use thiserror::Error;

/// Error produced by an HTTP round-trip, passed through untouched.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while authenticating a user through a provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Provider configuration is missing or invalid. Not worth retrying.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The state carried through the redirect was signed with a different key or was altered.
    #[error("Invalid state signature")]
    InvalidStateSignature,
    /// The state could not be split, decoded or parsed.
    #[error("Malformed state: {0}")]
    MalformedState(String),
    /// No provider is registered under the requested name.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    /// The provider rejected the code or token.
    #[error("Authentication exchange failed: {message}")]
    AuthExchangeFailed {
        /// HTTP status reported by the provider, when the failure came from an HTTP call.
        status: Option<u16>,
        /// Provider supplied description, or the raw body.
        message: String,
    },
    /// The provider answered with a body that does not match its API contract.
    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),
    /// The application id assigned to a user collides with a provider-native id.
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
    /// Network, DNS or TLS failure from the underlying transport.
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),
}

impl AuthError {
    /// Whether this error indicates a forged or corrupted state.
    pub fn is_tampering(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidStateSignature | AuthError::MalformedState(_)
        )
    }

    pub(crate) fn missing_config(key: &str) -> Self {
        AuthError::Configuration(format!("missing required key {key}"))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Transport(Box::new(err))
    }
}
