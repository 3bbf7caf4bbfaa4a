//! # Authplex Core
//!
//! `authplex-core` defines the contract every identity provider implements and
//! the data that flows through a login: the signed [`State`] carried across the
//! provider redirect, the [`Credentials`] obtained along the way and the
//! normalized [`User`] produced at the end.
//!
//! ## Key Components
//!
//! - **[`Provider`]**: one identity provider (GitHub, Google, ...).
//! - **[`State`]**: caller data signed with the process-wide [`SecurityKey`].
//! - **[`ProviderRegistry`]**: name to provider lookup.
//! - **[`TripperFactory`]**: the HTTP seam every outbound call goes through.

#![warn(missing_docs)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Errors that can occur during the authentication process.
pub mod error;
pub use error::{AuthError, TransportError};

/// Provider-specific authentication material.
pub mod credentials;
pub use credentials::{keys, Credentials};

/// Provider configuration keys and loading.
pub mod config;
pub use config::{ConfigKey, ProviderConfig};

/// Signed redirect state and the process-wide signing key.
pub mod state;
pub use state::{security_key, set_security_key, SecurityKey, State};

/// The normalized user returned by every provider.
pub mod user;
pub use user::{User, UserBuilder};

/// Process-wide and owned provider registries.
pub mod registry;
pub use registry::{provider, providers, register_provider, with_providers, ProviderRegistry};

/// HTTP transport abstraction.
pub mod transport;
pub use transport::{HttpTripper, HttpTripperFactory, Tripper, TripperFactory};

/// Trait implemented once per identity provider.
///
/// Providers keep no state between calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, used as the registry key and the
    /// [`User::provider_credentials`] key.
    fn name(&self) -> &str;

    /// Human readable name, e.g. for a login button.
    fn display_name(&self) -> &str {
        self.name()
    }

    /// Build the URL the user is redirected to in order to log in.
    ///
    /// `state` is encoded and signed into the `state` parameter. Entries of
    /// `options` are appended as extra query parameters. Performs no I/O.
    fn get_begin_auth_url(
        &self,
        state: Option<&State>,
        options: &HashMap<String, String>,
    ) -> Result<String, AuthError>;

    /// Turn the query parameters of the provider callback into credentials by
    /// exchanging the authorization code.
    async fn complete_auth(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Credentials, AuthError>;

    /// Fetch the user the credentials belong to.
    ///
    /// Credentials holding only a `code` are exchanged first. The returned
    /// user carries this provider's tokens and native id under [`Provider::name`].
    async fn get_user(&self, creds: &Credentials) -> Result<User, AuthError>;

    /// The factory used for outbound calls, created on first use if none was injected.
    fn tripper_factory(&self) -> Arc<dyn TripperFactory>;
}
