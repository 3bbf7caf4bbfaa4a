//! # Authplex Flow
//!
//! `authplex-flow` holds the OAuth2 authorization-code plumbing shared by all
//! provider adapters, and the pieces an application uses to drive a login.
//!
//! ## Key Components
//!
//! - **[`OAuth2Client`]**: authorization URL construction, code exchange and
//!   authenticated profile fetches for one provider configuration.
//! - **[`OAuth2Flow`]**: verifies the returned state, then exchanges the code
//!   and fetches the user.
//! - **[`Authplex`]**: the set of configured providers, built with [`AuthplexBuilder`].

#![warn(missing_docs)]

use authplex_core::{AuthError, Provider, ProviderRegistry, State, User};
use std::collections::HashMap;
use std::sync::Arc;

pub use authplex_core;

/// Shared OAuth2 client used by provider adapters.
pub mod client;
/// OAuth2 Authorization Code flow implementation.
pub mod oauth2;

pub use client::{
    scalar, OAuth2Client, ACCESS_TYPE_ONLINE, APPROVAL_PROMPT_AUTO, GRANT_TYPE_AUTHORIZATION_CODE,
    RESERVED_PARAMS, RESPONSE_TYPE_CODE,
};
pub use oauth2::OAuth2Flow;

/// The unified Authplex service.
#[derive(Clone)]
pub struct Authplex {
    registry: Arc<ProviderRegistry>,
}

impl Authplex {
    /// Create a new [`AuthplexBuilder`] to configure the service.
    pub fn builder() -> AuthplexBuilder {
        AuthplexBuilder::default()
    }

    /// Wrap an existing registry.
    pub fn from_registry(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// The registry backing this service.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// The login flow for the provider called `name`.
    pub fn flow(&self, name: &str) -> Result<OAuth2Flow, AuthError> {
        self.registry.get(name).map(OAuth2Flow::new)
    }

    /// Authorization URL for the provider called `name`.
    pub fn login_url(
        &self,
        name: &str,
        state: &State,
        options: &HashMap<String, String>,
    ) -> Result<String, AuthError> {
        self.flow(name)?.initiate_login(state, options)
    }

    /// Complete a login on the provider called `name` from its callback parameters.
    pub async fn finalize_login(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<(User, State), AuthError> {
        self.flow(name)?.finalize_login(params).await
    }
}

/// A builder for configuring and creating an [`Authplex`] instance.
#[derive(Default)]
pub struct AuthplexBuilder {
    providers: Vec<Arc<dyn Provider>>,
}

impl AuthplexBuilder {
    /// Register a provider.
    pub fn provider<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Build the [`Authplex`] instance.
    pub fn build(self) -> Authplex {
        let registry = ProviderRegistry::new();
        for provider in self.providers {
            registry.register(provider);
        }
        Authplex {
            registry: Arc::new(registry),
        }
    }
}
