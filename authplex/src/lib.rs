//! # Authplex
//!
//! Log users in through GitHub, Google, Facebook and other OAuth2 identity
//! providers behind one interface.
//!
//! ```no_run
//! use authplex::prelude::*;
//! use std::collections::HashMap;
//!
//! # async fn run(callback: HashMap<String, String>) -> Result<(), AuthError> {
//! set_security_key("a long random secret");
//!
//! let authplex = Authplex::builder()
//!     .provider(GithubProvider::new(
//!         "client-id".into(),
//!         "client-secret".into(),
//!         "http://localhost:3000/auth/github/callback".into(),
//!     ))
//!     .build();
//!
//! // Redirect the browser here.
//! let url = authplex.login_url("github", &State::after("/dashboard"), &HashMap::new())?;
//!
//! // Later, with the query parameters of the callback request:
//! let (user, state) = authplex.finalize_login("github", &callback).await?;
//! println!("{:?} logged in, continuing to {:?}", user.nickname(), state.after_url());
//! # Ok(())
//! # }
//! ```

pub use authplex_core as core;
pub use authplex_flow as flow;

pub use authplex_core::{
    keys, provider, providers, register_provider, set_security_key, with_providers, AuthError,
    ConfigKey, Credentials, HttpTripperFactory, Provider, ProviderConfig, ProviderRegistry,
    SecurityKey, State, Tripper, TripperFactory, User,
};
pub use authplex_flow::{Authplex, AuthplexBuilder, OAuth2Client, OAuth2Flow};

#[cfg(feature = "github")]
pub use authplex_providers_github as github;
#[cfg(feature = "github")]
pub use authplex_providers_github::GithubProvider;

#[cfg(feature = "google")]
pub use authplex_providers_google as google;
#[cfg(feature = "google")]
pub use authplex_providers_google::GoogleProvider;

#[cfg(feature = "facebook")]
pub use authplex_providers_facebook as facebook;
#[cfg(feature = "facebook")]
pub use authplex_providers_facebook::FacebookProvider;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{
        set_security_key, AuthError, Authplex, Credentials, Provider, ProviderConfig, State,
        User,
    };

    #[cfg(feature = "facebook")]
    pub use crate::FacebookProvider;
    #[cfg(feature = "github")]
    pub use crate::GithubProvider;
    #[cfg(feature = "google")]
    pub use crate::GoogleProvider;
}

/// Build every provider whose client id is present in the environment.
///
/// Reads `GITHUB_*`, `GOOGLE_*` and `FACEBOOK_*` variables as described by
/// [`ProviderConfig::from_env`] under `prefix`, e.g. `AUTHPLEX_GITHUB_CLIENT_ID`.
pub fn providers_from_env(prefix: &str) -> Vec<std::sync::Arc<dyn Provider>> {
    #[allow(unused_mut)]
    let mut found: Vec<std::sync::Arc<dyn Provider>> = Vec::new();
    #[allow(unused_variables)]
    let load = |name: &str| {
        let config = ProviderConfig::from_env(&format!("{prefix}_{name}"));
        config.get(ConfigKey::ClientId).is_some().then_some(config)
    };

    #[cfg(feature = "github")]
    if let Some(config) = load("GITHUB") {
        found.push(std::sync::Arc::new(GithubProvider::from_config(config)));
    }
    #[cfg(feature = "google")]
    if let Some(config) = load("GOOGLE") {
        found.push(std::sync::Arc::new(GoogleProvider::from_config(config)));
    }
    #[cfg(feature = "facebook")]
    if let Some(config) = load("FACEBOOK") {
        found.push(std::sync::Arc::new(FacebookProvider::from_config(config)));
    }
    found
}
