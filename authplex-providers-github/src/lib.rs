use async_trait::async_trait;
use authplex_core::{
    keys, AuthError, ConfigKey, Credentials, Provider, ProviderConfig, State, TripperFactory, User,
};
use authplex_flow::{scalar, OAuth2Client};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry and credentials key of this provider.
pub const GITHUB_NAME: &str = "github";
/// Default authorization endpoint.
pub const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
/// Default token endpoint.
pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
/// Endpoint returning the authenticated user's profile.
pub const GITHUB_USER_URL: &str = "https://api.github.com/user";
/// Scope requested when none is configured.
pub const GITHUB_DEFAULT_SCOPE: &str = "read:user";

/// GitHub OAuth provider.
pub struct GithubProvider {
    client: OAuth2Client,
    user_url: String,
}

impl GithubProvider {
    /// Create a provider with GitHub's public endpoints.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self::from_config(ProviderConfig::client(client_id, client_secret, redirect_uri))
    }

    /// Create a provider from a loaded configuration, filling the GitHub defaults.
    pub fn from_config(config: ProviderConfig) -> Self {
        let config = config
            .with_default(ConfigKey::Scope, GITHUB_DEFAULT_SCOPE)
            .with_default(ConfigKey::AuthUrl, GITHUB_AUTH_URL)
            .with_default(ConfigKey::TokenUrl, GITHUB_TOKEN_URL);
        Self {
            client: OAuth2Client::new(config),
            user_url: GITHUB_USER_URL.to_string(),
        }
    }

    /// Use `factory` for every call to GitHub.
    pub fn with_tripper_factory(mut self, factory: Arc<dyn TripperFactory>) -> Self {
        self.client = self.client.with_tripper_factory(factory);
        self
    }

    /// Fetch profiles from `url` instead of the public API, e.g. GitHub Enterprise.
    pub fn with_user_url(mut self, url: impl Into<String>) -> Self {
        self.user_url = url.into();
        self
    }

    /// The effective configuration.
    pub fn config(&self) -> &ProviderConfig {
        self.client.config()
    }
}

#[async_trait]
impl Provider for GithubProvider {
    fn name(&self) -> &str {
        GITHUB_NAME
    }

    fn display_name(&self) -> &str {
        "GitHub"
    }

    fn get_begin_auth_url(
        &self,
        state: Option<&State>,
        options: &HashMap<String, String>,
    ) -> Result<String, AuthError> {
        self.client.begin_auth_url(state, options)
    }

    async fn complete_auth(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Credentials, AuthError> {
        self.client.complete_auth(self, params).await
    }

    async fn get_user(&self, creds: &Credentials) -> Result<User, AuthError> {
        let creds = self.client.ensure_token(self, creds).await?;
        let profile = self.client.get_json(self, &creds, &self.user_url).await?;

        let creds = match scalar(&profile, "id") {
            Some(id) => creds.with(keys::ID, id),
            None => creds,
        };
        Ok(User::builder(GITHUB_NAME)
            .name(scalar(&profile, "name"))
            .nickname(scalar(&profile, "login"))
            .email(scalar(&profile, "email"))
            .avatar_url(scalar(&profile, "avatar_url"))
            .credentials(creds)
            .data(profile)
            .build())
    }

    fn tripper_factory(&self) -> Arc<dyn TripperFactory> {
        self.client.tripper_factory()
    }
}
