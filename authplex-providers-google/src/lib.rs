use async_trait::async_trait;
use authplex_core::{
    keys, AuthError, ConfigKey, Credentials, Provider, ProviderConfig, State, TripperFactory, User,
};
use authplex_flow::{scalar, OAuth2Client};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry and credentials key of this provider.
pub const GOOGLE_NAME: &str = "google";
/// Default authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
/// Default token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Endpoint returning the authenticated user's profile.
pub const GOOGLE_USER_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
/// Scope requested when none is configured.
pub const GOOGLE_DEFAULT_SCOPE: &str = "openid email profile";

/// Google OAuth provider.
pub struct GoogleProvider {
    client: OAuth2Client,
    user_url: String,
}

impl GoogleProvider {
    /// Create a provider with Google's public endpoints.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self::from_config(ProviderConfig::client(client_id, client_secret, redirect_uri))
    }

    /// Create a provider from a loaded configuration, filling the Google defaults.
    pub fn from_config(config: ProviderConfig) -> Self {
        let config = config
            .with_default(ConfigKey::Scope, GOOGLE_DEFAULT_SCOPE)
            .with_default(ConfigKey::AuthUrl, GOOGLE_AUTH_URL)
            .with_default(ConfigKey::TokenUrl, GOOGLE_TOKEN_URL);
        Self {
            client: OAuth2Client::new(config),
            user_url: GOOGLE_USER_URL.to_string(),
        }
    }

    /// Use `factory` for every call to Google.
    pub fn with_tripper_factory(mut self, factory: Arc<dyn TripperFactory>) -> Self {
        self.client = self.client.with_tripper_factory(factory);
        self
    }

    /// Fetch profiles from `url` instead of the public userinfo endpoint.
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
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        GOOGLE_NAME
    }

    fn display_name(&self) -> &str {
        "Google"
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

        // userinfo v2 says `id`, the OpenID Connect endpoint says `sub`.
        let creds = match scalar(&profile, "id").or_else(|| scalar(&profile, "sub")) {
            Some(id) => creds.with(keys::ID, id),
            None => creds,
        };
        Ok(User::builder(GOOGLE_NAME)
            .name(scalar(&profile, "name"))
            .nickname(scalar(&profile, "given_name"))
            .email(scalar(&profile, "email"))
            .avatar_url(scalar(&profile, "picture"))
            .credentials(creds)
            .data(profile)
            .build())
    }

    fn tripper_factory(&self) -> Arc<dyn TripperFactory> {
        self.client.tripper_factory()
    }
}
