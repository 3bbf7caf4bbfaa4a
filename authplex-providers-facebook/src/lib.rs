use async_trait::async_trait;
use authplex_core::{
    keys, AuthError, ConfigKey, Credentials, Provider, ProviderConfig, State, TripperFactory, User,
};
use authplex_flow::{scalar, OAuth2Client};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry and credentials key of this provider.
pub const FACEBOOK_NAME: &str = "facebook";
/// Default authorization endpoint.
pub const FACEBOOK_AUTH_URL: &str = "https://www.facebook.com/dialog/oauth";
/// Default token endpoint.
pub const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/oauth/access_token";
/// Graph endpoint returning the authenticated user's profile.
pub const FACEBOOK_USER_URL: &str =
    "https://graph.facebook.com/me?fields=id,name,first_name,email,picture";
/// Scope requested when none is configured.
pub const FACEBOOK_DEFAULT_SCOPE: &str = "email";

/// Facebook OAuth provider.
pub struct FacebookProvider {
    client: OAuth2Client,
    user_url: String,
}

impl FacebookProvider {
    /// Create a provider with Facebook's public endpoints.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self::from_config(ProviderConfig::client(client_id, client_secret, redirect_uri))
    }

    /// Create a provider from a loaded configuration, filling the Facebook defaults.
    pub fn from_config(config: ProviderConfig) -> Self {
        let config = config
            .with_default(ConfigKey::Scope, FACEBOOK_DEFAULT_SCOPE)
            .with_default(ConfigKey::AuthUrl, FACEBOOK_AUTH_URL)
            .with_default(ConfigKey::TokenUrl, FACEBOOK_TOKEN_URL);
        Self {
            client: OAuth2Client::new(config),
            user_url: FACEBOOK_USER_URL.to_string(),
        }
    }

    /// Use `factory` for every call to Facebook.
    pub fn with_tripper_factory(mut self, factory: Arc<dyn TripperFactory>) -> Self {
        self.client = self.client.with_tripper_factory(factory);
        self
    }

    /// Fetch profiles from `url`, e.g. to pin a Graph API version.
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
impl Provider for FacebookProvider {
    fn name(&self) -> &str {
        FACEBOOK_NAME
    }

    fn display_name(&self) -> &str {
        "Facebook"
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

        let avatar_url = profile
            .get("picture")
            .and_then(|p| p.pointer("/data/url"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let creds = match scalar(&profile, "id") {
            Some(id) => creds.with(keys::ID, id),
            None => creds,
        };
        Ok(User::builder(FACEBOOK_NAME)
            .name(scalar(&profile, "name"))
            .nickname(scalar(&profile, "first_name"))
            .email(scalar(&profile, "email"))
            .avatar_url(avatar_url)
            .credentials(creds)
            .data(profile)
            .build())
    }

    fn tripper_factory(&self) -> Arc<dyn TripperFactory> {
        self.client.tripper_factory()
    }
}
