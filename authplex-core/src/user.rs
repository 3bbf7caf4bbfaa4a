use crate::credentials::Credentials;
use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The normalized result of a successful authentication.
///
/// `id` belongs to the embedding application's namespace and is never copied
/// from a provider. Provider-native ids live in [`User::provider_credentials`].
///
/// Deserializing a `User` applies the same id check as [`User::with_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UnverifiedUser")]
pub struct User {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    nickname: Option<String>,
    avatar_url: Option<String>,
    provider_credentials: HashMap<String, Credentials>,
    data: Map<String, Value>,
}

impl User {
    /// Start building a user on behalf of `provider`.
    pub fn builder(provider: impl Into<String>) -> UserBuilder {
        UserBuilder {
            provider: provider.into(),
            email: None,
            name: None,
            nickname: None,
            avatar_url: None,
            credentials: Credentials::new(),
            data: Map::new(),
        }
    }

    /// The application-assigned id, if the application has assigned one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Email address.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Full name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Nickname or username.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// URL of an image representing the user.
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Credentials keyed by provider name.
    pub fn provider_credentials(&self) -> &HashMap<String, Credentials> {
        &self.provider_credentials
    }

    /// Credentials obtained from `provider`.
    pub fn credentials_for(&self, provider: &str) -> Option<&Credentials> {
        self.provider_credentials.get(provider)
    }

    /// The provider-native id of this user at `provider`.
    pub fn id_for_provider(&self, provider: &str) -> Option<&str> {
        self.credentials_for(provider).and_then(Credentials::id)
    }

    /// Raw profile data as returned by the provider.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Assign the application's own id.
    ///
    /// Fails if `id` equals a provider-native id held by this user, since the
    /// two namespaces must stay apart.
    pub fn with_id(mut self, id: impl Into<String>) -> Result<Self, AuthError> {
        self.id = Some(id.into());
        self.check_id()?;
        Ok(self)
    }

    /// Merge the provider credentials of `other`, the same person signed in
    /// through another provider.
    ///
    /// Each provider keeps its own credential bag; an entry for a provider
    /// present on both sides is replaced by the one from `other`. Profile
    /// fields missing here are filled from `other`.
    pub fn link(mut self, other: User) -> Result<Self, AuthError> {
        self.provider_credentials.extend(other.provider_credentials);
        self.id = self.id.or(other.id);
        self.email = self.email.or(other.email);
        self.name = self.name.or(other.name);
        self.nickname = self.nickname.or(other.nickname);
        self.avatar_url = self.avatar_url.or(other.avatar_url);
        for (key, value) in other.data {
            self.data.entry(key).or_insert(value);
        }
        self.check_id()?;
        Ok(self)
    }

    fn check_id(&self) -> Result<(), AuthError> {
        let Some(id) = self.id.as_deref() else {
            return Ok(());
        };
        if let Some(provider) = self
            .provider_credentials
            .iter()
            .find_map(|(name, creds)| (creds.id() == Some(id)).then_some(name))
        {
            return Err(AuthError::InvalidUserId(format!(
                "{id} is the native id assigned by {provider}"
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct UnverifiedUser {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    nickname: Option<String>,
    avatar_url: Option<String>,
    #[serde(default)]
    provider_credentials: HashMap<String, Credentials>,
    #[serde(default)]
    data: Map<String, Value>,
}

impl TryFrom<UnverifiedUser> for User {
    type Error = AuthError;

    fn try_from(raw: UnverifiedUser) -> Result<Self, Self::Error> {
        let user = User {
            id: raw.id,
            email: raw.email,
            name: raw.name,
            nickname: raw.nickname,
            avatar_url: raw.avatar_url,
            provider_credentials: raw.provider_credentials,
            data: raw.data,
        };
        user.check_id()?;
        Ok(user)
    }
}

/// Builder used by provider adapters to assemble a [`User`].
///
/// The application id cannot be set here.
#[derive(Debug)]
pub struct UserBuilder {
    provider: String,
    email: Option<String>,
    name: Option<String>,
    nickname: Option<String>,
    avatar_url: Option<String>,
    credentials: Credentials,
    data: Map<String, Value>,
}

impl UserBuilder {
    /// Set the email address.
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Set the full name.
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Set the nickname.
    pub fn nickname(mut self, nickname: Option<String>) -> Self {
        self.nickname = nickname;
        self
    }

    /// Set the avatar URL.
    pub fn avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url;
        self
    }

    /// Set the credentials obtained from the provider, including its native id.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the raw profile data.
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Build the user.
    pub fn build(self) -> User {
        let mut provider_credentials = HashMap::new();
        provider_credentials.insert(self.provider, self.credentials);
        User {
            id: None,
            email: self.email,
            name: self.name,
            nickname: self.nickname,
            avatar_url: self.avatar_url,
            provider_credentials,
            data: self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::keys;

    fn github_user() -> User {
        User::builder("github")
            .name(Some("their-name".into()))
            .nickname(Some("loginname".into()))
            .credentials(
                Credentials::new()
                    .with(keys::ID, "uniqueid")
                    .with(keys::ACCESS_TOKEN, "gh-token"),
            )
            .build()
    }

    fn facebook_user() -> User {
        User::builder("facebook")
            .email(Some("email@address.com".into()))
            .name(Some("Facebook Name".into()))
            .credentials(
                Credentials::new()
                    .with(keys::ID, "fb-1")
                    .with(keys::ACCESS_TOKEN, "fb-token")
                    .with(keys::EXPIRES_IN, "3600"),
            )
            .build()
    }

    #[test]
    fn builder_never_assigns_an_application_id() {
        let user = github_user();
        assert_eq!(user.id(), None);
        assert_eq!(user.id_for_provider("github"), Some("uniqueid"));
        assert_eq!(user.id_for_provider("google"), None);
    }

    #[test]
    fn with_id_rejects_provider_native_ids() {
        let err = github_user().with_id("uniqueid").unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserId(_)));

        let user = github_user().with_id("app-user-1").unwrap();
        assert_eq!(user.id(), Some("app-user-1"));
    }

    #[test]
    fn linked_credentials_stay_isolated() {
        let user = github_user().link(facebook_user()).unwrap();

        let github = user.credentials_for("github").unwrap();
        let facebook = user.credentials_for("facebook").unwrap();
        assert_eq!(github.id(), Some("uniqueid"));
        assert!(!github.contains_key(keys::EXPIRES_IN));
        assert_eq!(facebook.access_token(), Some("fb-token"));
        assert_eq!(facebook.id(), Some("fb-1"));

        assert_eq!(user.name(), Some("their-name"));
        assert_eq!(user.email(), Some("email@address.com"));
    }

    #[test]
    fn link_rechecks_the_application_id() {
        let user = github_user().with_id("fb-1").unwrap();
        let err = user.link(facebook_user()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserId(_)));
    }

    #[test]
    fn serde_round_trip() {
        let user = github_user().with_id("42").unwrap();
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn deserializing_rejects_a_provider_native_id() {
        let mut json = serde_json::to_value(github_user()).unwrap();
        json["id"] = "uniqueid".into();

        let err = serde_json::from_value::<User>(json).unwrap_err();
        assert!(err.to_string().contains("uniqueid"), "{err}");
    }
}
