#![allow(dead_code)]

use async_trait::async_trait;
use authplex_core::{
    keys, AuthError, ConfigKey, Credentials, Provider, ProviderConfig, State, Tripper,
    TripperFactory, TransportError, User,
};
use authplex_flow::{scalar, OAuth2Client};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const KEY: &str = "flow-test-key";

pub struct RecordedRequest {
    pub method: http::Method,
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: String,
}

/// Answers each round-trip with the next scripted response and records what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<http::Response<Vec<u8>>, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedTransport {
    pub fn respond(&self, status: u16, content_type: &str, body: &str) -> &Self {
        let response = http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, content_type)
            .body(body.as_bytes().to_vec())
            .unwrap();
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn respond_json(&self, status: u16, body: &str) -> &Self {
        self.respond(status, "application/json", body)
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> std::sync::MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tripper for ScriptedTransport {
    async fn round_trip(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, TransportError> {
        let (parts, body) = request.into_parts();
        self.requests.lock().unwrap().push(RecordedRequest {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body: String::from_utf8(body).unwrap(),
        });
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(message.into()),
            None => Err("no scripted response left".into()),
        }
    }
}

pub struct ScriptedFactory(pub Arc<ScriptedTransport>);

impl TripperFactory for ScriptedFactory {
    fn new_tripper(
        &self,
        creds: Option<&Credentials>,
        _provider: &dyn Provider,
    ) -> Result<Arc<dyn Tripper>, AuthError> {
        self.0
            .tokens
            .lock()
            .unwrap()
            .push(creds.and_then(Credentials::access_token).map(str::to_owned));
        Ok(self.0.clone())
    }
}

/// Minimal adapter built on `OAuth2Client`, the way real adapters are.
pub struct ExampleProvider {
    pub client: OAuth2Client,
    pub user_url: String,
}

impl ExampleProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: OAuth2Client::new(
                config
                    .with_default(ConfigKey::AuthUrl, "https://example.com/oauth/authorize")
                    .with_default(ConfigKey::TokenUrl, "https://example.com/oauth/token"),
            ),
            user_url: "https://api.example.com/me".into(),
        }
    }

    pub fn scripted() -> (Self, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::default());
        let mut provider = Self::new(
            ProviderConfig::client("clientID", "secret", "http://myapp.com/")
                .with(ConfigKey::Scope, "profile"),
        );
        provider.client = provider
            .client
            .with_tripper_factory(Arc::new(ScriptedFactory(transport.clone())));
        (provider, transport)
    }
}

#[async_trait]
impl Provider for ExampleProvider {
    fn name(&self) -> &str {
        "example"
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
        let data = self.client.get_json(self, &creds, &self.user_url).await?;
        let creds = match scalar(&data, "id") {
            Some(id) => creds.with(keys::ID, id),
            None => creds,
        };
        Ok(User::builder(self.name())
            .name(scalar(&data, "name"))
            .credentials(creds)
            .data(data)
            .build())
    }

    fn tripper_factory(&self) -> Arc<dyn TripperFactory> {
        self.client.tripper_factory()
    }
}

pub fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
