use authplex_core::{
    keys, AuthError, ConfigKey, Credentials, HttpTripperFactory, Provider, ProviderConfig, State,
    TripperFactory,
};
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::StatusCode;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use url::form_urlencoded;
use url::Url;

/// `response_type` requested on the authorization URL.
pub const RESPONSE_TYPE_CODE: &str = "code";
/// `access_type` requested on the authorization URL.
pub const ACCESS_TYPE_ONLINE: &str = "online";
/// `approval_prompt` requested on the authorization URL.
pub const APPROVAL_PROMPT_AUTO: &str = "auto";
/// `grant_type` sent to the token endpoint.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

const CLIENT_USER_AGENT: &str = concat!("authplex/", env!("CARGO_PKG_VERSION"));
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Authorization parameters that `options` may not replace.
pub const RESERVED_PARAMS: [&str; 4] = ["client_id", "redirect_uri", "response_type", "state"];

/// The OAuth2 authorization-code plumbing every provider adapter shares.
///
/// Owns the provider configuration and the transport factory. Adapters keep
/// one of these and only add their endpoint and profile mapping.
pub struct OAuth2Client {
    config: ProviderConfig,
    tripper_factory: OnceLock<Arc<dyn TripperFactory>>,
}

impl OAuth2Client {
    /// Create a client for `config`. The transport factory is created on first use.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            tripper_factory: OnceLock::new(),
        }
    }

    /// Use `factory` for every outbound call instead of the default.
    pub fn with_tripper_factory(self, factory: Arc<dyn TripperFactory>) -> Self {
        Self {
            config: self.config,
            tripper_factory: OnceLock::from(factory),
        }
    }

    /// The provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The transport factory, creating the default one if none was injected.
    pub fn tripper_factory(&self) -> Arc<dyn TripperFactory> {
        self.tripper_factory
            .get_or_init(|| Arc::new(HttpTripperFactory::new()))
            .clone()
    }

    /// Build the authorization URL.
    ///
    /// The output only depends on the arguments and configuration: `options`
    /// are applied in sorted order, and an option named like a standard
    /// parameter (e.g. `scope`) replaces it. Options named like one of
    /// [`RESERVED_PARAMS`] fail with [`AuthError::Configuration`].
    pub fn begin_auth_url(
        &self,
        state: Option<&State>,
        options: &HashMap<String, String>,
    ) -> Result<String, AuthError> {
        let auth_url = self.config.require(ConfigKey::AuthUrl)?;
        let client_id = self.config.require(ConfigKey::ClientId)?;
        let redirect_url = self.config.require(ConfigKey::RedirectUrl)?;

        let mut url = Url::parse(auth_url)
            .map_err(|e| AuthError::Configuration(format!("invalid {}: {e}", ConfigKey::AuthUrl)))?;

        let mut params: Vec<(String, String)> = vec![
            ("client_id".into(), client_id.into()),
            ("redirect_uri".into(), redirect_url.into()),
        ];
        if let Some(scope) = self.config.get(ConfigKey::Scope).filter(|s| !s.is_empty()) {
            params.push(("scope".into(), scope.into()));
        }
        params.push(("access_type".into(), ACCESS_TYPE_ONLINE.into()));
        params.push(("approval_prompt".into(), APPROVAL_PROMPT_AUTO.into()));
        params.push(("response_type".into(), RESPONSE_TYPE_CODE.into()));
        if let Some(state) = state {
            params.push(("state".into(), state.encode()?));
        }

        if let Some(reserved) = RESERVED_PARAMS
            .into_iter()
            .find(|name| options.contains_key(*name))
        {
            return Err(AuthError::Configuration(format!(
                "option {reserved} cannot override the authorization parameter"
            )));
        }

        let mut extra: Vec<_> = options.iter().collect();
        extra.sort();
        for (key, value) in extra {
            match params.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value.clone(),
                None => params.push((key.clone(), value.clone())),
            }
        }

        url.query_pairs_mut().extend_pairs(&params);
        Ok(url.into())
    }

    /// Exchange the code found in the callback parameters.
    ///
    /// An `error` parameter set by the provider, or a missing `code`, fails
    /// with [`AuthError::AuthExchangeFailed`] without any network call.
    pub async fn complete_auth(
        &self,
        provider: &dyn Provider,
        params: &HashMap<String, String>,
    ) -> Result<Credentials, AuthError> {
        if let Some(error) = params.get("error") {
            let message = params.get("error_description").unwrap_or(error);
            warn!("{} reported a failed login: {message}", provider.name());
            return Err(AuthError::AuthExchangeFailed {
                status: None,
                message: message.clone(),
            });
        }

        let code = params
            .get(keys::CODE)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::AuthExchangeFailed {
                status: None,
                message: "callback carried no authorization code".into(),
            })?;
        self.exchange_code(provider, code).await
    }

    /// Exchange an authorization code for tokens at the token endpoint.
    ///
    /// Codes are single use, so this is never retried.
    pub async fn exchange_code(
        &self,
        provider: &dyn Provider,
        code: &str,
    ) -> Result<Credentials, AuthError> {
        let token_url = self.config.require(ConfigKey::TokenUrl)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", GRANT_TYPE_AUTHORIZATION_CODE)
            .append_pair("code", code)
            .append_pair("client_id", self.config.require(ConfigKey::ClientId)?)
            .append_pair("client_secret", self.config.require(ConfigKey::Secret)?)
            .append_pair("redirect_uri", self.config.require(ConfigKey::RedirectUrl)?)
            .finish();

        let request = http::Request::post(token_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .body(body.into_bytes())
            .map_err(|e| AuthError::Configuration(format!("invalid {}: {e}", ConfigKey::TokenUrl)))?;

        debug!("Exchanging authorization code with {}", provider.name());
        let tripper = self.tripper_factory().new_tripper(None, provider)?;
        let response = tripper
            .round_trip(request)
            .await
            .map_err(AuthError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(provider, status, response.body()));
        }

        let fields = if is_form_encoded(&response) {
            form_urlencoded::parse(response.body())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        } else {
            parse_object(response.body())?
        };

        // Some providers answer a rejected code with 200 and an error body.
        if fields.contains_key("error") {
            return Err(rejected(provider, status, response.body()));
        }
        if scalar(&fields, keys::ACCESS_TOKEN).is_none() {
            return Err(AuthError::MalformedProviderResponse(format!(
                "{} token response has no access_token",
                provider.name()
            )));
        }

        Ok([
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::TOKEN_TYPE,
            keys::EXPIRES_IN,
        ]
        .into_iter()
        .filter_map(|key| scalar(&fields, key).map(|value| (key, value)))
        .collect())
    }

    /// Return `creds` with an access token, exchanging its code if needed.
    pub async fn ensure_token(
        &self,
        provider: &dyn Provider,
        creds: &Credentials,
    ) -> Result<Credentials, AuthError> {
        match (creds.access_token(), creds.code()) {
            (None, Some(code)) => self.exchange_code(provider, code).await,
            _ => Ok(creds.clone()),
        }
    }

    /// GET `endpoint` on behalf of `creds` and return the JSON object it answers with.
    pub async fn get_json(
        &self,
        provider: &dyn Provider,
        creds: &Credentials,
        endpoint: &str,
    ) -> Result<Map<String, Value>, AuthError> {
        let request = http::Request::get(endpoint)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .body(Vec::new())
            .map_err(|e| AuthError::Configuration(format!("invalid endpoint {endpoint}: {e}")))?;

        let tripper = self.tripper_factory().new_tripper(Some(creds), provider)?;
        let response = tripper
            .round_trip(request)
            .await
            .map_err(AuthError::Transport)?;
        if !response.status().is_success() {
            return Err(rejected(provider, response.status(), response.body()));
        }
        parse_object(response.body())
    }
}

fn is_form_encoded(response: &http::Response<Vec<u8>>) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE) || v.starts_with("text/plain"))
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, AuthError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AuthError::MalformedProviderResponse(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(AuthError::MalformedProviderResponse(e.to_string())),
    }
}

/// String form of a scalar field; numbers such as `expires_in` are stringified.
pub fn scalar(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn rejected(provider: &dyn Provider, status: StatusCode, body: &[u8]) -> AuthError {
    let message = describe_error(body);
    warn!(
        "{} rejected the request ({status}): {message}",
        provider.name()
    );
    AuthError::AuthExchangeFailed {
        status: Some(status.as_u16()),
        message,
    }
}

fn describe_error(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        let described = ["error_description", "message", "error"]
            .into_iter()
            .find_map(|key| map.get(key))
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Object(inner) => inner.get("message").and_then(Value::as_str).map(str::to_owned),
                _ => None,
            });
        if let Some(described) = described {
            return described;
        }
    }
    let text = String::from_utf8_lossy(body);
    text.chars().take(200).collect()
}
