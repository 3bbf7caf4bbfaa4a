//! # Axum Login Example
//!
//! Logs users in through every provider configured in the environment:
//!
//! ```text
//! AUTHPLEX_SECURITY_KEY=...                      # signs the state, random if unset
//! AUTHPLEX_GITHUB_CLIENT_ID=...
//! AUTHPLEX_GITHUB_SECRET=...
//! AUTHPLEX_GITHUB_REDIRECT_URL=http://localhost:3000/auth/github/callback
//! ```
//!
//! `GOOGLE` and `FACEBOOK` work the same way.

use authplex::{AuthError, Authplex, ProviderRegistry, SecurityKey, State as LoginState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
struct AppState {
    authplex: Authplex,
}

#[derive(Deserialize)]
struct LoginQuery {
    /// Where to send the user once logged in.
    after: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    match std::env::var("AUTHPLEX_SECURITY_KEY") {
        Ok(key) => authplex::set_security_key(key),
        Err(_) => {
            warn!("AUTHPLEX_SECURITY_KEY is not set, logins will not survive a restart");
            authplex::set_security_key(SecurityKey::generate());
        }
    }

    let registry = ProviderRegistry::new();
    for provider in authplex::providers_from_env("AUTHPLEX") {
        info!("Configured {}", provider.display_name());
        registry.register(provider);
    }
    if registry.is_empty() {
        warn!("No provider configured, set AUTHPLEX_GITHUB_CLIENT_ID or similar");
    }

    let state = AppState {
        authplex: Authplex::from_registry(Arc::new(registry)),
    };

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Listening on http://localhost:3000");
    axum::serve(listener, app(state)).await.unwrap();
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/auth/{provider}", get(login))
        .route("/auth/{provider}/callback", get(callback))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let mut html = String::from("<h1>Authplex</h1>");
    for provider in state.authplex.registry().all() {
        html.push_str(&format!(
            "<p><a href=\"/auth/{}?after=/\">Login with {}</a></p>",
            provider.name(),
            provider.display_name()
        ));
    }
    Html(html)
}

async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, AppError> {
    let after = query.after.unwrap_or_else(|| "/".to_string());
    let url = state
        .authplex
        .login_url(&provider, &LoginState::after(after), &HashMap::new())?;
    Ok(Redirect::to(&url))
}

async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, AppError> {
    let (user, login_state) = state.authplex.finalize_login(&provider, &params).await?;
    let who = user
        .nickname()
        .or(user.name())
        .or(user.email())
        .unwrap_or("anonymous");
    info!("{who} logged in with {provider}");

    Ok(Html(format!(
        "<h1>Welcome {}</h1><p>{} id: {}</p><p><a href=\"{}\">Continue</a></p>",
        encode_text(who),
        encode_text(&provider),
        encode_text(user.id_for_provider(&provider).unwrap_or("unknown")),
        encode_double_quoted_attribute(local_target(login_state.after_url())),
    )))
}

/// Only same-site paths are followed after login.
fn local_target(after: Option<&str>) -> &str {
    match after {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

struct AppError(AuthError);

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AuthError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            err if err.is_tampering() => StatusCode::BAD_REQUEST,
            AuthError::AuthExchangeFailed { .. } => StatusCode::UNAUTHORIZED,
            AuthError::Transport(_) | AuthError::MalformedProviderResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("Login failed: {}", self.0);
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authplex::GithubProvider;
    use axum::body::Body;
    use axum::http::{header::LOCATION, Request};
    use tower::ServiceExt;

    fn test_app() -> Router {
        authplex::set_security_key("axum-login-test");
        let authplex = Authplex::builder()
            .provider(GithubProvider::new(
                "client-id".into(),
                "client-secret".into(),
                "http://localhost:3000/auth/github/callback".into(),
            ))
            .build();
        app(AppState { authplex })
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn login_redirects_to_the_provider_with_a_signed_state() {
        let response = get(test_app(), "/auth/github?after=/dashboard").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(location.contains("client_id=client-id"));
        assert!(location.contains("state="));
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let response = get(test_app(), "/auth/myspace").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn forged_state_is_a_bad_request() {
        let response = get(test_app(), "/auth/github/callback?code=abc&state=e30.AAAA").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(local_target(Some("/dashboard?tab=1")), "/dashboard?tab=1");
        assert_eq!(local_target(Some("//evil.example/")), "/");
        assert_eq!(local_target(Some("javascript:alert(1)")), "/");
        assert_eq!(local_target(None), "/");
    }

    #[test]
    fn provider_supplied_text_is_escaped() {
        let escaped = encode_text("<script>alert(1)</script>");
        assert!(!escaped.contains('<'));
        let attribute = encode_double_quoted_attribute(local_target(Some("/a\"onclick=\"x")));
        assert!(!attribute.contains('"'));
    }

    #[tokio::test]
    async fn denied_consent_is_unauthorized() {
        authplex::set_security_key("axum-login-test");
        let state = LoginState::after("/").encode().unwrap();
        let uri = format!("/auth/github/callback?error=access_denied&state={state}");

        let response = get(test_app(), &uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
