mod common;

use authplex_core::{AuthError, ConfigKey, Credentials, Provider, ProviderConfig};
use common::ExampleProvider;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_against(server: &MockServer) -> ExampleProvider {
    let mut provider = ExampleProvider::new(
        ProviderConfig::client("clientID", "secret", "http://myapp.com/")
            .with(ConfigKey::TokenUrl, format!("{}/oauth/token", server.uri())),
    );
    provider.user_url = format!("{}/me", server.uri());
    provider
}

#[tokio::test]
async fn full_exchange_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=one-time"))
        .and(body_string_contains("client_secret=secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"access_token":"live-token"}"#, "application/json"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_raw(r#"{"error":"invalid_grant"}"#, "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer live-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"id":"u-1","name":"Grace"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let provider = provider_against(&server);
    let creds = Credentials::from_code("one-time");

    let user = provider.get_user(&creds).await.unwrap();
    assert_eq!(user.name(), Some("Grace"));
    assert_eq!(user.id_for_provider("example"), Some("u-1"));

    // The same code again: the provider refuses and nothing is retried.
    let err = provider.get_user(&creds).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::AuthExchangeFailed { status: Some(400), .. }
    ));
}
