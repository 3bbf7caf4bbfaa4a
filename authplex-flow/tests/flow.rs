mod common;

use authplex_core::{set_security_key, AuthError, SecurityKey, State};
use authplex_flow::Authplex;
use common::{params, ExampleProvider, KEY};
use std::collections::HashMap;

fn service() -> (Authplex, std::sync::Arc<common::ScriptedTransport>) {
    let (provider, transport) = ExampleProvider::scripted();
    (Authplex::builder().provider(provider).build(), transport)
}

#[tokio::test]
async fn login_round_trip_returns_user_and_original_state() {
    set_security_key(KEY);
    let (authplex, transport) = service();
    transport.respond_json(200, r#"{"access_token":"tok"}"#);
    transport.respond_json(200, r#"{"id":"1","name":"Ada"}"#);

    let state = State::after("/dashboard").with("flow", "login");
    let url = authplex.login_url("example", &state, &HashMap::new()).unwrap();
    let issued = url::Url::parse(&url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let (user, returned) = authplex
        .finalize_login("example", &params(&[("code", "abc"), ("state", issued.as_str())]))
        .await
        .unwrap();

    assert_eq!(returned, state);
    assert_eq!(returned.after_url(), Some("/dashboard"));
    assert_eq!(user.name(), Some("Ada"));
}

#[tokio::test]
async fn forged_state_is_rejected_before_any_exchange() {
    set_security_key(KEY);
    let (authplex, transport) = service();
    let forged = State::after("https://evil.example/")
        .encode_with(&SecurityKey::new("attacker-key"))
        .unwrap();

    let err = authplex
        .finalize_login("example", &params(&[("code", "abc"), ("state", forged.as_str())]))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidStateSignature));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn missing_state_is_malformed() {
    let (authplex, transport) = service();

    let err = authplex
        .finalize_login("example", &params(&[("code", "abc")]))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::MalformedState(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn unknown_provider_is_reported() {
    let (authplex, _) = service();

    assert!(matches!(
        authplex.flow("myspace"),
        Err(AuthError::UnknownProvider(name)) if name == "myspace"
    ));
    let err = authplex
        .finalize_login("myspace", &HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UnknownProvider(_)));
}
