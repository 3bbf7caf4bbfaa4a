use authplex_core::{AuthError, Provider, State, User};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Orchestrates the Authorization Code flow for one provider.
///
/// The state returned by the provider is verified before anything else
/// happens, so a forged callback never reaches the token endpoint.
#[derive(Clone)]
pub struct OAuth2Flow {
    provider: Arc<dyn Provider>,
}

impl OAuth2Flow {
    /// Create a new `OAuth2Flow` for `provider`.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// The provider driven by this flow.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Generates the redirect URL carrying `state`.
    pub fn initiate_login(
        &self,
        state: &State,
        options: &HashMap<String, String>,
    ) -> Result<String, AuthError> {
        self.provider.get_begin_auth_url(Some(state), options)
    }

    /// Completes the flow from the callback query parameters.
    ///
    /// Returns the user together with the verified state the login was
    /// started with.
    pub async fn finalize_login(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<(User, State), AuthError> {
        let encoded = params
            .get("state")
            .ok_or_else(|| AuthError::MalformedState("callback carried no state".into()))?;
        let state = State::decode(encoded)?;

        let creds = self.provider.complete_auth(params).await?;
        let user = self.provider.get_user(&creds).await?;
        debug!("Completed {} login", self.provider.name());
        Ok((user, state))
    }
}
