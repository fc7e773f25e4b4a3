use url::Url;

use crate::error::AuthError;

/// Port trait for the OAuth authorization code flow.
///
/// `authorization_url` is where the user logs in; the provider then redirects
/// back with the same `state` and a code that `exchange_token` trades for an
/// authenticated client.
#[cfg_attr(test, mockall::automock(type Client = String;))]
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    type Client: Send + 'static;

    fn authorization_url(&self, state: &str) -> Url;

    async fn exchange_token(&self, code: &str) -> Result<Self::Client, AuthError>;
}
