use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::error::AuthError;
use crate::ports::authenticator::Authenticator;
use crate::spotify::client::{SPOTIFY_API_URL, SpotifyWebClient};
use crate::spotify::types::SpotifyTokenResponse;

const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

pub const SPOTIFY_SCOPES: [&str; 7] = [
    "user-read-private",
    "user-library-read",
    "user-library-modify",
    "playlist-read-private",
    "playlist-read-collaborative",
    "playlist-modify-public",
    "playlist-modify-private",
];

#[derive(Clone)]
pub struct SpotifyApiCredentials {
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
}

impl fmt::Debug for SpotifyApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyApiCredentials")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri.as_str())
            .finish_non_exhaustive()
    }
}

impl SpotifyApiCredentials {
    pub fn new(client_id: String, client_secret: String, redirect_uri: Url) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    fn basic_authorization(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
        )
    }
}

/// Authorization code flow against the Spotify accounts service.
#[derive(Debug)]
pub struct SpotifyAuthenticator {
    http: reqwest::Client,
    credentials: SpotifyApiCredentials,
    authorize_url: Url,
    api_base: Url,
    market: String,
}

impl SpotifyAuthenticator {
    pub fn new(credentials: SpotifyApiCredentials, market: String) -> Result<Self, url::ParseError> {
        Ok(Self {
            http: reqwest::Client::new(),
            credentials,
            authorize_url: Url::parse(SPOTIFY_AUTH_URL)?,
            api_base: Url::parse(SPOTIFY_API_URL)?,
            market,
        })
    }
}

#[async_trait::async_trait]
impl Authenticator for SpotifyAuthenticator {
    type Client = SpotifyWebClient;

    fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", self.credentials.client_id())
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.credentials.redirect_uri().as_str())
            .append_pair("state", state)
            .append_pair("scope", &SPOTIFY_SCOPES.join(" "));
        url
    }

    async fn exchange_token(&self, code: &str) -> Result<SpotifyWebClient, AuthError> {
        let token = exchange_code_for_token(&self.http, &self.credentials, code)
            .await
            .map_err(|error| AuthError::ExchangeFailed(error.to_string()))?;
        log::debug!("Received access token with scopes: {}", token.scope);

        Ok(SpotifyWebClient::new(
            self.http.clone(),
            self.credentials.clone(),
            self.api_base.clone(),
            token,
        )
        .with_market(&self.market))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeCodeForTokenError {
    #[error("Invalid code: {reason}")]
    InvalidCode { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Exchange authorization code for access token
/// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
pub async fn exchange_code_for_token(
    http: &reqwest::Client,
    credentials: &SpotifyApiCredentials,
    code: &str,
) -> Result<SpotifyTokenResponse, ExchangeCodeForTokenError> {
    let mut params = HashMap::new();
    params.insert("grant_type", "authorization_code");
    params.insert("code", code);
    // Has to match the redirect URI of the authorization request exactly.
    params.insert("redirect_uri", credentials.redirect_uri().as_str());

    let response = http
        .post(SPOTIFY_TOKEN_URL)
        .form(&params)
        .header("Authorization", credentials.basic_authorization())
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ExchangeCodeForTokenError::InvalidCode {
            reason: response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToParseResponse)
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("Invalid refresh token: {reason}")]
    InvalidRefreshToken { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Refresh an access token using a refresh token
pub async fn refresh_access_token(
    http: &reqwest::Client,
    credentials: &SpotifyApiCredentials,
    refresh_token: &str,
) -> Result<SpotifyTokenResponse, RefreshTokenError> {
    let mut params = HashMap::new();
    params.insert("grant_type", "refresh_token");
    params.insert("refresh_token", refresh_token);

    let response = http
        .post(SPOTIFY_TOKEN_URL)
        .form(&params)
        .header("Authorization", credentials.basic_authorization())
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(RefreshTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(RefreshTokenError::InvalidRefreshToken {
            reason: response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(RefreshTokenError::FailedToParseResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> SpotifyApiCredentials {
        SpotifyApiCredentials::new(
            "test_client_id".to_string(),
            "test_secret".to_string(),
            Url::parse("http://localhost:8080/callback").unwrap(),
        )
    }

    #[test]
    fn test_authorization_url() {
        let authenticator = SpotifyAuthenticator::new(credentials(), "US".to_string()).unwrap();
        let url = authenticator.authorization_url("nonce123");

        assert!(url.as_str().starts_with(SPOTIFY_AUTH_URL));
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "test_client_id");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8080/callback");
        assert_eq!(pairs["state"], "nonce123");
        assert!(pairs["scope"].contains("user-library-modify"));
        assert!(pairs["scope"].contains("playlist-modify-private"));
    }

    #[test]
    fn test_basic_authorization() {
        // base64("test_client_id:test_secret")
        assert_eq!(
            credentials().basic_authorization(),
            "Basic dGVzdF9jbGllbnRfaWQ6dGVzdF9zZWNyZXQ="
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("test_client_id"));
        assert!(!debug.contains("test_secret"));
    }
}
