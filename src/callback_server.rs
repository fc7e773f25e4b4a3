use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use color_eyre::eyre::{Context, OptionExt, eyre};
use serde::Deserialize;
use tokio::task::JoinHandle;
use url::Url;

use crate::auth_handshake::AuthHandshake;
use crate::error::AuthError;
use crate::ports::authenticator::Authenticator;

/// Query parameters of the OAuth redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub state: String,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// The endpoint the authorization server redirects back to. It stays up
/// until the main flow shuts it down after receiving the client.
#[derive(Debug)]
pub struct CallbackServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Binds the port of `redirect_uri` and serves its path.
    pub async fn start<A: Authenticator + 'static>(
        handshake: Arc<AuthHandshake<A>>,
        redirect_uri: &Url,
    ) -> color_eyre::Result<Self> {
        let port = redirect_uri
            .port_or_known_default()
            .ok_or_eyre("Redirect URI has no port")?;
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
        let local_addr = listener
            .local_addr()
            .wrap_err("Failed to read callback server address")?;

        let app = router(handshake, redirect_uri.path());
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                log::error!("Callback server failed: {error}");
            }
        });
        log::debug!("Callback server listening on {local_addr}");

        Ok(Self { local_addr, handle })
    }

    pub fn shutdown(self) {
        self.handle.abort();
        log::debug!("Callback server on {} stopped", self.local_addr);
    }
}

pub fn router<A: Authenticator + 'static>(
    handshake: Arc<AuthHandshake<A>>,
    callback_path: &str,
) -> Router {
    Router::new()
        .route(callback_path, get(complete_auth::<A>))
        .fallback(log_request)
        .with_state(handshake)
}

async fn complete_auth<A: Authenticator + 'static>(
    State(handshake): State<Arc<AuthHandshake<A>>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Err(error) = handshake.check_state(&params.state) {
        return (StatusCode::NOT_FOUND, error.to_string()).into_response();
    }
    if let Some(error) = params.error {
        log::warn!("Authorization was denied: {error}");
        return (StatusCode::FORBIDDEN, "Couldn't get token").into_response();
    }
    let Some(code) = params.code else {
        return (StatusCode::BAD_REQUEST, "Missing authorization code").into_response();
    };

    match handshake.on_callback(&params.state, &code).await {
        Ok(()) => (StatusCode::OK, "Login Completed!").into_response(),
        Err(error) => {
            log::error!("{error}");
            let status = match error {
                AuthError::StateMismatch { .. } => StatusCode::NOT_FOUND,
                AuthError::ExchangeFailed(_) => StatusCode::FORBIDDEN,
                AuthError::AlreadyDelivered => StatusCode::CONFLICT,
                _ => StatusCode::GONE,
            };
            (status, error.to_string()).into_response()
        }
    }
}

async fn log_request(uri: Uri) -> StatusCode {
    log::info!("Got request for: {uri}");
    StatusCode::NOT_FOUND
}
