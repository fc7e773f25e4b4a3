use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, oneshot};
use url::Url;

use crate::error::AuthError;
use crate::ports::authenticator::Authenticator;

const STATE_LENGTH: usize = 16;

/// Generate a random state parameter for CSRF protection
fn generate_state() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..STATE_LENGTH)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Hands exactly one authenticated client from the callback endpoint to the
/// waiting main flow.
///
/// One instance covers one login. The sender side is taken by the first
/// callback that completes a token exchange; any later callback is rejected.
pub struct AuthHandshake<A: Authenticator> {
    authenticator: A,
    state: String,
    sender: Mutex<Option<oneshot::Sender<A::Client>>>,
    receiver: Mutex<Option<oneshot::Receiver<A::Client>>>,
}

impl<A: Authenticator> std::fmt::Debug for AuthHandshake<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHandshake")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<A: Authenticator> AuthHandshake<A> {
    /// Creates a session with a fresh random state value.
    pub fn new(authenticator: A) -> Self {
        Self::with_state(authenticator, generate_state())
    }

    pub fn with_state(authenticator: A, state: impl Into<String>) -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            authenticator,
            state: state.into(),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Rejects a redirect that does not carry this login's state.
    pub fn check_state(&self, received_state: &str) -> Result<(), AuthError> {
        if received_state != self.state {
            log::warn!("State mismatch: {} != {}", received_state, self.state);
            return Err(AuthError::StateMismatch {
                expected: self.state.clone(),
                received: received_state.to_string(),
            });
        }
        Ok(())
    }

    /// The URL the user has to visit to log in.
    pub fn begin_login(&self) -> Url {
        self.authenticator.authorization_url(&self.state)
    }

    /// Waits until a callback delivered the client, or until `timeout` elapses.
    ///
    /// Only the first call receives the client.
    pub async fn await_client(&self, timeout: Duration) -> Result<A::Client, AuthError> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or(AuthError::AlreadyAwaited)?;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(_)) => Err(AuthError::ExchangeFailed(
                "login session closed before a client was delivered".to_string(),
            )),
            Err(_) => Err(AuthError::TimedOut(timeout)),
        }
    }

    /// Handles the redirect back from the authorization server.
    ///
    /// The state is checked before anything else; a mismatch never reaches the
    /// token exchange. Concurrent callbacks are serialized, and once a client
    /// was delivered every further callback fails with `AlreadyDelivered`.
    pub async fn on_callback(&self, received_state: &str, code: &str) -> Result<(), AuthError> {
        self.check_state(received_state)?;

        let mut sender = self.sender.lock().await;
        if sender.is_none() {
            return Err(AuthError::AlreadyDelivered);
        }

        let client = self.authenticator.exchange_token(code).await?;

        let Some(sender) = sender.take() else {
            return Err(AuthError::AlreadyDelivered);
        };
        sender.send(client).map_err(|_| AuthError::ConsumerGone)?;
        log::info!("Login completed");
        Ok(())
    }
}
