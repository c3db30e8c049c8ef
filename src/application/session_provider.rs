// Identity port - per-token session lookup, change notifications and password auth
use crate::domain::session::Session;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("sign-up rejected: {0}")]
    Rejected(String),
    #[error("request to identity provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider responded with {status}: {message}")]
    Backend { status: u16, message: String },
}

/// Sign-in state change of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn { user_email: Option<String> },
    SignedOut { user_email: Option<String> },
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Session behind a caller's access token; `None` if unknown or expired.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError>;

    /// Receiver that observes every sign-in and sign-out.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Register a new user. `None` when the address must be confirmed first.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}
