// GoTrue session provider - password auth and token lookup against the hosted identity service
use crate::application::session_provider::{AuthError, SessionChange, SessionProvider};
use crate::domain::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

const CHANGE_CAPACITY: usize = 32;

pub struct GoTrueProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    /// Sessions issued through this provider, keyed by access token.
    issued: RwLock<HashMap<String, Session>>,
    changes: broadcast::Sender<SessionChange>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueError {
    #[serde(alias = "error_description", alias = "msg")]
    message: String,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            user_email: self.user.and_then(|u| u.email),
        }
    }
}

impl GoTrueProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
            issued: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn post_credentials(&self, path: &str, email: &str, password: &str) -> Result<reqwest::Response, AuthError> {
        Ok(self
            .client
            .post(self.auth_url(path))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?)
    }

    async fn remember(&self, session: &Session) {
        self.issued
            .write()
            .await
            .insert(session.access_token.clone(), session.clone());
        // No subscribers is fine
        let _ = self.changes.send(SessionChange::SignedIn {
            user_email: session.user_email.clone(),
        });
    }

    /// Ask the identity service who owns a token this provider did not issue.
    async fn lookup_user(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: error_message(response.text().await.unwrap_or_default()),
            });
        }

        let user = response.json::<TokenUser>().await?;
        Ok(Some(Session {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
            user_email: user.email,
        }))
    }
}

fn error_message(body: String) -> String {
    serde_json::from_str::<GoTrueError>(&body)
        .map(|e| e.message)
        .unwrap_or(body)
}

#[async_trait]
impl SessionProvider for GoTrueProvider {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let cached = self.issued.read().await.get(access_token).cloned();
        match cached {
            Some(session) if session.is_expired(Utc::now()) => {
                self.issued.write().await.remove(access_token);
                Ok(None)
            }
            Some(session) => Ok(Some(session)),
            None => self.lookup_user(access_token).await,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .post_credentials("token?grant_type=password", email, password)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default());
            tracing::warn!("Sign-in failed for {}: {}", email, message);
            return Err(if status.is_client_error() {
                AuthError::InvalidCredentials(message)
            } else {
                AuthError::Backend {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let session = response.json::<TokenResponse>().await?.into_session();
        self.remember(&session).await;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let response = self.post_credentials("signup", email, password).await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default());
            tracing::warn!("Sign-up failed for {}: {}", email, message);
            return Err(if status.is_client_error() {
                AuthError::Rejected(message)
            } else {
                AuthError::Backend {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        // With email confirmation enabled only the user comes back.
        let body = response.json::<Value>().await?;
        match signed_up_session(body) {
            Some(session) => {
                self.remember(&session).await;
                Ok(Some(session))
            }
            None => {
                tracing::info!("Sign-up for {} awaits email confirmation", email);
                Ok(None)
            }
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        self.issued.write().await.remove(&session.access_token);
        let _ = self.changes.send(SessionChange::SignedOut {
            user_email: session.user_email.clone(),
        });

        // The local session is gone either way; a failed logout only leaves
        // the token to expire on its own.
        match self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
        {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!("Identity provider rejected logout: {}", response.status());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Logout request failed: {}", e),
        }
        Ok(())
    }
}

fn signed_up_session(body: Value) -> Option<Session> {
    if body.get("access_token").is_none() {
        return None;
    }
    serde_json::from_value::<TokenResponse>(body)
        .ok()
        .map(TokenResponse::into_session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offline() -> GoTrueProvider {
        GoTrueProvider::new("http://127.0.0.1:9".to_string(), "anon".to_string())
    }

    fn session(token: &str, expires_in: i64) -> Session {
        Session {
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
            user_email: Some(format!("{}@example.com", token)),
        }
    }

    #[test]
    fn test_token_response_into_session() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"at","refresh_token":"rt","expires_at":1700000000,"user":{"email":"ops@example.com"}}"#,
        )
        .unwrap();
        let session = response.into_session();
        assert_eq!(session.access_token, "at");
        assert_eq!(session.refresh_token.as_deref(), Some("rt"));
        assert_eq!(session.expires_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(session.user_email.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#.into()),
            "Invalid login credentials"
        );
        assert_eq!(error_message("gateway timeout".into()), "gateway timeout");
    }

    #[test]
    fn test_sign_up_without_token_awaits_confirmation() {
        let pending = serde_json::json!({"id": "u1", "email": "new@example.com"});
        assert!(signed_up_session(pending).is_none());

        let confirmed = serde_json::json!({
            "access_token": "at",
            "user": {"email": "new@example.com"}
        });
        assert_eq!(signed_up_session(confirmed).unwrap().access_token, "at");
    }

    #[tokio::test]
    async fn test_issued_sessions_are_kept_per_token() {
        let provider = offline();
        let mut changes = provider.subscribe();
        provider.remember(&session("alice", 60)).await;
        provider.remember(&session("bob", 60)).await;

        let alice = provider.get_session("alice").await.unwrap().unwrap();
        assert_eq!(alice.user_email.as_deref(), Some("alice@example.com"));
        let bob = provider.get_session("bob").await.unwrap().unwrap();
        assert_eq!(bob.user_email.as_deref(), Some("bob@example.com"));
        assert!(matches!(changes.recv().await, Ok(SessionChange::SignedIn { .. })));
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let provider = offline();
        provider.remember(&session("stale", -5)).await;
        assert!(provider.get_session("stale").await.unwrap().is_none());
        assert!(provider.issued.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_forgets_only_that_session() {
        let provider = offline();
        let alice = session("alice", 60);
        provider.remember(&alice).await;
        provider.remember(&session("bob", 60)).await;
        let mut changes = provider.subscribe();

        provider.sign_out(&alice).await.unwrap();

        let issued = provider.issued.read().await;
        assert!(!issued.contains_key("alice"));
        assert!(issued.contains_key("bob"));
        assert_eq!(
            changes.recv().await.unwrap(),
            SessionChange::SignedOut {
                user_email: Some("alice@example.com".to_string())
            }
        );
    }
}
