// Session domain model - signed-in operator and the route guard built on it
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const HOME_PATH: &str = "/admin";
pub const SIGN_IN_PATH: &str = "/signin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Pass,
    Redirect(&'static str),
}

fn is_public(path: &str) -> bool {
    if path == "/healthz" || path.starts_with("/auth/") {
        return true;
    }
    // Static files
    path.rsplit('/').next().is_some_and(|last| last.contains('.'))
}

/// Decide whether a request for `path` may proceed.
///
/// An expired session counts as no session.
pub fn guard(path: &str, session: Option<&Session>, now: DateTime<Utc>) -> RouteDecision {
    if is_public(path) {
        return RouteDecision::Pass;
    }

    let signed_in = session.is_some_and(|s| !s.is_expired(now));

    if path == "/" {
        return RouteDecision::Redirect(if signed_in { HOME_PATH } else { SIGN_IN_PATH });
    }

    match (signed_in, path.starts_with(SIGN_IN_PATH)) {
        (true, true) => RouteDecision::Redirect(HOME_PATH),
        (false, false) => RouteDecision::Redirect(SIGN_IN_PATH),
        _ => RouteDecision::Pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: i64) -> Session {
        Session {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
            user_email: Some("ops@example.com".to_string()),
        }
    }

    #[test]
    fn test_root_redirects_by_session() {
        let now = Utc::now();
        assert_eq!(guard("/", None, now), RouteDecision::Redirect(SIGN_IN_PATH));
        assert_eq!(guard("/", Some(&session(60)), now), RouteDecision::Redirect(HOME_PATH));
    }

    #[test]
    fn test_signed_in_user_leaves_sign_in_page() {
        let now = Utc::now();
        assert_eq!(guard("/signin", Some(&session(60)), now), RouteDecision::Redirect(HOME_PATH));
        assert_eq!(guard("/signin", None, now), RouteDecision::Pass);
    }

    #[test]
    fn test_protected_paths_need_a_live_session() {
        let now = Utc::now();
        assert_eq!(guard("/admin/tables", None, now), RouteDecision::Redirect(SIGN_IN_PATH));
        assert_eq!(
            guard("/admin/tables", Some(&session(-5)), now),
            RouteDecision::Redirect(SIGN_IN_PATH)
        );
        assert_eq!(guard("/admin/tables", Some(&session(60)), now), RouteDecision::Pass);
    }

    #[test]
    fn test_public_paths_always_pass() {
        let now = Utc::now();
        assert_eq!(guard("/healthz", None, now), RouteDecision::Pass);
        assert_eq!(guard("/auth/signin", None, now), RouteDecision::Pass);
        assert_eq!(guard("/favicon.ico", None, now), RouteDecision::Pass);
    }
}
