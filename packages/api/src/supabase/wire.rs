//! JSON shapes of the auth, table and storage endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{AuthTokens, AuthUser, Session};

/// Lifetime assumed for an access token when the service reports neither expiry field.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl WireUser {
    pub fn into_user(self) -> AuthUser {
        let email_verified = self
            .user_metadata
            .get("email_verified")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(self.email_confirmed_at.is_some());
        AuthUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
            email_verified,
            raw_claims: self.user_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: WireUser,
}

impl WireSession {
    pub fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        Session::new(
            self.user.into_user(),
            AuthTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
        )
    }
}

/// Sign-up answers with a session, or with the bare user when confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpBody {
    Session(WireSession),
    User(WireUser),
}

#[derive(Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ImageUrlRow {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RemovePrefixes<'a> {
    pub prefixes: &'a [String],
}

/// Human-readable message from an error body of any of the three services.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            "unknown error".to_string()
        } else {
            trimmed.to_string()
        };
    };
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(serde_json::Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_grant_response() {
        let body: WireSession = serde_json::from_str(
            r#"{
                "access_token": "jwt",
                "token_type": "bearer",
                "expires_in": 3600,
                "expires_at": 1714003600,
                "refresh_token": "r1",
                "user": {
                    "id": "8d0f...",
                    "aud": "authenticated",
                    "email": "me@example.com",
                    "email_confirmed_at": "2024-05-01T10:00:00Z",
                    "user_metadata": { "email_verified": true }
                }
            }"#,
        )
        .unwrap();
        let session = body.into_session(0);
        assert_eq!(session.email, "me@example.com");
        assert!(session.email_verified);
        assert_eq!(session.tokens.expires_at, 1714003600);
        assert_eq!(session.raw_claims["email_verified"], true);
    }

    #[test]
    fn metadata_flag_overrides_confirmation_timestamp() {
        let user: WireUser = serde_json::from_str(
            r#"{"id": "u", "email": "x@y.z", "email_confirmed_at": "2024-01-01T00:00:00Z",
                "user_metadata": {"email_verified": false}}"#,
        )
        .unwrap();
        assert!(!user.into_user().email_verified);
    }

    #[test]
    fn missing_expiry_uses_expires_in() {
        let body: WireSession = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "r", "expires_in": 60,
                "user": {"id": "u", "email": "x@y.z"}}"#,
        )
        .unwrap();
        let session = body.into_session(1_000);
        assert_eq!(session.tokens.expires_at, 1_060);
        assert!(!session.email_verified);
    }

    #[test]
    fn sign_up_without_session_is_bare_user() {
        let body: SignUpBody = serde_json::from_str(
            r#"{"id": "u", "email": "x@y.z", "confirmation_sent_at": "2024-01-01T00:00:00Z",
                "user_metadata": {}}"#,
        )
        .unwrap();
        assert!(matches!(body, SignUpBody::User(_)));
    }

    #[test]
    fn error_messages_from_each_service() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"code":400,"msg":"User already registered"}"#), "User already registered");
        assert_eq!(
            error_message(r#"{"code":"42501","message":"new row violates row-level security policy"}"#),
            "new row violates row-level security policy"
        );
        assert_eq!(error_message(""), "unknown error");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
