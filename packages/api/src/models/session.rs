//! # Session model for authenticated users
//!
//! Defines the client-side view of an authenticated identity:
//!
//! ## [`Session`]
//!
//! The identity of the signed-in user as issued by the auth service, plus the tokens
//! needed to authorize table and storage requests on their behalf:
//!
//! - `user_id`: the auth user's id; every post row is owned by it.
//! - `email`: the address the account was registered with.
//! - `email_verified`: whether the address has been confirmed. Taken from
//!   `user_metadata.email_verified` when the service reports it, otherwise from
//!   the presence of `email_confirmed_at`.
//! - `raw_claims`: the untouched `user_metadata` object.
//! - `tokens`: access/refresh token pair with its expiry.
//!
//! A session is only ever replaced wholesale; nothing mutates one in place.
//!
//! ## [`AuthUser`]
//!
//! The user record alone. Sign-up returns just this when the project requires email
//! confirmation before a session is issued.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of change reported on the auth-event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A user record as reported by the auth service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub raw_claims: serde_json::Value,
}

/// Access and refresh tokens for a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which `access_token` is rejected.
    pub expires_at: i64,
}

impl AuthTokens {
    /// Whether the access token expires within `margin_secs` of `now`.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at - now <= margin_secs
    }
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The authenticated identity of the current user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub raw_claims: serde_json::Value,
    pub tokens: AuthTokens,
}

impl Session {
    pub fn new(user: AuthUser, tokens: AuthTokens) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            email_verified: user.email_verified,
            raw_claims: user.raw_claims,
            tokens,
        }
    }

    /// The user record this session was issued for.
    pub fn user(&self) -> AuthUser {
        AuthUser {
            id: self.user_id.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            raw_claims: self.raw_claims.clone(),
        }
    }

    /// Bearer token for authorized requests.
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }
}

/// Result of a sign-up or password sign-in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthResponse {
    pub session: Option<Session>,
    pub user: Option<AuthUser>,
}

impl AuthResponse {
    pub fn with_session(session: Session) -> Self {
        Self {
            user: Some(session.user()),
            session: Some(session),
        }
    }

    pub fn user_only(user: AuthUser) -> Self {
        Self {
            session: None,
            user: Some(user),
        }
    }

    /// Verification flag of the returned account, if any account was returned.
    pub fn email_verified(&self) -> Option<bool> {
        self.session
            .as_ref()
            .map(|s| s.email_verified)
            .or_else(|| self.user.as_ref().map(|u| u.email_verified))
    }
}
