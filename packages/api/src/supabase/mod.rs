//! # HTTP client for a Supabase-compatible backend
//!
//! [`SupabaseClient`] implements the three service traits against the REST surface of
//! a hosted project:
//!
//! | Trait | Endpoint family | Module |
//! |-------|-----------------|--------|
//! | [`AuthApi`](crate::AuthApi) | `/auth/v1` | [`auth`] |
//! | [`PostsTable`](crate::PostsTable) | `/rest/v1/{table}` | [`rest`] |
//! | [`ObjectStorage`](crate::ObjectStorage) | `/storage/v1/object` | [`storage`] |
//!
//! Every request carries the project's anon key in the `apikey` header and a bearer
//! token: the current session's access token when signed in, the anon key otherwise.
//! Row-level security on the server decides what that token may touch. Table and
//! storage requests renew a session that is about to expire before they are sent.
//!
//! The client is cheap to clone; clones share the HTTP connection pool, the current
//! session and the auth-event listeners.

mod auth;
mod rest;
mod storage;
mod wire;

use std::cell::RefCell;
use std::rc::Rc;

use reqwest::{Method, RequestBuilder, Response};

use crate::auth::{AuthEvents, SessionPersistence};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthChangeEvent, Session};

/// Client for the project's auth, table and storage services.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: Rc<ClientConfig>,
    session: Rc<RefCell<Option<Session>>>,
    persistence: SessionPersistence,
    events: AuthEvents,
}

/// Which service a response came from, for error classification.
#[derive(Clone, Copy)]
enum Service {
    Auth,
    Data,
}

impl SupabaseClient {
    /// Create a client. Fails if the config is incomplete.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            config: Rc::new(config),
            session: Rc::new(RefCell::new(None)),
            persistence: SessionPersistence::new(),
            events: AuthEvents::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    /// Bearer token for the next request.
    fn bearer(&self) -> String {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.access_token().to_string())
            .unwrap_or_else(|| self.config.service.anon_key.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.config.service.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Replace the current session, persist it and notify listeners.
    fn set_session(&self, session: Option<Session>, event: AuthChangeEvent) {
        match &session {
            Some(s) => self.persistence.save(s),
            None => self.persistence.clear(),
        }
        *self.session.borrow_mut() = session.clone();
        self.events.emit(event, session.as_ref());
    }

    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }
}

/// Turn a non-2xx response into an [`ApiError`].
async fn ensure_success(response: Response, service: Service) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = wire::error_message(&body);
    let status = status.as_u16();
    Err(match service {
        Service::Auth => ApiError::Auth { status, message },
        Service::Data => ApiError::Request { status, message },
    })
}

/// Seconds since the Unix epoch.
pub(crate) fn now_unix() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Date::now() / 1000.0) as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}
