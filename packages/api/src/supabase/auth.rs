//! Password auth against `/auth/v1`.

use reqwest::{Method, RequestBuilder};

use super::wire::{PasswordCredentials, RefreshGrant, SignUpBody, WireSession};
use super::{ensure_success, now_unix, Service, SupabaseClient};
use crate::auth::Subscription;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthChangeEvent, AuthResponse, Session};
use crate::service::AuthApi;

/// Refresh access tokens this many seconds before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

impl SupabaseClient {
    /// Exchange the refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> ApiResult<Session> {
        let response = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;
        let response = ensure_success(response, Service::Auth).await?;
        let body: WireSession = serde_json::from_str(&response.text().await?)?;
        Ok(body.into_session(now_unix()))
    }

    /// Refresh `session` when it expires within the margin.
    ///
    /// A refresh the service rejects ends the session and yields `None`; transport
    /// failures propagate and leave the session untouched.
    async fn renew(&self, session: Session) -> ApiResult<Option<Session>> {
        if !session.tokens.expires_within(now_unix(), REFRESH_MARGIN_SECS) {
            return Ok(Some(session));
        }
        match self.refresh(&session.tokens.refresh_token).await {
            Ok(refreshed) => {
                tracing::info!("Refreshed expiring session");
                self.set_session(Some(refreshed.clone()), AuthChangeEvent::TokenRefreshed);
                Ok(Some(refreshed))
            }
            Err(e) if e.is_remote_rejection() => {
                tracing::info!("Session could not be refreshed: {}", e);
                self.set_session(None, AuthChangeEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Build a table or storage request, renewing the session's access token first.
    pub(super) async fn authorized(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        if let Some(session) = self.current_session() {
            if self.renew(session).await?.is_none() {
                return Err(ApiError::NotAuthenticated);
            }
        }
        Ok(self.request(method, path))
    }
}

impl AuthApi for SupabaseClient {
    async fn get_session(&self) -> ApiResult<Option<Session>> {
        let Some(session) = self.current_session().or_else(|| self.persistence.load()) else {
            return Ok(None);
        };

        let renewed = self.renew(session).await?;
        if let Some(session) = &renewed {
            *self.session.borrow_mut() = Some(session.clone());
        }
        Ok(renewed)
    }

    fn on_auth_state_change(
        &self,
        listener: impl Fn(AuthChangeEvent, Option<Session>) + 'static,
    ) -> Subscription {
        self.events.subscribe(listener)
    }

    async fn sign_up(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let response = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let response = ensure_success(response, Service::Auth).await?;
        let body: SignUpBody = serde_json::from_str(&response.text().await?)?;

        Ok(match body {
            SignUpBody::Session(wire) => {
                let session = wire.into_session(now_unix());
                self.set_session(Some(session.clone()), AuthChangeEvent::SignedIn);
                AuthResponse::with_session(session)
            }
            SignUpBody::User(user) => AuthResponse::user_only(user.into_user()),
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let response = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let response = ensure_success(response, Service::Auth).await?;
        let body: WireSession = serde_json::from_str(&response.text().await?)?;
        let session = body.into_session(now_unix());
        self.set_session(Some(session.clone()), AuthChangeEvent::SignedIn);
        Ok(AuthResponse::with_session(session))
    }

    async fn sign_out(&self) -> ApiResult<()> {
        if self.current_session().is_none() {
            self.set_session(None, AuthChangeEvent::SignedOut);
            return Ok(());
        }

        let result = match self.request(Method::POST, "/auth/v1/logout").send().await {
            Ok(response) => ensure_success(response, Service::Auth).await.map(|_| ()),
            Err(e) => Err(ApiError::from(e)),
        };
        self.set_session(None, AuthChangeEvent::SignedOut);

        match result {
            // Token already revoked or expired: the session is gone either way.
            Err(ApiError::Auth { status: 401 | 403 | 404, .. }) => Ok(()),
            other => other,
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::config::ClientConfig;
    use crate::models::{AuthTokens, AuthUser, NewPost};
    use crate::service::PostsTable;

    const REFRESHED: &str = r#"{
        "access_token": "fresh-access",
        "refresh_token": "fresh-refresh",
        "expires_in": 3600,
        "user": { "id": "user-1", "email": "me@example.com" }
    }"#;

    /// Request line and bearer token of one request received by [`serve`].
    #[derive(Debug)]
    struct Received {
        line: String,
        bearer: Option<String>,
    }

    /// Answer one request per connection with the given replies, in order.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Received>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {status} Reply\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });
        (url, received)
    }

    async fn read_request(socket: &mut TcpStream) -> Received {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_len = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break buf.len();
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_len]).to_string();
        let header = |name: &str| {
            head.lines().find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name).then(|| value.trim().to_string())
            })
        };
        let body_len: usize = header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        while buf.len() < head_len + body_len {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        Received {
            line: head.lines().next().unwrap_or_default().to_string(),
            bearer: header("authorization").map(|v| v.trim_start_matches("Bearer ").to_string()),
        }
    }

    fn session_expiring_in(secs: i64) -> Session {
        Session::new(
            AuthUser {
                id: "user-1".to_string(),
                email: "me@example.com".to_string(),
                email_verified: true,
                raw_claims: serde_json::json!({}),
            },
            AuthTokens {
                access_token: "current-access".to_string(),
                refresh_token: "current-refresh".to_string(),
                expires_at: now_unix() + secs,
            },
        )
    }

    type Events = Rc<RefCell<Vec<AuthChangeEvent>>>;

    /// A client holding `session`, recording the auth events that follow.
    fn signed_in_client(url: &str, session: Session) -> (SupabaseClient, Events, Subscription) {
        let client = SupabaseClient::new(ClientConfig::new(url, "anon-key")).unwrap();
        client.set_session(Some(session), AuthChangeEvent::SignedIn);
        let events = Events::default();
        let sink = Rc::clone(&events);
        let subscription =
            client.on_auth_state_change(move |event, _| sink.borrow_mut().push(event));
        (client, events, subscription)
    }

    fn new_post() -> NewPost {
        NewPost {
            owner_id: "user-1".to_string(),
            title: "squat".to_string(),
            description: String::new(),
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_before_table_request() {
        let (url, received) = serve(vec![(200, REFRESHED), (201, "")]).await;
        let (client, events, _subscription) = signed_in_client(&url, session_expiring_in(5));

        client.insert(&new_post()).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert!(received[0]
            .line
            .starts_with("POST /auth/v1/token?grant_type=refresh_token"));
        assert!(received[1].line.starts_with("POST /rest/v1/posts"));
        assert_eq!(received[1].bearer.as_deref(), Some("fresh-access"));
        assert_eq!(*events.borrow(), [AuthChangeEvent::TokenRefreshed]);
        let session = client.current_session().unwrap();
        assert_eq!(session.access_token(), "fresh-access");
        assert_eq!(session.tokens.refresh_token, "fresh-refresh");
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out_without_sending_request() {
        let (url, received) = serve(vec![(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#,
        )])
        .await;
        let (client, events, _subscription) = signed_in_client(&url, session_expiring_in(-30));

        let err = client.list_for_owner("user-1").await.unwrap_err();

        assert!(matches!(err, ApiError::NotAuthenticated));
        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(*events.borrow(), [AuthChangeEvent::SignedOut]);
        assert!(client.current_session().is_none());
        assert!(client.persistence.load().is_none());
    }

    #[tokio::test]
    async fn test_valid_token_is_sent_as_is() {
        let (url, received) = serve(vec![(200, "[]")]).await;
        let (client, events, _subscription) = signed_in_client(&url, session_expiring_in(3600));

        assert!(client.list_for_owner("user-1").await.unwrap().is_empty());

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].line.starts_with("GET /rest/v1/posts?"));
        assert_eq!(received[0].bearer.as_deref(), Some("current-access"));
        assert!(events.borrow().is_empty());
    }
}
