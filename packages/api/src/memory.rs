//! In-memory stand-in for the hosted backend.
//!
//! [`MemoryService`] implements every service trait over shared local state. Tests use
//! its controls to inject failures, hang calls, delay responses and count round trips.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::task::Poll;

use chrono::{DateTime, Utc};

use crate::auth::{AuthEvents, Subscription};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuthChangeEvent, AuthResponse, AuthTokens, AuthUser, NewPost, Post, PostPatch, Session,
};
use crate::service::{AuthApi, ObjectStorage, PostsTable};
use crate::storage::{key_from_public_url, public_object_url};

const BASE_URL: &str = "https://memory.local";
const BUCKET: &str = "post-images";
/// Rows are timestamped from here on, one second apart, in insertion order.
const EPOCH: i64 = 1_700_000_000;

/// Remote operations, for failure injection and call counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSession,
    SignUp,
    SignIn,
    SignOut,
    List,
    Insert,
    Update,
    Delete,
    ImageUrl,
    Upload,
    Remove,
}

#[derive(Clone, Debug)]
struct Account {
    id: String,
    password: String,
    verified: bool,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    posts: Vec<Post>,
    objects: HashMap<String, Vec<u8>>,
    failures: HashMap<Operation, ApiError>,
    stalled: Vec<Operation>,
    lagging: HashMap<Operation, usize>,
    calls: HashMap<Operation, usize>,
    next_id: u64,
    require_confirmation: bool,
}

/// In-memory backend for tests and offline demos.
///
/// Behaves like the hosted service from the client's point of view: every call
/// suspends once before resolving, rows are only visible to their owner, and sign-up
/// can be configured to leave accounts unverified.
#[derive(Clone, Default)]
pub struct MemoryService {
    state: Rc<RefCell<State>>,
    events: AuthEvents,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// New accounts start unverified and sign-up returns no session.
    pub fn requiring_email_confirmation() -> Self {
        let service = Self::new();
        service.state.borrow_mut().require_confirmation = true;
        service
    }

    /// Create a verified account without going through sign-up.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let mut state = self.state.borrow_mut();
        let id = next_id(&mut state, "user");
        state.accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                password: password.to_string(),
                verified: true,
            },
        );
        id
    }

    /// Mark an account's email as confirmed.
    pub fn confirm_email(&self, email: &str) {
        if let Some(account) = self.state.borrow_mut().accounts.get_mut(email) {
            account.verified = true;
        }
    }

    /// Make every call of `op` fail with `error` until [`MemoryService::recover`].
    pub fn fail(&self, op: Operation, error: ApiError) {
        self.state.borrow_mut().failures.insert(op, error);
    }

    /// Make every call of `op` hang until [`MemoryService::recover`].
    pub fn stall(&self, op: Operation) {
        self.state.borrow_mut().stalled.push(op);
    }

    /// Hold the response of the next call of `op` for `turns` extra executor turns
    /// after its result has been computed.
    pub fn lag(&self, op: Operation, turns: usize) {
        self.state.borrow_mut().lagging.insert(op, turns);
    }

    pub fn recover(&self, op: Operation) {
        let mut state = self.state.borrow_mut();
        state.failures.remove(&op);
        state.stalled.retain(|o| *o != op);
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: Operation) -> usize {
        self.state.borrow().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every stored row, regardless of owner.
    pub fn rows(&self) -> Vec<Post> {
        self.state.borrow().posts.clone()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.borrow().objects.get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Replace the session as if another tab had changed it, and notify listeners.
    pub fn push_session(&self, session: Option<Session>) {
        let event = if session.is_some() {
            AuthChangeEvent::SignedIn
        } else {
            AuthChangeEvent::SignedOut
        };
        self.state.borrow_mut().session = session.clone();
        self.events.emit(event, session.as_ref());
    }

    /// Record a call, suspend once, then apply any injected failure.
    async fn enter(&self, op: Operation) -> ApiResult<()> {
        *self.state.borrow_mut().calls.entry(op).or_insert(0) += 1;
        settle().await;
        if self.state.borrow().stalled.contains(&op) {
            std::future::pending::<()>().await;
        }
        match self.state.borrow().failures.get(&op) {
            Some(error) => Err(clone_error(error)),
            None => Ok(()),
        }
    }

    /// Apply a pending [`MemoryService::lag`] of `op`, once.
    async fn linger(&self, op: Operation) {
        let turns = self.state.borrow_mut().lagging.remove(&op).unwrap_or(0);
        for _ in 0..turns {
            settle().await;
        }
    }

    fn caller(&self) -> Option<String> {
        self.state.borrow().session.as_ref().map(|s| s.user_id.clone())
    }

    fn issue_session(&self, account: &Account, email: &str) -> Session {
        let mut state = self.state.borrow_mut();
        let n = next_id(&mut state, "token");
        Session::new(
            AuthUser {
                id: account.id.clone(),
                email: email.to_string(),
                email_verified: account.verified,
                raw_claims: serde_json::json!({ "email_verified": account.verified }),
            },
            AuthTokens {
                access_token: format!("access-{n}"),
                refresh_token: format!("refresh-{n}"),
                expires_at: i64::MAX,
            },
        )
    }

    fn start_session(&self, session: Session) {
        self.state.borrow_mut().session = Some(session.clone());
        self.events.emit(AuthChangeEvent::SignedIn, Some(&session));
    }
}

fn next_id(state: &mut State, prefix: &str) -> String {
    state.next_id += 1;
    format!("{prefix}-{}", state.next_id)
}

/// `ApiError` wraps non-cloneable transport errors; injected failures never use those.
fn clone_error(error: &ApiError) -> ApiError {
    match error {
        ApiError::Auth { status, message } => ApiError::Auth {
            status: *status,
            message: message.clone(),
        },
        ApiError::Request { status, message } => ApiError::Request {
            status: *status,
            message: message.clone(),
        },
        ApiError::Timeout(d) => ApiError::Timeout(*d),
        ApiError::NotAuthenticated => ApiError::NotAuthenticated,
        other => ApiError::Config(other.to_string()),
    }
}

fn rls_violation() -> ApiError {
    ApiError::Request {
        status: 403,
        message: "new row violates row-level security policy".to_string(),
    }
}

impl AuthApi for MemoryService {
    async fn get_session(&self) -> ApiResult<Option<Session>> {
        self.enter(Operation::GetSession).await?;
        Ok(self.state.borrow().session.clone())
    }

    fn on_auth_state_change(
        &self,
        listener: impl Fn(AuthChangeEvent, Option<Session>) + 'static,
    ) -> Subscription {
        self.events.subscribe(listener)
    }

    async fn sign_up(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.enter(Operation::SignUp).await?;
        if self.state.borrow().accounts.contains_key(email) {
            return Err(ApiError::Auth {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let confirm = self.state.borrow().require_confirmation;
        let account = {
            let mut state = self.state.borrow_mut();
            let account = Account {
                id: next_id(&mut state, "user"),
                password: password.to_string(),
                verified: !confirm,
            };
            state.accounts.insert(email.to_string(), account.clone());
            account
        };

        if confirm {
            return Ok(AuthResponse::user_only(AuthUser {
                id: account.id,
                email: email.to_string(),
                email_verified: false,
                raw_claims: serde_json::json!({ "email_verified": false }),
            }));
        }
        let session = self.issue_session(&account, email);
        self.start_session(session.clone());
        Ok(AuthResponse::with_session(session))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.enter(Operation::SignIn).await?;
        let account = self
            .state
            .borrow()
            .accounts
            .get(email)
            .filter(|a| a.password == password)
            .cloned();
        let Some(account) = account else {
            return Err(ApiError::Auth {
                status: 400,
                message: "Invalid login credentials".to_string(),
            });
        };
        let session = self.issue_session(&account, email);
        self.start_session(session.clone());
        Ok(AuthResponse::with_session(session))
    }

    async fn sign_out(&self) -> ApiResult<()> {
        let result = self.enter(Operation::SignOut).await;
        self.state.borrow_mut().session = None;
        self.events.emit(AuthChangeEvent::SignedOut, None);
        result
    }
}

impl PostsTable for MemoryService {
    async fn list_for_owner(&self, owner_id: &str) -> ApiResult<Vec<Post>> {
        self.enter(Operation::List).await?;
        let caller = self.caller();
        let mut posts: Vec<Post> = self
            .state
            .borrow()
            .posts
            .iter()
            .filter(|p| p.owner_id == owner_id && caller.as_deref() == Some(owner_id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.linger(Operation::List).await;
        Ok(posts)
    }

    async fn insert(&self, post: &NewPost) -> ApiResult<()> {
        self.enter(Operation::Insert).await?;
        if self.caller().as_deref() != Some(post.owner_id.as_str()) {
            return Err(rls_violation());
        }
        let mut state = self.state.borrow_mut();
        let id = next_id(&mut state, "post");
        let created_at =
            DateTime::<Utc>::from_timestamp(EPOCH + state.next_id as i64, 0).unwrap_or_default();
        state.posts.push(Post {
            id,
            owner_id: post.owner_id.clone(),
            title: post.title.clone(),
            description: Some(post.description.clone()),
            image_url: Some(post.image_url.clone()),
            created_at,
        });
        Ok(())
    }

    async fn update(&self, id: &str, owner_id: &str, patch: &PostPatch) -> ApiResult<()> {
        self.enter(Operation::Update).await?;
        let caller = self.caller();
        let mut state = self.state.borrow_mut();
        for post in state
            .posts
            .iter_mut()
            .filter(|p| p.id == id && p.owner_id == owner_id && caller.as_deref() == Some(owner_id))
        {
            post.title = patch.title.clone();
            post.description = Some(patch.description.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: &str, owner_id: &str) -> ApiResult<()> {
        self.enter(Operation::Delete).await?;
        let caller = self.caller();
        self.state.borrow_mut().posts.retain(|p| {
            !(p.id == id && p.owner_id == owner_id && caller.as_deref() == Some(owner_id))
        });
        Ok(())
    }

    async fn image_url(&self, id: &str) -> ApiResult<Option<String>> {
        self.enter(Operation::ImageUrl).await?;
        let caller = self.caller();
        Ok(self
            .state
            .borrow()
            .posts
            .iter()
            .find(|p| p.id == id && caller.as_deref() == Some(p.owner_id.as_str()))
            .and_then(|p| p.image_url.clone())
            .filter(|url| !url.is_empty()))
    }
}

impl ObjectStorage for MemoryService {
    async fn upload(&self, key: &str, bytes: Vec<u8>, _content_type: Option<&str>) -> ApiResult<()> {
        self.enter(Operation::Upload).await?;
        let mut state = self.state.borrow_mut();
        if state.objects.contains_key(key) {
            return Err(ApiError::Request {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(BASE_URL, BUCKET, key)
    }

    async fn remove(&self, keys: &[String]) -> ApiResult<()> {
        self.enter(Operation::Remove).await?;
        let mut state = self.state.borrow_mut();
        for key in keys {
            state.objects.remove(key);
        }
        Ok(())
    }

    fn key_from_public_url(&self, url: &str) -> Option<String> {
        key_from_public_url(url, BUCKET)
    }
}

/// Yields to the executor exactly once, like a network round trip would.
async fn settle() {
    let mut yielded = false;
    futures::future::poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    async fn signed_in(service: &MemoryService) -> Session {
        service.add_account("me@example.com", "secret");
        service
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap()
            .session
            .unwrap()
    }

    fn new_post(owner: &str, title: &str) -> NewPost {
        NewPost {
            owner_id: owner.to_string(),
            title: title.to_string(),
            description: String::new(),
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_and_newest_first() {
        let service = MemoryService::new();
        let me = signed_in(&service).await;

        for title in ["t1", "t2", "t3"] {
            service.insert(&new_post(&me.user_id, title)).await.unwrap();
        }
        let titles: Vec<String> = service
            .list_for_owner(&me.user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["t3", "t2", "t1"]);

        assert!(service.list_for_owner("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_for_other_owner_is_rejected() {
        let service = MemoryService::new();
        signed_in(&service).await;
        let err = service.insert(&new_post("intruder", "x")).await.unwrap_err();
        assert!(matches!(err, ApiError::Request { status: 403, .. }));
        assert!(service.rows().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_require_matching_owner() {
        let service = MemoryService::new();
        let me = signed_in(&service).await;
        service.insert(&new_post(&me.user_id, "mine")).await.unwrap();
        let id = service.rows()[0].id.clone();

        service.delete(&id, "someone-else").await.unwrap();
        assert_eq!(service.rows().len(), 1);

        let patch = PostPatch {
            title: "edited".to_string(),
            description: "d".to_string(),
        };
        service.update(&id, &me.user_id, &patch).await.unwrap();
        assert_eq!(service.rows()[0].title, "edited");

        service.delete(&id, &me.user_id).await.unwrap();
        assert!(service.rows().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_emits_event_and_sign_out_clears() {
        let service = MemoryService::new();
        let events = Rc::new(Cell::new(0));
        let counter = Rc::clone(&events);
        let _subscription = service.on_auth_state_change(move |_, _| counter.set(counter.get() + 1));

        signed_in(&service).await;
        assert!(service.get_session().await.unwrap().is_some());

        service.sign_out().await.unwrap();
        assert!(service.get_session().await.unwrap().is_none());
        assert_eq!(events.get(), 2);
    }

    #[tokio::test]
    async fn test_confirmation_flow() {
        let service = MemoryService::requiring_email_confirmation();
        let response = service.sign_up("new@example.com", "pw").await.unwrap();
        assert!(response.session.is_none());
        assert_eq!(response.email_verified(), Some(false));

        let response = service.sign_in_with_password("new@example.com", "pw").await.unwrap();
        assert_eq!(response.email_verified(), Some(false));

        service.confirm_email("new@example.com");
        let response = service.sign_in_with_password("new@example.com", "pw").await.unwrap();
        assert_eq!(response.email_verified(), Some(true));
    }

    #[tokio::test]
    async fn test_injected_failures_and_call_counts() {
        let service = MemoryService::new();
        service.fail(
            Operation::Upload,
            ApiError::Request {
                status: 500,
                message: "boom".to_string(),
            },
        );
        assert!(service.upload("k", vec![1], None).await.is_err());
        assert_eq!(service.calls(Operation::Upload), 1);

        service.recover(Operation::Upload);
        service.upload("k", vec![1], None).await.unwrap();
        assert_eq!(service.object("k"), Some(vec![1]));

        let url = service.public_url("k");
        assert_eq!(service.key_from_public_url(&url).as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_lagged_list_returns_its_earlier_snapshot() {
        let service = MemoryService::new();
        let me = signed_in(&service).await;
        service.lag(Operation::List, 8);

        let late = new_post(&me.user_id, "late");
        let (listed, inserted) = futures::join!(
            service.list_for_owner(&me.user_id),
            service.insert(&late),
        );
        inserted.unwrap();
        assert!(listed.unwrap().is_empty());
        assert_eq!(service.list_for_owner(&me.user_id).await.unwrap().len(), 1);
    }
}
