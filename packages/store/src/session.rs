//! Session store.
//!
//! Holds the one piece of global state the app has: who is signed in. The store is
//! inert until [`SessionStore::activate`] subscribes it to the auth-event stream;
//! [`SessionStore::load`] then performs the one-time "current session" lookup.
//! Dropping the returned [`Activation`] unsubscribes, after which the state is frozen.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use api::{AuthApi, Session, Subscription};

use crate::observable::{Observable, Observer};
use crate::policy::RequestPolicy;

#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub session: Option<Session>,
    /// True until the initial lookup or the first auth event settles the session.
    pub loading: bool,
    /// Set when the initial lookup failed rather than finding nobody signed in.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session: None,
            loading: true,
            error: None,
        }
    }
}

impl SessionState {
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.email.as_str())
    }
}

#[derive(Default)]
struct Runtime {
    active: Cell<bool>,
    /// Auth events applied since activation; a lookup started before one is stale.
    events_seen: Cell<u64>,
    subscription: RefCell<Option<Subscription>>,
}

impl Runtime {
    fn deactivate(&self) {
        self.active.set(false);
        self.subscription.borrow_mut().take();
    }
}

#[derive(Clone)]
pub struct SessionStore<A> {
    auth: A,
    policy: RequestPolicy,
    state: Observable<SessionState>,
    runtime: Rc<Runtime>,
}

impl<A: AuthApi + Clone + 'static> SessionStore<A> {
    pub fn new(auth: A, policy: RequestPolicy) -> Self {
        Self {
            auth,
            policy,
            state: Observable::new(SessionState::default()),
            runtime: Rc::new(Runtime::default()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn subscribe(&self, observer: impl Fn(&SessionState) + 'static) -> Observer {
        self.state.subscribe(observer)
    }

    pub fn is_active(&self) -> bool {
        self.runtime.active.get()
    }

    /// Start following auth events. Every event replaces the session wholesale.
    pub fn activate(&self) -> Activation {
        self.runtime.deactivate();
        self.runtime.active.set(true);
        self.state.update(|s| *s = SessionState::default());

        let state = self.state.clone();
        let runtime = Rc::downgrade(&self.runtime);
        let subscription = self.auth.on_auth_state_change(move |event, session| {
            let Some(runtime) = runtime.upgrade() else {
                return;
            };
            if !runtime.active.get() {
                return;
            }
            runtime.events_seen.set(runtime.events_seen.get() + 1);
            tracing::info!(?event, signed_in = session.is_some(), "Auth state changed");
            state.update(|s| {
                s.session = session;
                s.loading = false;
                s.error = None;
            });
        });
        *self.runtime.subscription.borrow_mut() = Some(subscription);

        Activation {
            runtime: Rc::clone(&self.runtime),
        }
    }

    /// Look up the current session once. A no-op unless active.
    pub async fn load(&self) {
        if !self.is_active() {
            return;
        }
        let seen = self.runtime.events_seen.get();
        let result = self
            .policy
            .read("Session lookup", || self.auth.get_session())
            .await;

        if !self.is_active() {
            tracing::debug!("Session store deactivated, dropping lookup result");
            return;
        }
        if self.runtime.events_seen.get() != seen {
            tracing::debug!("Auth event arrived during lookup, keeping the newer session");
            return;
        }

        match result {
            Ok(session) => self.state.update(|s| {
                s.session = session;
                s.loading = false;
                s.error = None;
            }),
            Err(e) => {
                tracing::error!("Failed to fetch session: {}", e);
                self.state.update(|s| {
                    s.session = None;
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    /// Sign out. The resulting `SignedOut` event clears the session.
    pub async fn sign_out(&self) -> api::ApiResult<()> {
        self.policy.mutation(self.auth.sign_out()).await
    }
}

/// Keeps a [`SessionStore`] subscribed to auth events. Dropping it deactivates the store.
#[must_use = "dropping the activation deactivates the store"]
pub struct Activation {
    runtime: Rc<Runtime>,
}

impl Activation {
    pub fn deactivate(self) {}
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.runtime.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use api::{ApiError, MemoryService, Operation};

    use super::*;

    fn store(service: &MemoryService) -> SessionStore<MemoryService> {
        SessionStore::new(
            service.clone(),
            RequestPolicy {
                timeout: Duration::from_millis(50),
                read_retries: 1,
            },
        )
    }

    async fn sign_in(service: &MemoryService) -> Session {
        service.add_account("me@example.com", "secret");
        service
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap()
            .session
            .unwrap()
    }

    #[tokio::test]
    async fn test_loading_until_lookup_settles() {
        let service = MemoryService::new();
        let store = store(&service);
        let _activation = store.activate();
        assert_eq!(store.state(), SessionState::default());

        store.load().await;
        let state = store.state();
        assert!(!state.loading);
        assert!(state.session.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_events_replace_session() {
        let service = MemoryService::new();
        let store = store(&service);
        let _activation = store.activate();
        store.load().await;

        let session = sign_in(&service).await;
        assert_eq!(store.state().user_id(), Some(session.user_id.as_str()));

        store.sign_out().await.unwrap();
        let state = store.state();
        assert!(state.session.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_deactivated_store_never_updates() {
        let service = MemoryService::new();
        let store = store(&service);
        let activation = store.activate();
        activation.deactivate();

        sign_in(&service).await;
        store.load().await;
        assert_eq!(store.state(), SessionState::default());
        assert_eq!(service.calls(Operation::GetSession), 0);
    }

    #[tokio::test]
    async fn test_late_lookup_result_is_dropped_after_deactivation() {
        let service = MemoryService::new();
        sign_in(&service).await;
        let store = store(&service);
        let activation = store.activate();

        let lookup = store.load();
        futures::pin_mut!(lookup);
        // First poll issues the request and suspends.
        assert!(futures::poll!(lookup.as_mut()).is_pending());
        drop(activation);
        lookup.await;

        assert!(store.state().loading);
        assert!(store.state().session.is_none());
    }

    #[tokio::test]
    async fn test_failed_lookup_sets_error() {
        let service = MemoryService::new();
        service.fail(
            Operation::GetSession,
            ApiError::Request {
                status: 503,
                message: "unavailable".to_string(),
            },
        );
        let store = store(&service);
        let _activation = store.activate();
        store.load().await;

        let state = store.state();
        assert!(!state.loading);
        assert!(state.session.is_none());
        assert_eq!(
            state.error.as_deref(),
            Some("request failed (503): unavailable")
        );
    }

    #[tokio::test]
    async fn test_hung_lookup_times_out_after_one_retry() {
        let service = MemoryService::new();
        service.stall(Operation::GetSession);
        let store = store(&service);
        let _activation = store.activate();
        store.load().await;

        let state = store.state();
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert_eq!(service.calls(Operation::GetSession), 2);
    }

    #[tokio::test]
    async fn test_event_during_lookup_wins() {
        let service = MemoryService::new();
        let store = store(&service);
        let _activation = store.activate();

        let lookup = store.load();
        futures::pin_mut!(lookup);
        assert!(futures::poll!(lookup.as_mut()).is_pending());
        // Lookup saw no session; the sign-in event lands first.
        let session = sign_in(&service).await;
        lookup.await;

        assert_eq!(store.state().user_id(), Some(session.user_id.as_str()));
    }

    #[tokio::test]
    async fn test_observers_follow_updates() {
        let service = MemoryService::new();
        let store = store(&service);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _observer = store.subscribe(move |s| sink.borrow_mut().push(s.loading));

        let _activation = store.activate();
        store.load().await;
        assert_eq!(*seen.borrow(), [true, false]);
    }

    #[tokio::test]
    async fn test_sign_out_elsewhere_clears_session() {
        let service = MemoryService::new();
        let store = store(&service);
        let _activation = store.activate();
        store.load().await;
        let session = sign_in(&service).await;
        assert_eq!(store.state().user_id(), Some(session.user_id.as_str()));

        service.push_session(None);
        assert!(store.state().session.is_none());

        service.push_session(Some(session.clone()));
        assert_eq!(store.state().user_id(), Some(session.user_id.as_str()));
    }
}
