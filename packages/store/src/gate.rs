use std::mem;

use api::Session;

use crate::session::SessionState;

/// What a protected page should do, derived from the session state alone.
#[derive(Clone, Debug, PartialEq)]
pub enum GateState {
    /// The session is not settled yet; show a placeholder.
    Loading,
    Authenticated(Session),
    /// Nobody is signed in; send the user to the credential form.
    Unauthenticated,
}

impl GateState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            GateState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, GateState::Authenticated(_))
    }

    pub fn should_redirect(&self) -> bool {
        matches!(self, GateState::Unauthenticated)
    }

    fn same_kind(&self, other: &GateState) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl From<&SessionState> for GateState {
    fn from(state: &SessionState) -> Self {
        match (&state.session, state.loading) {
            (_, true) => GateState::Loading,
            (Some(session), false) => GateState::Authenticated(session.clone()),
            (None, false) => GateState::Unauthenticated,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GateTransition {
    pub from: GateState,
    pub to: GateState,
}

/// Tracks the gate state across session updates and reports its edges.
#[derive(Clone, Debug)]
pub struct AuthGate {
    current: GateState,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self {
            current: GateState::Loading,
        }
    }
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &GateState {
        &self.current
    }

    /// Feed the latest session state. Returns a transition only when the kind of state
    /// changed; a refreshed token for the same user is not an edge.
    pub fn observe(&mut self, state: &SessionState) -> Option<GateTransition> {
        let next = GateState::from(state);
        if next.same_kind(&self.current) {
            self.current = next;
            return None;
        }
        let from = mem::replace(&mut self.current, next.clone());
        Some(GateTransition { from, to: next })
    }
}

#[cfg(test)]
mod tests {
    use api::{AuthTokens, AuthUser};

    use super::*;

    fn session(token: &str) -> Session {
        Session::new(
            AuthUser {
                id: "user-1".to_string(),
                email: "me@example.com".to_string(),
                email_verified: true,
                raw_claims: serde_json::Value::Null,
            },
            AuthTokens {
                access_token: token.to_string(),
                refresh_token: "r".to_string(),
                expires_at: 0,
            },
        )
    }

    fn state(session: Option<Session>, loading: bool) -> SessionState {
        SessionState {
            session,
            loading,
            error: None,
        }
    }

    #[test]
    fn protected_content_iff_settled_with_session() {
        for loading in [true, false] {
            for session in [None, Some(session("a"))] {
                let expected = !loading && session.is_some();
                let gate = GateState::from(&state(session, loading));
                assert_eq!(gate.is_authenticated(), expected);
            }
        }
    }

    #[test]
    fn failed_lookup_is_unauthenticated() {
        let mut failed = state(None, false);
        failed.error = Some("unreachable".to_string());
        assert!(GateState::from(&failed).should_redirect());
    }

    #[test]
    fn observe_reports_edges_only() {
        let mut gate = AuthGate::new();
        assert_eq!(gate.observe(&state(None, true)), None);

        let t = gate.observe(&state(Some(session("a")), false)).unwrap();
        assert_eq!(t.from, GateState::Loading);
        assert!(t.to.is_authenticated());

        // Token refresh keeps the same kind.
        assert_eq!(gate.observe(&state(Some(session("b")), false)), None);
        assert_eq!(
            gate.current().session().map(|s| s.tokens.access_token.as_str()),
            Some("b")
        );

        let t = gate.observe(&state(None, false)).unwrap();
        assert!(t.from.is_authenticated());
        assert_eq!(t.to, GateState::Unauthenticated);

        // Directly back to authenticated, no loading in between.
        let t = gate.observe(&state(Some(session("c")), false)).unwrap();
        assert_eq!(t.from, GateState::Unauthenticated);
    }
}
