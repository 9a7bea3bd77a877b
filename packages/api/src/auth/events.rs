//! Observer list for auth-state changes.
//!
//! Backends call [`AuthEvents::emit`] after every sign-in, sign-out and token refresh.
//! Listeners stay registered for as long as the returned [`Subscription`] is alive.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::models::{AuthChangeEvent, Session};

type Listener = Rc<dyn Fn(AuthChangeEvent, Option<Session>)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Fan-out of auth-state changes to registered listeners.
#[derive(Clone, Default)]
pub struct AuthEvents {
    listeners: Rc<RefCell<Listeners>>,
}

impl AuthEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It is called for every event until the subscription is dropped.
    pub fn subscribe(
        &self,
        listener: impl Fn(AuthChangeEvent, Option<Session>) + 'static,
    ) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Deliver an event to every current listener.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        // Snapshot so listeners may subscribe or unsubscribe while being notified.
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        tracing::debug!(?event, listeners = snapshot.len(), "auth state changed");
        for listener in snapshot {
            listener(event, session.cloned());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

/// Handle to a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn delivers_until_unsubscribed() {
        let events = AuthEvents::new();
        let seen = Rc::new(Cell::new(0));

        let counter = Rc::clone(&seen);
        let subscription = events.subscribe(move |_, _| counter.set(counter.get() + 1));
        events.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(seen.get(), 1);
        assert_eq!(events.listener_count(), 1);

        subscription.unsubscribe();
        events.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(seen.get(), 1);
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let events = AuthEvents::new();
        let subscription = events.subscribe(|_, _| {});
        drop(events);
        drop(subscription);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_emit() {
        let events = AuthEvents::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let inner = Rc::clone(&slot);
        let subscription = events.subscribe(move |_, _| {
            inner.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(subscription);

        events.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(events.listener_count(), 0);
    }
}
