//! Authentication context and hooks for the UI.

use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;
use store::{AuthGate as GateTracker, GateState, Observer, SessionState};

use crate::client::{make_services, use_services};

/// Current session state.
/// Returns a signal that updates on every sign-in, sign-out and token refresh.
pub fn use_auth() -> Signal<SessionState> {
    use_context::<Signal<SessionState>>()
}

/// Keeps the session store subscribed for as long as the provider is mounted.
struct Binding {
    _observer: Observer,
    activation: Option<store::Activation>,
}

/// Provider component that owns the service handles and the session state.
/// Wrap your app with this component to enable authentication.
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let auth_state = use_signal(SessionState::default);
    use_context_provider(|| auth_state);

    let services = use_hook(|| {
        let services = make_services().map_err(|e| e.to_string());
        match &services {
            Ok(services) => {
                provide_context(services.clone());
            }
            Err(message) => tracing::error!("Cannot start: {}", message),
        }
        services
    });

    let binding = use_hook(|| {
        let services = services.as_ref().ok()?;
        let observer = services.session.subscribe(move |state| {
            let mut auth_state = auth_state;
            auth_state.set(state.clone());
        });
        let activation = services.session.activate();
        let session = services.session.clone();
        spawn(async move { session.load().await });
        Some(Rc::new(RefCell::new(Binding {
            _observer: observer,
            activation: Some(activation),
        })))
    });

    use_drop(move || {
        let Some(binding) = binding else {
            return;
        };
        let activation = binding.borrow_mut().activation.take();
        if let Some(activation) = activation {
            activation.deactivate();
        }
    });

    if let Err(message) = services {
        return rsx! {
            div {
                class: "config-error",
                h1 { "FitGallery is not configured" }
                p { "{message}" }
            }
        };
    }

    rsx! {
        {children}
    }
}

/// Renders its children only while someone is signed in.
///
/// Shows a placeholder until the session settles and calls `on_unauthenticated`
/// whenever the state turns unauthenticated.
#[component]
pub fn AuthGate(children: Element, on_unauthenticated: EventHandler<()>) -> Element {
    let auth = use_auth();
    let tracker = use_hook(|| Rc::new(RefCell::new(GateTracker::new())));

    {
        let tracker = tracker.clone();
        use_effect(move || {
            let state = auth();
            let transition = tracker.borrow_mut().observe(&state);
            if let Some(transition) = transition {
                tracing::debug!(
                    authenticated = transition.to.is_authenticated(),
                    redirect = transition.to.should_redirect(),
                    "Gate changed"
                );
                if transition.to.should_redirect() {
                    on_unauthenticated.call(());
                }
            }
        });
    }

    match GateState::from(&auth()) {
        GateState::Loading => rsx! {
            div { class: "gate-loading", "Loading..." }
        },
        GateState::Unauthenticated => rsx! {},
        GateState::Authenticated(_) => rsx! {
            {children}
        },
    }
}

/// Button to log out the current user.
#[component]
pub fn LogoutButton(
    #[props(default = "Logout".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let services = use_services();
    let mut pending = use_signal(|| false);

    let onclick = move |_| {
        let services = services.clone();
        async move {
            pending.set(true);
            // The SignedOut event clears the session even when the call fails.
            if let Err(e) = services.session.sign_out().await {
                tracing::error!("Failed to sign out: {}", e);
            }
            pending.set(false);
        }
    };

    rsx! {
        button {
            class: "{class}",
            disabled: pending(),
            onclick: onclick,
            "{label}"
        }
    }
}
