//! Sign-up / log-in page.

use dioxus::prelude::*;
use store::{authenticate, CredentialForm};

use crate::{use_auth, use_services};

/// Credential form. Calls `on_authenticated` after a verified sign-in.
#[component]
pub fn AuthPageView(on_authenticated: EventHandler<()>) -> Element {
    let services = use_services();
    let auth = use_auth();
    let mut form = use_signal(CredentialForm::new);

    let handle_submit = move |evt: FormEvent| {
        evt.prevent_default();
        let Some(credentials) = form.write().begin_submit() else {
            return;
        };
        let mode = form.peek().mode;
        let services = services.clone();
        spawn(async move {
            let outcome =
                authenticate(&services.client, &services.policy, mode, &credentials).await;
            form.write().finish_submit(&outcome);
            if outcome.should_navigate() {
                on_authenticated.call(());
            }
        });
    };

    let current = form();

    rsx! {
        div {
            class: "auth-page",

            h1 { class: "auth-title", "{current.mode.title()}" }

            if auth().error.is_some() {
                div {
                    class: "notice notice-warning",
                    "Couldn't reach the authentication service. You can still try to log in."
                }
            }

            form {
                class: "auth-form",
                onsubmit: handle_submit,

                input {
                    r#type: "email",
                    placeholder: "Email",
                    required: true,
                    value: "{current.email}",
                    oninput: move |evt: FormEvent| form.write().email = evt.value(),
                }

                input {
                    r#type: "password",
                    placeholder: "Password",
                    required: true,
                    value: "{current.password}",
                    oninput: move |evt: FormEvent| form.write().password = evt.value(),
                }

                button {
                    class: "btn btn-primary",
                    r#type: "submit",
                    disabled: current.loading,
                    "{current.submit_label()}"
                }
            }

            if let Some(message) = current.message.clone() {
                p { class: "auth-message", "{message}" }
            }

            button {
                class: "btn btn-link",
                r#type: "button",
                disabled: current.loading,
                onclick: move |_| form.write().toggle_mode(),
                "{current.mode.switch_label()}"
            }
        }
    }
}
