use dioxus::prelude::*;

use crate::icons::FaDumbbell;
use crate::{use_auth, Icon, LogoutButton};

#[component]
pub fn Navbar() -> Element {
    let auth = use_auth();

    rsx! {
        nav {
            class: "navbar",
            div {
                class: "navbar-brand",
                Icon { icon: FaDumbbell, width: 20, height: 20 }
                span { "FitGallery" }
            }
            div {
                class: "navbar-user",
                match auth().email() {
                    Some(email) => rsx! {
                        span { class: "navbar-email", "{email}" }
                        LogoutButton { class: "btn btn-secondary" }
                    },
                    None => rsx! {
                        span { class: "navbar-email", "Not logged in" }
                    },
                }
            }
        }
    }
}
