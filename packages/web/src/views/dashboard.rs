use dioxus::prelude::*;
use ui::views::DashboardView;
use ui::AuthGate;

use crate::Route;

/// `/app`: the protected dashboard. Signed-out visitors are sent to `/auth`.
#[component]
pub fn Dashboard() -> Element {
    let nav = use_navigator();

    rsx! {
        AuthGate {
            on_unauthenticated: move |_| {
                nav.replace(Route::Auth {});
            },
            DashboardView {}
        }
    }
}
