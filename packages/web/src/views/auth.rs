use dioxus::prelude::*;
use ui::views::AuthPageView;

use crate::Route;

/// `/auth`: the credential form. A verified sign-in moves on to the dashboard.
#[component]
pub fn Auth() -> Element {
    let nav = use_navigator();

    rsx! {
        AuthPageView {
            on_authenticated: move |_| {
                nav.push(Route::Dashboard {});
            },
        }
    }
}
