use dioxus::logger::tracing::Level;
use dioxus::prelude::*;

use ui::{AuthProvider, Navbar};
use views::{Auth, Dashboard};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[route("/auth")]
    Auth {},
    #[route("/app")]
    Dashboard {},
    #[route("/:..segments")]
    Fallback { segments: Vec<String> },
}

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    dioxus::logger::init(Level::INFO).expect("failed to initialise logger");
    tracing::info!("Starting FitGallery");
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        AuthProvider {
            Navbar {}
            Router::<Route> {}
        }
    }
}

/// Redirect any unknown path to `/app`
#[component]
fn Fallback(segments: Vec<String>) -> Element {
    let nav = use_navigator();
    tracing::debug!("No route for /{}, redirecting", segments.join("/"));
    nav.replace(Route::Dashboard {});
    rsx! {}
}
