//! Construction of the app's service handles.

use api::{ApiResult, ClientConfig, SupabaseClient};
use dioxus::prelude::*;
use store::{RequestPolicy, SessionStore};

/// Bundled configuration; see `fitgallery.toml` at the workspace root.
const BUNDLED_CONFIG: &str = include_str!("../../../fitgallery.toml");

/// Everything a view needs to talk to the backend.
#[derive(Clone)]
pub struct Services {
    pub client: SupabaseClient,
    pub policy: RequestPolicy,
    pub session: SessionStore<SupabaseClient>,
}

/// Build the client from the bundled config.
///
/// `FITGALLERY_SERVICE_URL` and `FITGALLERY_ANON_KEY` set at compile time take
/// precedence, since the browser has no process environment.
pub fn make_services() -> ApiResult<Services> {
    let config = ClientConfig::from_toml(BUNDLED_CONFIG)
        .map_err(|e| api::ApiError::Config(format!("invalid {}: {e}", ClientConfig::filename())))?
        .with_overrides(
            option_env!("FITGALLERY_SERVICE_URL"),
            option_env!("FITGALLERY_ANON_KEY"),
        );
    let policy = RequestPolicy::from(&config.requests);
    let client = SupabaseClient::new(config)?;
    let session = SessionStore::new(client.clone(), policy);
    Ok(Services {
        client,
        policy,
        session,
    })
}

/// Service handles provided by [`crate::AuthProvider`].
pub fn use_services() -> Services {
    use_context::<Services>()
}

/// Ask the user a yes/no question with the browser's native dialog.
pub fn confirm_dialog(prompt: &str) -> bool {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window()
            .and_then(|window| window.confirm_with_message(prompt).ok())
            .unwrap_or(false)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::warn!("No confirmation dialog available, declining: {}", prompt);
        false
    }
}
