//! Auth-event stream and session persistence shared by every auth backend.

mod events;
mod session;

pub use events::{AuthEvents, Subscription};
pub use session::{SessionPersistence, SESSION_STORAGE_KEY};
