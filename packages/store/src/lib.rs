//! # Store crate: client-side state for FitGallery
//!
//! Framework-free state machines that the UI mirrors into signals. Each store owns an
//! [`Observable`] value, exposes the operations that change it, and is tested against
//! [`api::MemoryService`].
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`session`] | [`SessionStore`]: who is signed in, driven by auth events |
//! | [`gate`] | [`AuthGate`]: loading / authenticated / unauthenticated |
//! | [`credentials`] | [`CredentialForm`] and the sign-up / log-in flow |
//! | [`posts`] | [`PostCollection`]: the owner's posts and their CRUD workflows |
//! | [`policy`] | [`RequestPolicy`]: timeouts and read retries |
//! | [`observable`] | [`Observable`], the shared change-notification primitive |

pub mod credentials;
pub mod gate;
pub mod observable;
pub mod policy;
pub mod posts;
pub mod session;

pub use credentials::{
    authenticate, AuthMode, CredentialForm, Credentials, SubmitOutcome, VERIFY_EMAIL_MESSAGE,
};
pub use gate::{AuthGate, GateState, GateTransition};
pub use observable::{Observable, Observer};
pub use policy::RequestPolicy;
pub use posts::{
    Confirm, DraftPost, EditBuffer, MutationOutcome, Notice, NoticeLevel, PendingUpload,
    PostCollection, PostsState, DELETE_PROMPT,
};
pub use session::{Activation, SessionState, SessionStore};
