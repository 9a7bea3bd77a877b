//! Data models exchanged with the remote service.

mod post;
mod session;

pub use post::{NewPost, Post, PostPatch};
pub use session::{AuthChangeEvent, AuthResponse, AuthTokens, AuthUser, Session};
