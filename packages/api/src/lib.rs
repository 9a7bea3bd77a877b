//! # API crate: remote service client for FitGallery
//!
//! Everything the app knows about its hosted backend lives here: the data models that
//! cross the wire, the capability traits the rest of the workspace programs against,
//! and two implementations of those traits.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Auth-event fan-out ([`AuthEvents`], [`Subscription`]) and session persistence |
//! | [`config`] | `fitgallery.toml` client configuration ([`ClientConfig`]) |
//! | [`error`] | [`ApiError`], the failure type of every remote call |
//! | [`models`] | [`Session`], [`Post`] and the insert/update payloads |
//! | [`service`] | The [`AuthApi`], [`PostsTable`] and [`ObjectStorage`] traits |
//! | [`storage`] | Storage-key derivation and public-URL parsing |
//! | [`supabase`] | [`SupabaseClient`], the HTTP implementation |
//! | [`memory`] | [`MemoryService`], an in-memory implementation for tests and demos |
//!
//! ## Operations
//!
//! - **Auth**: `get_session`, `on_auth_state_change`, `sign_up`, `sign_in_with_password`, `sign_out`
//! - **Posts table**: `list_for_owner`, `insert`, `update`, `delete`, `image_url`
//! - **Object storage**: `upload`, `public_url`, `remove`, `key_from_public_url`

pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod service;
pub mod storage;
pub mod supabase;

pub use auth::{AuthEvents, Subscription};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use memory::{MemoryService, Operation};
pub use models::{AuthChangeEvent, AuthResponse, AuthTokens, AuthUser, NewPost, Post, PostPatch, Session};
pub use service::{AuthApi, ObjectStorage, PostsTable, RemoteService};
pub use supabase::SupabaseClient;
