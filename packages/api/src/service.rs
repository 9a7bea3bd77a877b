//! # Remote service capabilities
//!
//! The app only ever talks to its backend through these three traits. They mirror the
//! client SDK surface of a hosted backend-as-a-service: an auth service, a posts
//! table and an object-storage bucket. [`crate::SupabaseClient`] implements them over
//! HTTP and [`crate::MemoryService`] implements them in memory.
//!
//! All futures are `!Send`; the client runs on the browser's single thread.

use std::future::Future;

use crate::auth::Subscription;
use crate::error::ApiResult;
use crate::models::{AuthChangeEvent, AuthResponse, NewPost, Post, PostPatch, Session};

/// Password authentication and the auth-event stream.
pub trait AuthApi {
    /// Current session, restored from persistence and refreshed when close to expiry.
    fn get_session(&self) -> impl Future<Output = ApiResult<Option<Session>>>;

    /// Register a listener for sign-in, sign-out and refresh events.
    fn on_auth_state_change(
        &self,
        listener: impl Fn(AuthChangeEvent, Option<Session>) + 'static,
    ) -> Subscription;

    fn sign_up(&self, email: &str, password: &str) -> impl Future<Output = ApiResult<AuthResponse>>;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = ApiResult<AuthResponse>>;

    /// End the session. The local session is cleared even if the remote call fails.
    fn sign_out(&self) -> impl Future<Output = ApiResult<()>>;
}

/// Row operations on the posts table. Mutations are filtered by owner as well as id.
pub trait PostsTable {
    /// All posts of `owner_id`, newest first.
    fn list_for_owner(&self, owner_id: &str) -> impl Future<Output = ApiResult<Vec<Post>>>;

    fn insert(&self, post: &NewPost) -> impl Future<Output = ApiResult<()>>;

    fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: &PostPatch,
    ) -> impl Future<Output = ApiResult<()>>;

    fn delete(&self, id: &str, owner_id: &str) -> impl Future<Output = ApiResult<()>>;

    /// Current `image_url` of a single row, read straight from the table.
    fn image_url(&self, id: &str) -> impl Future<Output = ApiResult<Option<String>>>;
}

/// The post-images bucket.
pub trait ObjectStorage {
    fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> impl Future<Output = ApiResult<()>>;

    fn public_url(&self, key: &str) -> String;

    fn remove(&self, keys: &[String]) -> impl Future<Output = ApiResult<()>>;

    /// Recover the storage key from a URL produced by [`ObjectStorage::public_url`].
    fn key_from_public_url(&self, url: &str) -> Option<String>;
}

/// Everything the app needs from its backend, as one cloneable handle.
pub trait RemoteService: AuthApi + PostsTable + ObjectStorage + Clone + 'static {}

impl<T> RemoteService for T where T: AuthApi + PostsTable + ObjectStorage + Clone + 'static {}
