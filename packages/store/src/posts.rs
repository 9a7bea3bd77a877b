//! Post collection manager.
//!
//! [`PostCollection`] caches the signed-in user's posts and runs the create, edit and
//! delete workflows against the table and the image bucket. Workflows are strictly
//! sequential; the `busy` flag admits one mutation at a time. Table and storage
//! failures are logged and surfaced as a dismissible [`Notice`]. Overlapping list
//! requests are numbered and only the newest one may replace the cache.

use std::cell::Cell;
use std::rc::Rc;

use api::storage::storage_key;
use api::{NewPost, Post, PostPatch, RemoteService};

use crate::observable::{Observable, Observer};
use crate::policy::RequestPolicy;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this post?";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DraftPost {
    pub title: String,
    pub description: String,
}

/// A file chosen for the next post, held until the post is created or the file cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingUpload {
    pub file_name: String,
    pub bytes: Rc<[u8]>,
    pub content_type: Option<String>,
}

impl PendingUpload {
    /// Content type is guessed from the file name.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Rc<[u8]>>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first()
            .map(|mime| mime.to_string());
        Self {
            file_name,
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The single post being edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditBuffer {
    pub post_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// The operation completed, but not entirely.
    Warning,
    /// The operation was aborted.
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostsState {
    /// Newest first.
    pub posts: Vec<Post>,
    pub loading: bool,
    /// A create, update or delete is in flight.
    pub busy: bool,
    pub draft: DraftPost,
    pub pending_upload: Option<PendingUpload>,
    pub editing: Option<EditBuffer>,
    pub notice: Option<Notice>,
}

impl PostsState {
    pub fn is_editing(&self, post_id: &str) -> bool {
        self.editing.as_ref().is_some_and(|e| e.post_id == post_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Completed,
    /// Another mutation was in flight; nothing was sent.
    Busy,
    /// Local validation failed; nothing was sent.
    Invalid,
    /// The user declined the confirmation prompt.
    Cancelled,
    /// The remote call failed; see the notice.
    Failed,
}

/// Interactive yes/no prompt.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Numbers list requests so a slow response cannot overwrite a newer cache.
#[derive(Debug, Default)]
struct ListTracker {
    latest: Cell<u64>,
    in_flight: Cell<u32>,
}

impl ListTracker {
    fn start(&self) -> u64 {
        let generation = self.latest.get() + 1;
        self.latest.set(generation);
        self.in_flight.set(self.in_flight.get() + 1);
        generation
    }

    /// Returns whether `generation` is still the newest and whether no list remains in flight.
    fn finish(&self, generation: u64) -> (bool, bool) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        (generation == self.latest.get(), self.in_flight.get() == 0)
    }

    /// Retire every list in flight; the cache was changed locally after they were sent.
    fn invalidate(&self) {
        self.latest.set(self.latest.get() + 1);
    }
}

/// The posts of one owner and the workflows that change them.
#[derive(Clone)]
pub struct PostCollection<S> {
    service: S,
    owner_id: Rc<str>,
    policy: RequestPolicy,
    state: Observable<PostsState>,
    lists: Rc<ListTracker>,
}

impl<S: RemoteService> PostCollection<S> {
    pub fn new(service: S, owner_id: impl Into<Rc<str>>, policy: RequestPolicy) -> Self {
        Self {
            service,
            owner_id: owner_id.into(),
            policy,
            state: Observable::new(PostsState::default()),
            lists: Rc::default(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn state(&self) -> PostsState {
        self.state.get()
    }

    pub fn subscribe(&self, observer: impl Fn(&PostsState) + 'static) -> Observer {
        self.state.subscribe(observer)
    }

    pub fn set_draft_title(&self, title: String) {
        self.state.update(|s| s.draft.title = title);
    }

    pub fn set_draft_description(&self, description: String) {
        self.state.update(|s| s.draft.description = description);
    }

    pub fn select_file(&self, upload: PendingUpload) {
        self.state.update(|s| s.pending_upload = Some(upload));
    }

    pub fn clear_file(&self) {
        self.state.update(|s| s.pending_upload = None);
    }

    pub fn dismiss_notice(&self) {
        self.state.update(|s| s.notice = None);
    }

    /// Replace the cache with the owner's posts, newest first.
    ///
    /// A response is dropped when a later list was started, or the cache was changed
    /// locally, while it was in flight.
    pub async fn list(&self) {
        let generation = self.lists.start();
        self.state.update(|s| s.loading = true);
        let result = self
            .policy
            .read("Post list", || self.service.list_for_owner(&self.owner_id))
            .await;
        let (newest, idle) = self.lists.finish(generation);
        if !newest {
            tracing::debug!(generation, "Dropped superseded post list");
            if idle {
                self.state.update(|s| s.loading = false);
            }
            return;
        }
        match result {
            Ok(posts) => {
                tracing::debug!(count = posts.len(), "Loaded posts");
                self.state.update(|s| {
                    s.posts = posts;
                    s.loading = false;
                });
            }
            Err(e) => {
                tracing::error!("Failed to load posts: {}", e);
                self.state.update(|s| {
                    s.loading = false;
                    s.notice = Some(Notice::error(format!("Could not load your posts: {e}")));
                });
            }
        }
    }

    /// Create a post from the draft, uploading the pending file first if there is one.
    pub async fn create(&self) -> MutationOutcome {
        let claimed = self.state.update(|s| {
            if s.busy {
                return Err(MutationOutcome::Busy);
            }
            if s.draft.title.trim().is_empty() {
                return Err(MutationOutcome::Invalid);
            }
            s.busy = true;
            Ok((s.draft.clone(), s.pending_upload.clone()))
        });
        let (draft, upload) = match claimed {
            Ok(claimed) => claimed,
            Err(outcome) => return outcome,
        };

        let mut notice = None;
        let mut uploaded_key = None;
        if let Some(upload) = &upload {
            match self.upload_image(upload).await {
                Ok(key) => uploaded_key = Some(key),
                Err(e) => {
                    tracing::error!("Failed to upload image {}: {}", upload.file_name, e);
                    notice = Some(Notice::warning(
                        "The image could not be uploaded, so the post was saved without it.",
                    ));
                }
            }
        }

        let row = NewPost {
            owner_id: self.owner_id.to_string(),
            title: draft.title,
            description: draft.description,
            image_url: uploaded_key
                .as_deref()
                .map(|key| self.service.public_url(key))
                .unwrap_or_default(),
        };

        if let Err(e) = self.policy.mutation(self.service.insert(&row)).await {
            tracing::error!("Failed to create post: {}", e);
            if let Some(key) = uploaded_key {
                self.discard_object(key).await;
            }
            self.state.update(|s| {
                s.busy = false;
                s.notice = Some(Notice::error(format!("Could not save the post: {e}")));
            });
            return MutationOutcome::Failed;
        }

        self.state.update(|s| {
            s.draft = DraftPost::default();
            s.pending_upload = None;
            s.notice = notice;
        });
        self.list().await;
        self.state.update(|s| s.busy = false);
        MutationOutcome::Completed
    }

    /// Open the edit form for `post`, replacing any edit in progress.
    pub fn begin_edit(&self, post: &Post) {
        let buffer = EditBuffer {
            post_id: post.id.clone(),
            title: post.title.clone(),
            description: post.description_or_empty().to_string(),
        };
        self.state.update(|s| s.editing = Some(buffer));
    }

    pub fn set_edit_title(&self, title: String) {
        self.state.update(|s| {
            if let Some(buffer) = s.editing.as_mut() {
                buffer.title = title;
            }
        });
    }

    pub fn set_edit_description(&self, description: String) {
        self.state.update(|s| {
            if let Some(buffer) = s.editing.as_mut() {
                buffer.description = description;
            }
        });
    }

    /// Close the edit form without saving.
    pub fn cancel_edit(&self) {
        self.state.update(|s| s.editing = None);
    }

    /// Save the edit buffer.
    pub async fn update(&self) -> MutationOutcome {
        let claimed = self.state.update(|s| {
            if s.busy {
                return Err(MutationOutcome::Busy);
            }
            let buffer = s.editing.clone().ok_or(MutationOutcome::Invalid)?;
            if buffer.title.trim().is_empty() {
                return Err(MutationOutcome::Invalid);
            }
            s.busy = true;
            Ok(buffer)
        });
        let buffer = match claimed {
            Ok(buffer) => buffer,
            Err(outcome) => return outcome,
        };

        let patch = PostPatch {
            title: buffer.title,
            description: buffer.description,
        };
        let result = self
            .policy
            .mutation(self.service.update(&buffer.post_id, &self.owner_id, &patch))
            .await;

        if let Err(e) = result {
            tracing::error!("Failed to update post {}: {}", buffer.post_id, e);
            self.state.update(|s| {
                s.busy = false;
                s.notice = Some(Notice::error(format!("Could not update the post: {e}")));
            });
            return MutationOutcome::Failed;
        }

        self.state.update(|s| {
            if s.is_editing(&buffer.post_id) {
                s.editing = None;
            }
            s.notice = None;
        });
        self.list().await;
        self.state.update(|s| s.busy = false);
        MutationOutcome::Completed
    }

    /// Delete a post after confirmation, removing its image from storage first.
    pub async fn delete(&self, post_id: &str, confirm: &impl Confirm) -> MutationOutcome {
        if self.state.with(|s| s.busy) {
            return MutationOutcome::Busy;
        }
        if !confirm.confirm(DELETE_PROMPT) {
            return MutationOutcome::Cancelled;
        }
        self.state.update(|s| s.busy = true);

        let image_url = match self
            .policy
            .read("Image lookup", || self.service.image_url(post_id))
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Could not look up image of post {}: {}", post_id, e);
                None
            }
        };

        let mut notice = None;
        if let Some(url) = image_url.filter(|url| !url.is_empty()) {
            match self.service.key_from_public_url(&url) {
                Some(key) => {
                    if let Err(e) = self.policy.mutation(self.service.remove(&[key])).await {
                        tracing::error!("Failed to remove image of post {}: {}", post_id, e);
                        notice = Some(Notice::warning(
                            "The post was deleted, but its image could not be removed.",
                        ));
                    }
                }
                None => tracing::warn!("Image URL {} is not in the post bucket", url),
            }
        }

        let result = self
            .policy
            .mutation(self.service.delete(post_id, &self.owner_id))
            .await;
        match result {
            Ok(()) => {
                self.lists.invalidate();
                self.state.update(|s| {
                    s.posts.retain(|p| p.id != post_id);
                    if s.is_editing(post_id) {
                        s.editing = None;
                    }
                    s.busy = false;
                    s.notice = notice;
                });
                MutationOutcome::Completed
            }
            Err(e) => {
                tracing::error!("Failed to delete post {}: {}", post_id, e);
                self.state.update(|s| {
                    s.busy = false;
                    s.notice = Some(Notice::error(format!("Could not delete the post: {e}")));
                });
                MutationOutcome::Failed
            }
        }
    }

    async fn upload_image(&self, upload: &PendingUpload) -> api::ApiResult<String> {
        let key = storage_key(&self.owner_id, current_timestamp_millis(), &upload.file_name);
        self.policy
            .mutation(self.service.upload(
                &key,
                upload.bytes.to_vec(),
                upload.content_type.as_deref(),
            ))
            .await?;
        Ok(key)
    }

    /// Best-effort removal of an object whose row was never written.
    async fn discard_object(&self, key: String) {
        if let Err(e) = self.policy.mutation(self.service.remove(&[key])).await {
            tracing::warn!("Failed to remove orphaned image: {}", e);
        }
    }
}

/// Milliseconds since the Unix epoch.
fn current_timestamp_millis() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}
