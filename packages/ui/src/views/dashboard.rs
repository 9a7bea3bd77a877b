//! The signed-in user's posts: create form, notice banner and list.

use std::rc::Rc;

use dioxus::prelude::*;
use store::{NoticeLevel, PendingUpload, PostCollection, PostsState};

use crate::post_list::{use_posts, PostList, Posts};
use crate::{use_auth, use_services};

/// Dashboard for the current session. Remounts the collection when the user changes.
#[component]
pub fn DashboardView() -> Element {
    let auth = use_auth();
    let Some(owner_id) = auth().user_id().map(str::to_string) else {
        return rsx! {};
    };

    rsx! {
        PostsPanel { key: "{owner_id}", owner_id: owner_id.clone() }
    }
}

#[component]
fn PostsPanel(owner_id: String) -> Element {
    let services = use_services();
    let state = use_signal(PostsState::default);
    use_context_provider(|| state);

    let posts: Posts = use_hook(|| {
        PostCollection::new(services.client.clone(), owner_id.as_str(), services.policy)
    });
    use_context_provider(|| posts.clone());

    let _observer = use_hook(|| {
        Rc::new(posts.subscribe(move |s| {
            let mut state = state;
            state.set(s.clone());
        }))
    });

    let _ = use_resource({
        let posts = posts.clone();
        move || {
            let posts = posts.clone();
            async move { posts.list().await }
        }
    });

    rsx! {
        main {
            class: "dashboard",
            NoticeBanner {}
            CreatePostForm {}
            PostList {}
        }
    }
}

#[component]
fn NoticeBanner() -> Element {
    let (posts, state) = use_posts();
    let Some(notice) = state().notice else {
        return rsx! {};
    };
    let class = match notice.level {
        NoticeLevel::Warning => "notice notice-warning",
        NoticeLevel::Error => "notice notice-error",
    };

    rsx! {
        div {
            class: "{class}",
            role: "alert",
            span { "{notice.message}" }
            button {
                class: "btn btn-link",
                onclick: move |_| posts.dismiss_notice(),
                "Dismiss"
            }
        }
    }
}

#[component]
fn CreatePostForm() -> Element {
    let (posts, state) = use_posts();
    let current = state();

    let on_title = {
        let posts = posts.clone();
        move |evt: FormEvent| posts.set_draft_title(evt.value())
    };
    let on_description = {
        let posts = posts.clone();
        move |evt: FormEvent| posts.set_draft_description(evt.value())
    };
    let on_file = {
        let posts = posts.clone();
        move |evt: FormEvent| {
            let posts = posts.clone();
            async move {
                let Some(engine) = evt.files() else {
                    posts.clear_file();
                    return;
                };
                let Some(name) = engine.files().into_iter().next() else {
                    posts.clear_file();
                    return;
                };
                match engine.read_file(&name).await {
                    Some(bytes) => posts.select_file(PendingUpload::new(name, bytes)),
                    None => {
                        tracing::error!("Failed to read selected file {}", name);
                        posts.clear_file();
                    }
                }
            }
        }
    };
    let on_submit = move |evt: FormEvent| {
        evt.prevent_default();
        let posts = posts.clone();
        spawn(async move {
            posts.create().await;
        });
    };

    rsx! {
        form {
            class: "create-post",
            onsubmit: on_submit,
            h2 { "New post" }
            input {
                r#type: "text",
                placeholder: "Title",
                required: true,
                value: "{current.draft.title}",
                oninput: on_title,
            }
            textarea {
                placeholder: "Description",
                rows: 3,
                value: "{current.draft.description}",
                oninput: on_description,
            }
            input {
                r#type: "file",
                accept: "image/*",
                onchange: on_file,
            }
            if let Some(upload) = current.pending_upload.as_ref() {
                p { class: "pending-upload", "{upload.file_name} ({upload.len()} bytes)" }
            }
            button {
                class: "btn btn-primary",
                r#type: "submit",
                disabled: current.busy,
                if current.busy { "Saving..." } else { "Create post" }
            }
        }
    }
}
