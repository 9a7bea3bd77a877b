//! Post cards and the inline edit form.

use api::{Post, SupabaseClient};
use dioxus::prelude::*;
use store::{EditBuffer, PostCollection, PostsState};

use crate::client::confirm_dialog;
use crate::icons::{FaPen, FaTrash};
use crate::Icon;

pub type Posts = PostCollection<SupabaseClient>;

/// The post collection of the dashboard and its mirrored state.
pub fn use_posts() -> (Posts, Signal<PostsState>) {
    (use_context::<Posts>(), use_context::<Signal<PostsState>>())
}

#[component]
pub fn PostList() -> Element {
    let (_, state) = use_posts();
    let current = state();

    if current.loading && current.posts.is_empty() {
        return rsx! {
            p { class: "post-list-empty", "Loading posts..." }
        };
    }
    if current.posts.is_empty() {
        return rsx! {
            p { class: "post-list-empty", "No posts yet." }
        };
    }

    rsx! {
        ul {
            class: "post-list",
            for post in current.posts.iter().cloned() {
                li {
                    key: "{post.id}",
                    match current.editing.clone().filter(|e| e.post_id == post.id) {
                        Some(buffer) => rsx! { EditForm { buffer, busy: current.busy } },
                        None => rsx! { PostCard { post, busy: current.busy } },
                    }
                }
            }
        }
    }
}

#[component]
pub fn PostCard(post: Post, busy: bool) -> Element {
    let (posts, _) = use_posts();
    let description = post.description_or_empty().to_string();
    let created = post.created_at.format("%b %-d, %Y").to_string();

    let on_edit = {
        let posts = posts.clone();
        let post = post.clone();
        move |_| posts.begin_edit(&post)
    };
    let on_delete = {
        let id = post.id.clone();
        move |_| {
            let posts = posts.clone();
            let id = id.clone();
            async move {
                posts.delete(&id, &confirm_dialog).await;
            }
        }
    };

    rsx! {
        article {
            class: "post-card",
            if let Some(url) = post.image() {
                img { class: "post-image", src: "{url}", alt: "{post.title}" }
            }
            div {
                class: "post-body",
                h3 { class: "post-title", "{post.title}" }
                if !description.is_empty() {
                    p { class: "post-description", "{description}" }
                }
                time { class: "post-date", "{created}" }
            }
            div {
                class: "post-actions",
                button {
                    class: "btn btn-secondary",
                    title: "Edit",
                    disabled: busy,
                    onclick: on_edit,
                    Icon { icon: FaPen, width: 14, height: 14 }
                }
                button {
                    class: "btn btn-danger",
                    title: "Delete",
                    disabled: busy,
                    onclick: on_delete,
                    Icon { icon: FaTrash, width: 14, height: 14 }
                }
            }
        }
    }
}

#[component]
pub fn EditForm(buffer: EditBuffer, busy: bool) -> Element {
    let (posts, _) = use_posts();

    let on_title = {
        let posts = posts.clone();
        move |evt: FormEvent| posts.set_edit_title(evt.value())
    };
    let on_description = {
        let posts = posts.clone();
        move |evt: FormEvent| posts.set_edit_description(evt.value())
    };
    let on_cancel = {
        let posts = posts.clone();
        move |_| posts.cancel_edit()
    };
    let on_save = move |evt: FormEvent| {
        evt.prevent_default();
        let posts = posts.clone();
        spawn(async move {
            posts.update().await;
        });
    };

    rsx! {
        form {
            class: "post-card post-edit",
            onsubmit: on_save,
            input {
                r#type: "text",
                required: true,
                value: "{buffer.title}",
                oninput: on_title,
            }
            textarea {
                rows: 3,
                value: "{buffer.description}",
                oninput: on_description,
            }
            div {
                class: "post-actions",
                button {
                    class: "btn btn-primary",
                    r#type: "submit",
                    disabled: busy,
                    if busy { "Saving..." } else { "Save" }
                }
                button {
                    class: "btn btn-secondary",
                    r#type: "button",
                    onclick: on_cancel,
                    "Cancel"
                }
            }
        }
    }
}
