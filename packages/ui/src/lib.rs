//! This crate contains all shared UI for the workspace.

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

mod client;
pub use client::{confirm_dialog, make_services, use_services, Services};

pub mod views;

mod navbar;
pub use navbar::Navbar;

mod auth;
pub use auth::{use_auth, AuthGate, AuthProvider, LogoutButton};

mod post_list;
pub use post_list::{use_posts, EditForm, PostCard, PostList, Posts};
