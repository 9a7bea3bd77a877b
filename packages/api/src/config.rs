//! # Client configuration (`fitgallery.toml`)
//!
//! Describes where the hosted backend lives and how the client talks to it. The web
//! build embeds the file at compile time (there is no runtime environment in a browser),
//! and two compile-time variables can override the service coordinates.
//!
//! ## Structure
//!
//! ```toml
//! [service]
//! url = "https://project.supabase.co"
//! anon_key = "public-anon-key"
//!
//! [storage]
//! bucket = "post-images"
//!
//! [table]
//! posts = "posts"
//!
//! [requests]
//! timeout_secs = 15   # per remote call
//! read_retries = 1    # extra attempts for idempotent reads
//! ```
//!
//! | Struct | Purpose |
//! |--------|---------|
//! | [`ClientConfig`] | Top-level config with TOML parsing, env overrides and validation. |
//! | [`ServiceConfig`] | Base URL and public (anon) API key of the backend. |
//! | [`StorageConfig`] | Object-storage bucket holding post images. |
//! | [`TableConfig`] | Name of the posts table. |
//! | [`RequestsConfig`] | Timeout and retry policy for remote calls. |
//!
//! Every section has defaults, so only `[service]` needs to be filled in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub requests: RequestsConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the project, without a trailing slash.
    #[serde(default)]
    pub url: String,
    /// Public API key sent with every request.
    #[serde(default)]
    pub anon_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_posts_table")]
    pub posts: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestsConfig {
    /// Upper bound for a single remote call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional attempts for idempotent reads after a transient failure.
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
}

fn default_bucket() -> String {
    "post-images".to_string()
}

fn default_posts_table() -> String {
    "posts".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_read_retries() -> u32 {
    1
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            posts: default_posts_table(),
        }
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            read_retries: default_read_retries(),
        }
    }
}

impl RequestsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ClientConfig {
    /// Create a config pointing at the given service.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig {
                url: url.into(),
                anon_key: anon_key.into(),
            },
            ..Self::default()
        }
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "fitgallery.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Replace the service coordinates with any non-empty overrides.
    pub fn with_overrides(mut self, url: Option<&str>, anon_key: Option<&str>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.service.url = url.trim().to_string();
        }
        if let Some(key) = anon_key.filter(|k| !k.trim().is_empty()) {
            self.service.anon_key = key.trim().to_string();
        }
        self
    }

    /// Check that the config can be used to build a client.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.service.url.trim().is_empty() {
            return Err(ApiError::Config("service.url is not set".to_string()));
        }
        url::Url::parse(&self.service.url)
            .map_err(|e| ApiError::Config(format!("service.url is invalid: {e}")))?;
        if self.service.anon_key.trim().is_empty() {
            return Err(ApiError::Config("service.anon_key is not set".to_string()));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ApiError::Config("storage.bucket is empty".to_string()));
        }
        if self.requests.timeout_secs == 0 {
            return Err(ApiError::Config("requests.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.service.url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.storage.bucket, "post-images");
        assert_eq!(config.table.posts, "posts");
        assert_eq!(config.requests.timeout(), Duration::from_secs(15));
        assert_eq!(config.requests.read_retries, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_service_section() {
        let config = ClientConfig::from_toml(
            r#"
            [service]
            url = "https://demo.supabase.co/"
            anon_key = "anon"

            [requests]
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://demo.supabase.co");
        assert_eq!(config.requests.timeout_secs, 5);
        assert_eq!(config.requests.read_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_only_non_empty_values() {
        let config = ClientConfig::new("https://a.example", "key-a")
            .with_overrides(Some("https://b.example"), Some("  "));
        assert_eq!(config.service.url, "https://b.example");
        assert_eq!(config.service.anon_key, "key-a");
    }

    #[test]
    fn rejects_malformed_url() {
        let config = ClientConfig::new("not a url", "key");
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));
    }

    #[test]
    fn toml_roundtrip() {
        let config = ClientConfig::new("https://demo.supabase.co", "anon");
        let text = config.to_toml().unwrap();
        assert_eq!(ClientConfig::from_toml(&text).unwrap(), config);
    }
}
