//! Post rows of the `posts` table.
//!
//! Column names on the wire follow the table (`user_id`, `image_url`, ...); the owner
//! column is exposed as `owner_id` on the Rust side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A post as stored in the remote table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Image URL, if the post has a non-empty one.
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Insert payload. `image_url` is empty when the post has no image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

/// Columns changed by an edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostPatch {
    pub title: String,
    pub description: String,
}

/// Accept both uuid and bigint primary keys.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_row() {
        let post: Post = serde_json::from_str(
            r#"{
                "id": "0b6f3c1e-0000-4000-8000-000000000001",
                "user_id": "user-1",
                "title": "Leg day",
                "description": null,
                "image_url": "",
                "created_at": "2024-05-01T10:00:00.123456+00:00"
            }"#,
        )
        .unwrap();
        assert_eq!(post.owner_id, "user-1");
        assert_eq!(post.description_or_empty(), "");
        assert_eq!(post.image(), None);
    }

    #[test]
    fn numeric_ids_become_strings() {
        let post: Post = serde_json::from_str(
            r#"{"id": 42, "user_id": "u", "title": "t", "created_at": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(post.id, "42");
        assert!(post.image_url.is_none());
    }

    #[test]
    fn new_post_serializes_owner_as_user_id() {
        let row = NewPost {
            owner_id: "u".to_string(),
            title: "t".to_string(),
            description: String::new(),
            image_url: String::new(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user_id"], "u");
        assert_eq!(json["image_url"], "");
        assert!(json.get("owner_id").is_none());
    }
}
