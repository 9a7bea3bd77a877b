//! Posts table over PostgREST (`/rest/v1/{table}`).

use reqwest::Method;

use super::wire::ImageUrlRow;
use super::{ensure_success, Service, SupabaseClient};
use crate::error::ApiResult;
use crate::models::{NewPost, Post, PostPatch};
use crate::service::PostsTable;

impl SupabaseClient {
    fn table_path(&self) -> String {
        format!("/rest/v1/{}", self.config.table.posts)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

impl PostsTable for SupabaseClient {
    async fn list_for_owner(&self, owner_id: &str) -> ApiResult<Vec<Post>> {
        let response = self
            .authorized(Method::GET, &self.table_path())
            .await?
            .query(&[
                ("select", "*".to_string()),
                ("user_id", eq(owner_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        let response = ensure_success(response, Service::Data).await?;
        Ok(serde_json::from_str(&response.text().await?)?)
    }

    async fn insert(&self, post: &NewPost) -> ApiResult<()> {
        let response = self
            .authorized(Method::POST, &self.table_path())
            .await?
            .header("Prefer", "return=minimal")
            .json(&[post])
            .send()
            .await?;
        ensure_success(response, Service::Data).await?;
        Ok(())
    }

    async fn update(&self, id: &str, owner_id: &str, patch: &PostPatch) -> ApiResult<()> {
        let response = self
            .authorized(Method::PATCH, &self.table_path())
            .await?
            .query(&[("id", eq(id)), ("user_id", eq(owner_id))])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        ensure_success(response, Service::Data).await?;
        Ok(())
    }

    async fn delete(&self, id: &str, owner_id: &str) -> ApiResult<()> {
        let response = self
            .authorized(Method::DELETE, &self.table_path())
            .await?
            .query(&[("id", eq(id)), ("user_id", eq(owner_id))])
            .send()
            .await?;
        ensure_success(response, Service::Data).await?;
        Ok(())
    }

    async fn image_url(&self, id: &str) -> ApiResult<Option<String>> {
        let response = self
            .authorized(Method::GET, &self.table_path())
            .await?
            .query(&[
                ("select", "image_url".to_string()),
                ("id", eq(id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let response = ensure_success(response, Service::Data).await?;
        let rows: Vec<ImageUrlRow> = serde_json::from_str(&response.text().await?)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.image_url)
            .filter(|url| !url.is_empty()))
    }
}
