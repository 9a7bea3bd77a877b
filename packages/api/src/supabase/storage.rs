//! Post-images bucket over `/storage/v1/object`.

use reqwest::Method;

use super::wire::RemovePrefixes;
use super::{ensure_success, Service, SupabaseClient};
use crate::error::ApiResult;
use crate::service::ObjectStorage;
use crate::storage::{key_from_public_url, public_object_url};

impl ObjectStorage for SupabaseClient {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> ApiResult<()> {
        let bucket = &self.config.storage.bucket;
        let response = self
            .authorized(Method::POST, &format!("/storage/v1/object/{bucket}/{key}"))
            .await?
            .header("Content-Type", content_type.unwrap_or("application/octet-stream"))
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        ensure_success(response, Service::Data).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(self.config.base_url(), &self.config.storage.bucket, key)
    }

    async fn remove(&self, keys: &[String]) -> ApiResult<()> {
        let bucket = &self.config.storage.bucket;
        let response = self
            .authorized(Method::DELETE, &format!("/storage/v1/object/{bucket}"))
            .await?
            .json(&RemovePrefixes { prefixes: keys })
            .send()
            .await?;
        ensure_success(response, Service::Data).await?;
        Ok(())
    }

    fn key_from_public_url(&self, url: &str) -> Option<String> {
        key_from_public_url(url, &self.config.storage.bucket)
    }
}
