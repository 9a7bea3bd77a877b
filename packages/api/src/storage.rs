//! Storage keys and public object URLs.
//!
//! Uploaded images live under `"{owner_id}/{timestamp}.{ext}"` and are served from
//! `{base}/storage/v1/object/public/{bucket}/{key}`.

use url::Url;

/// Build the storage key for a newly uploaded file.
pub fn storage_key(owner_id: &str, timestamp_millis: i64, file_name: &str) -> String {
    format!("{owner_id}/{timestamp_millis}.{}", file_extension(file_name))
}

/// Lower-cased extension of `file_name`, or `bin` when it has none or it is not plain
/// ASCII alphanumerics. Keys are interpolated into request paths unescaped.
pub fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    }
}

/// Public URL of an object.
pub fn public_object_url(base_url: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{bucket}/{key}",
        base_url.trim_end_matches('/')
    )
}

/// Extract the object key from a public URL of `bucket`.
pub fn key_from_public_url(url: &str, bucket: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let marker = format!("/object/public/{bucket}/");
    let path = parsed.path();
    let start = path.find(&marker)? + marker.len();
    let key = &path[start..];
    if key.is_empty() {
        return None;
    }
    urlencoding::decode(key).ok().map(|k| k.into_owned())
}
