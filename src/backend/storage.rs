use super::{check_status, BackendClient};
use crate::error::{ConsoleError, ConsoleResult};
use chrono::Utc;

impl BackendClient {
    /// Upload `bytes` to `bucket/path`, replacing any existing object.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ConsoleResult<String> {
        if bytes.is_empty() {
            return Err(ConsoleError::Validation("Cannot upload an empty file".to_string()));
        }

        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{path}"));
        log::debug!("Uploading {} bytes to {bucket}/{path}", bytes.len());

        let response = self
            .authorize(self.http().post(url))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        check_status(response).await?;

        Ok(self.public_url(bucket, path))
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&format!("storage/v1/object/public/{bucket}/{path}"))
    }
}

/// Object path for a raffle image: `<raffle_id>/<millis>-<safe file name>`.
pub fn raffle_image_path(raffle_id: &str, file_name: &str) -> String {
    let safe: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let safe = if safe.trim_matches('-').is_empty() {
        "image".to_string()
    } else {
        safe
    };
    format!("{raffle_id}/{}-{safe}", Utc::now().timestamp_millis())
}
