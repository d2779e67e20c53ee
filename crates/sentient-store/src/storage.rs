//! Supabase Storage object store.
//!
//! Storage API reference: <https://supabase.com/docs/reference/api/storage>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::{Caller, ObjectEntry, ObjectStore};

/// Uploads can carry up to 5 MiB, so allow more time than plain REST calls.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Error kind the Storage API reports for an unknown bucket.
const BUCKET_NOT_FOUND: &str = "Bucket not found";

/// Page size for list requests.
const LIST_LIMIT: u32 = 100;

/// Object store backed by a Supabase Storage bucket.
#[derive(Debug, Clone)]
pub struct SupabaseObjectStore {
    client: Client,
    storage_url: String,
    anon_key: String,
    bucket: String,
}

/// Storage API error body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageErrorBody {
    #[serde(default)]
    status_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    search: &'a str,
    limit: u32,
    offset: u32,
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    metadata: Option<ListedMetadata>,
}

#[derive(Debug, Deserialize)]
struct ListedMetadata {
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl SupabaseObjectStore {
    /// Create a store for `bucket` in the project at `project_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        project_url: &str,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            storage_url: format!("{}/storage/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
            bucket: bucket.into(),
        })
    }

    fn authorize(&self, request: RequestBuilder, caller: &Caller) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&caller.access_token)
    }

    /// Map a failed Storage API response to a store error.
    async fn error_from(&self, response: Response, key: &str) -> StoreError {
        let status = response.status().as_u16();
        let body: StorageErrorBody = response.json().await.unwrap_or_default();
        let kind = body.error.unwrap_or_default();
        let message = body
            .message
            .unwrap_or_else(|| format!("HTTP {status}"));

        tracing::warn!(
            status,
            bucket = %self.bucket,
            key = %key,
            error = %message,
            "Storage request failed"
        );

        // storage reports its own status in the body; a missing bucket is a 404 there
        let reported = body
            .status_code
            .as_deref()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(status);

        match reported {
            401 | 403 => StoreError::PermissionDenied(message),
            404 if kind == BUCKET_NOT_FOUND => {
                StoreError::MissingSchemaObject(format!("bucket {}: {message}", self.bucket))
            }
            404 => StoreError::NotFound {
                entity: "object",
                id: key.to_string(),
            },
            _ => StoreError::Backend {
                status: reported,
                code: None,
                message,
            },
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn upload(
        &self,
        caller: &Caller,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let url = format!("{}/object/{}/{key}", self.storage_url, self.bucket);
        let size = bytes.len();
        let request = self
            .client
            .post(&url)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);

        let response = self.authorize(request, caller).send().await?;
        if !response.status().is_success() {
            return Err(self.error_from(response, key).await);
        }

        tracing::info!(bucket = %self.bucket, key = %key, size, "Object uploaded");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/object/public/{}/{key}", self.storage_url, self.bucket)
    }

    async fn list(&self, caller: &Caller, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let url = format!("{}/object/list/{}", self.storage_url, self.bucket);
        let mut entries = Vec::new();
        let mut offset = 0;

        loop {
            // keys are flat ("<user>_<millis>-<nonce>.<ext>"), so search the bucket root
            let body = ListRequest {
                prefix: "",
                search: prefix,
                limit: LIST_LIMIT,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            };

            let response = self
                .authorize(self.client.post(&url).json(&body), caller)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(self.error_from(response, prefix).await);
            }

            let page: Vec<ListedObject> = response.json().await?;
            let page_len = page.len();
            entries.extend(
                page.into_iter()
                    .filter(|o| o.name.starts_with(prefix))
                    .map(|o| ObjectEntry {
                        name: o.name,
                        size: o.metadata.and_then(|m| m.size),
                        created_at: o.created_at,
                    }),
            );

            if page_len < LIST_LIMIT as usize {
                break;
            }
            offset += LIST_LIMIT;
        }

        tracing::debug!(bucket = %self.bucket, prefix = %prefix, count = entries.len(), "Objects listed");
        Ok(entries)
    }

    async fn remove(&self, caller: &Caller, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let url = format!("{}/object/{}", self.storage_url, self.bucket);
        let response = self
            .authorize(
                self.client.delete(&url).json(&RemoveRequest { prefixes: keys }),
                caller,
            )
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.error_from(response, &keys.join(",")).await);
        }

        tracing::info!(bucket = %self.bucket, count = keys.len(), "Objects removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_layout() {
        let store =
            SupabaseObjectStore::new("https://abc.supabase.co", "anon", "payment-proofs").unwrap();
        assert_eq!(
            store.public_url("u_1.png"),
            "https://abc.supabase.co/storage/v1/object/public/payment-proofs/u_1.png"
        );
    }
}
