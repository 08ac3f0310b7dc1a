//! S3-compatible storage
//!
//! Wraps the AWS SDK for S3-compatible object storage. Each sync record is
//! one JSON object at `<namespace>/<CODE>.json`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};

use super::SyncStore;
use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::sync::{SyncId, SyncRecord};

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration
    pub async fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "koha-sync",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO and other S3-compatible services
            .build();

        let client = Client::from_conf(s3_config);

        // Test connection by checking if bucket exists
        let bucket = config.bucket.clone();
        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    bucket,
                    e
                );
            }
        }

        Ok(Self { client, bucket })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get an object's bytes, `None` if the key does not exist
    pub async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(StoreError::ObjectStore(format!(
                    "Failed to get object {}: {}",
                    key, e
                )));
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::ObjectStore(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(Some(data))
    }

    /// Write an object, replacing any existing one
    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StoreError::ObjectStore(format!("Failed to put object {}: {}", key, e)))?;

        Ok(())
    }
}

/// Sync store over an S3 bucket
#[derive(Clone)]
pub struct S3Store {
    client: S3Client,
    namespace: String,
}

impl S3Store {
    pub fn new(client: S3Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    fn object_key(&self, id: &SyncId) -> String {
        object_key(&self.namespace, id)
    }
}

fn object_key(namespace: &str, id: &SyncId) -> String {
    format!("{}/{}.json", namespace, id)
}

#[async_trait]
impl SyncStore for S3Store {
    fn backend(&self) -> &'static str {
        "s3"
    }

    async fn get(&self, id: &SyncId) -> Result<Option<SyncRecord>, StoreError> {
        let key = self.object_key(id);
        let Some(data) = self.client.get_object(&key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn set(&self, id: &SyncId, record: &SyncRecord) -> Result<(), StoreError> {
        let key = self.object_key(id);
        let data = serde_json::to_vec(record)?;
        self.client
            .put_object(&key, data, "application/json")
            .await?;
        tracing::debug!("Stored sync record at s3://{}/{}", self.client.bucket(), key);
        Ok(())
    }
}
