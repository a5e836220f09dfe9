//! Blob storage adapter.
//!
//! Uploads and downloads never raise: every SDK error is logged and turned
//! into `false` / `None`. A call either fully succeeds or reports failure.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{error, info};

use crate::config::Config;

/// Bucket/key addressed blob storage. Carried in `AppState` as `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns `true` if the object was stored.
    async fn upload(&self, bytes: Bytes, bucket: &str, key: &str) -> bool;

    /// Returns the object's bytes, or `None` if it could not be fetched.
    async fn download(&self, bucket: &str, key: &str) -> Option<Bytes>;
}

/// S3 / MinIO backed store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3BlobStore {
    async fn upload(&self, bytes: Bytes, bucket: &str, key: &str) -> bool {
        let size = bytes.len();
        match self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
        {
            Ok(_) => {
                info!("Uploaded {size} bytes to s3://{bucket}/{key}");
                true
            }
            Err(e) => {
                error!("S3 upload to s3://{bucket}/{key} failed: {}", DisplayErrorContext(&e));
                false
            }
        }
    }

    async fn download(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                error!("S3 download of s3://{bucket}/{key} failed: {}", DisplayErrorContext(&e));
                return None;
            }
        };
        match output.body.collect().await {
            Ok(data) => Some(data.into_bytes()),
            Err(e) => {
                error!("Reading s3://{bucket}/{key} failed: {e}");
                None
            }
        }
    }
}

/// Constructs an S3 client for MinIO (custom endpoint) or AWS.
///
/// Static credentials are used when both keys are configured; otherwise the
/// SDK's default provider chain applies.
pub async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let (Some(key_id), Some(secret)) = (&config.aws_access_key_id, &config.aws_secret_access_key)
    {
        loader = loader.credentials_provider(Credentials::new(
            key_id,
            secret,
            None,
            None,
            "infographic-static",
        ));
    }
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let shared = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(config.s3_endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
