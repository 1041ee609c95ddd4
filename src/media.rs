use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Image;

#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// The staged upload could not be read from disk.
    #[error("failed to read staged image: {0}")]
    Read(String),
    #[error("media host error: {0}")]
    Host(String),
    #[error("media host timed out")]
    Timeout,
}

/// UploadedImage
///
/// Where the media host put an image: its public URL and the identifier needed to
/// remove it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

impl From<UploadedImage> for Image {
    fn from(uploaded: UploadedImage) -> Self {
        Image {
            url: uploaded.url,
            public_id: Some(uploaded.public_id),
        }
    }
}

// 1. MediaService Contract
/// MediaService
///
/// The abstract contract for the external image host. Handlers only see this trait,
/// so the S3 client in production and the mock in tests are interchangeable.
#[async_trait]
pub trait MediaService: Send + Sync {
    /// Creates the configured bucket if it is missing. Called at local startup only.
    async fn ensure_bucket_exists(&self);

    /// Uploads the staged file at `path` and returns its public location.
    async fn upload_image(&self, path: &Path, content_type: &str)
    -> Result<UploadedImage, MediaError>;

    /// Removes one previously uploaded image by its public id.
    async fn remove_image(&self, public_id: &str) -> Result<(), MediaError>;

    /// Removes several images, stopping at the first failure.
    async fn remove_images(&self, public_ids: &[String]) -> Result<(), MediaError> {
        for public_id in public_ids {
            self.remove_image(public_id).await?;
        }
        Ok(())
    }
}

/// Object key for a new upload: a random name that keeps the original extension.
fn object_key(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());
    format!("images/{}.{ext}", Uuid::new_v4())
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a public id read back from the database
/// cannot address objects outside the bucket's key space.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 2. The Real Implementation (S3/MinIO)
/// S3MediaClient
///
/// Stores images in an S3-compatible bucket. Every call to the host is bounded by
/// the configured timeout.
#[derive(Clone)]
pub struct S3MediaClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
    timeout: Duration,
}

impl S3MediaClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
        timeout: Duration,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // MinIO requires path-style addressing (http://endpoint/bucket/key).
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn bounded<T, E, F>(&self, call: F) -> Result<T, MediaError>
    where
        F: Future<Output = Result<T, E>> + Send,
        E: std::fmt::Display,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| MediaError::Timeout)?
            .map_err(|e| MediaError::Host(e.to_string()))
    }
}

#[async_trait]
impl MediaService for S3MediaClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(error = %e, bucket = %self.bucket_name, "create_bucket skipped");
        }
    }

    async fn upload_image(
        &self,
        path: &Path,
        content_type: &str,
    ) -> Result<UploadedImage, MediaError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::Read(e.to_string()))?;
        let key = object_key(path);

        self.bounded(
            self.client
                .put_object()
                .bucket(&self.bucket_name)
                .key(&key)
                .content_type(content_type)
                .body(ByteStream::from(bytes))
                .send(),
        )
        .await?;

        tracing::info!(key = %key, "image uploaded");
        Ok(UploadedImage {
            url: format!("{}/{key}", self.public_url),
            public_id: key,
        })
    }

    async fn remove_image(&self, public_id: &str) -> Result<(), MediaError> {
        let key = sanitize_key(public_id);
        self.bounded(
            self.client
                .delete_object()
                .bucket(&self.bucket_name)
                .key(&key)
                .send(),
        )
        .await?;

        tracing::info!(key = %key, "image removed");
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockMediaService
///
/// Records uploads and removals in memory. With `should_fail` set, every host call
/// returns an error, which lets tests exercise the failure paths of the handlers.
#[derive(Clone, Default)]
pub struct MockMediaService {
    pub should_fail: bool,
    uploaded: Arc<Mutex<Vec<String>>>,
    removed: Arc<Mutex<Vec<String>>>,
}

impl MockMediaService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn uploaded_ids(&self) -> Vec<String> {
        self.uploaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn removed_ids(&self) -> Vec<String> {
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MediaService for MockMediaService {
    async fn ensure_bucket_exists(&self) {}

    async fn upload_image(
        &self,
        path: &Path,
        _content_type: &str,
    ) -> Result<UploadedImage, MediaError> {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| MediaError::Read(e.to_string()))?;
        if self.should_fail {
            return Err(MediaError::Host("mock media host failure".to_string()));
        }

        let key = object_key(path);
        self.uploaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());
        Ok(UploadedImage {
            url: format!("http://localhost:9000/mock-bucket/{key}"),
            public_id: key,
        })
    }

    async fn remove_image(&self, public_id: &str) -> Result<(), MediaError> {
        if self.should_fail {
            return Err(MediaError::Host("mock media host failure".to_string()));
        }
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sanitize_key(public_id));
        Ok(())
    }
}

/// MediaState
///
/// The shared handle to the media host stored in the application state.
pub type MediaState = Arc<dyn MediaService>;
