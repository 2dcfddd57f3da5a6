//! Boundary to the vendor object-storage SDK and the platform's content
//! resolver.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bridge::SdkError;

/// Resolved download location for a stored object.
#[derive(Clone, Debug)]
pub struct DownloadInfo {
    pub bucket: String,
    pub url: String,
}

/// Object metadata as reported by the storage SDK. Absent fields stay
/// absent; the facade surfaces them as host nulls.
#[derive(Clone, Debug, Default)]
pub struct ObjectMetadata {
    pub bucket: Option<String>,
    pub name: Option<String>,
    pub full_path: Option<String>,
    pub size_bytes: Option<u64>,
    pub created_at_millis: Option<u64>,
    pub updated_at_millis: Option<u64>,
    pub md5_hash: Option<String>,
    pub content_encoding: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_type: Option<String>,
}

/// Final state of a successful upload task.
#[derive(Clone, Debug)]
pub struct UploadResult {
    pub download_url: String,
    pub metadata: ObjectMetadata,
}

/// Receives the native upload task's lifecycle notifications.
pub trait UploadObserver: Send + Sync {
    fn progress(&self, bytes_transferred: u64, total_bytes: u64);
    fn paused(&self, bucket: &str);
    fn success(&self, result: UploadResult);
    fn failure(&self, error: SdkError);
}

pub type DownloadUrlCallback = Box<dyn FnOnce(Result<DownloadInfo, SdkError>) + Send>;
pub type MetadataCallback = Box<dyn FnOnce(Result<ObjectMetadata, SdkError>) + Send>;

pub trait StorageSdk: Send + Sync {
    /// Default bucket of the configured app, when one is set.
    fn default_bucket(&self) -> Option<String>;

    /// Resolves the download URL of the object at `path` under the
    /// `gs://`-style `bucket_url`.
    fn download_url(&self, bucket_url: &str, path: &str, complete: DownloadUrlCallback);

    /// Fetches the object's full metadata.
    fn object_metadata(&self, bucket_url: &str, path: &str, complete: MetadataCallback);

    /// Starts uploading `source` as `name` under `bucket_url`, reporting
    /// through `observer`. Custom metadata entries attach as strings.
    fn upload_file(
        &self,
        bucket_url: &str,
        name: &str,
        source: &Path,
        metadata: &BTreeMap<String, String>,
        observer: Arc<dyn UploadObserver>,
    );
}

/// Resolves platform content URIs (`content://...`) to filesystem paths.
pub trait ContentResolver: Send + Sync {
    fn resolve(&self, uri: &str) -> Result<PathBuf, SdkError>;
}
