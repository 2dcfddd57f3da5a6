//! Host-facing file-storage surface.
//!
//! A thin pass-through over the native SDK's download/upload tasks: upload
//! progress and pauses forward as host events, terminal states resolve the
//! per-call callback. Local `content://` paths go through the platform
//! content resolver before upload.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use url::Url;

use crate::bridge::{
    EventSink, ModuleCallback, SdkError, UPLOAD_PAUSED, UPLOAD_PROGRESS,
};
use crate::marshal::{self, NativeValue};
use crate::storage::constants::{module_constants, PlatformDirs};
use crate::storage::error::{
    download_url_failure, metadata_failure, path_resolution_failure, upload_failure,
    upload_setup_failure,
};
use crate::storage::sdk::{ContentResolver, ObjectMetadata, StorageSdk, UploadObserver, UploadResult};

const CONTENT_URI_SCHEME: &str = "content://";

pub struct StorageModule {
    sdk: Arc<dyn StorageSdk>,
    events: Arc<dyn EventSink>,
    resolver: Arc<dyn ContentResolver>,
    dirs: PlatformDirs,
}

impl StorageModule {
    pub fn new(
        sdk: Arc<dyn StorageSdk>,
        events: Arc<dyn EventSink>,
        resolver: Arc<dyn ContentResolver>,
        dirs: PlatformDirs,
    ) -> Self {
        Self {
            sdk,
            events,
            resolver,
            dirs,
        }
    }

    /// Constants handed to the host at module init.
    pub fn constants(&self) -> Value {
        module_constants(&self.dirs)
    }

    /// Resolves the download URL and full metadata of the object at `path`.
    /// Both lookups must succeed; either failure propagates to the caller.
    pub fn download_url(&self, bucket: &str, path: &str, callback: ModuleCallback) {
        let bucket = if bucket.is_empty() {
            match self.sdk.default_bucket() {
                Some(bucket) => bucket,
                None => {
                    let error = download_url_failure(&SdkError::new(
                        1,
                        "No storage bucket configured",
                        "",
                    ));
                    callback(Err(error.to_status_payload()));
                    return;
                }
            }
        } else {
            bucket.to_string()
        };

        let storage_url = format!("gs://{bucket}");
        log::debug!("resolving download url {storage_url}/{path}");

        let sdk = self.sdk.clone();
        let metadata_url = storage_url.clone();
        let object_path = path.to_string();
        self.sdk.download_url(
            &storage_url,
            path,
            Box::new(move |result| match result {
                Ok(info) => {
                    let url_path = Url::parse(&info.url)
                        .map(|url| url.path().to_string())
                        .unwrap_or_else(|_| object_path.clone());
                    sdk.object_metadata(
                        &metadata_url,
                        &object_path,
                        Box::new(move |metadata| match metadata {
                            Ok(metadata) => {
                                callback(Ok(json!({
                                    "status": "success",
                                    "bucket": info.bucket,
                                    "fullPath": info.url.clone(),
                                    "path": url_path,
                                    "url": info.url,
                                    "name": metadata.name.clone(),
                                    "metadata": {
                                        "getBucket": metadata.bucket,
                                        "getName": metadata.name,
                                        "sizeBytes": metadata.size_bytes,
                                        "created_at": metadata.created_at_millis,
                                        "updated_at": metadata.updated_at_millis,
                                        "md5hash": metadata.md5_hash,
                                        "encoding": metadata.content_encoding,
                                    },
                                })));
                            }
                            Err(error) => {
                                log::error!("metadata lookup failed: {error}");
                                callback(Err(metadata_failure(&error).to_coded_payload()));
                            }
                        }),
                    );
                }
                Err(error) => {
                    log::error!("download url lookup failed: {error}");
                    callback(Err(download_url_failure(&error).to_status_payload()));
                }
            }),
        );
    }

    /// Uploads the file at `filepath` as `name` under the `gs://` bucket
    /// `url`. Content URIs resolve to filesystem paths first; resolution
    /// failure fails the call before any upload starts.
    pub fn upload_file(
        &self,
        url: &str,
        name: &str,
        filepath: &str,
        metadata: &Value,
        callback: ModuleCallback,
    ) {
        log::info!("uploading {filepath} to {url} as {name}");

        let source = if filepath.starts_with(CONTENT_URI_SCHEME) {
            match self.resolver.resolve(filepath) {
                Ok(path) => path,
                Err(error) => {
                    let error = upload_setup_failure(error.message);
                    callback(Err(error.to_coded_payload()));
                    return;
                }
            }
        } else {
            PathBuf::from(filepath)
        };

        let custom_metadata = stringify_metadata(metadata);
        let observer = Arc::new(ForwardingUploadObserver {
            events: self.events.clone(),
            callback: Mutex::new(Some(callback)),
        });
        self.sdk
            .upload_file(url, name, &source, &custom_metadata, observer);
    }

    /// Resolves a platform content URI to a filesystem path.
    pub fn get_real_path_from_uri(&self, uri: &str, callback: ModuleCallback) {
        match self.resolver.resolve(uri) {
            Ok(path) => callback(Ok(Value::String(path.to_string_lossy().into_owned()))),
            Err(error) => {
                let error = path_resolution_failure(error.message);
                callback(Err(error.to_coded_payload()));
            }
        }
    }
}

/// Per-upload pass-through state machine: progress and pause notifications
/// forward as events, the terminal notification resolves the call's
/// callback exactly once.
struct ForwardingUploadObserver {
    events: Arc<dyn EventSink>,
    callback: Mutex<Option<ModuleCallback>>,
}

impl ForwardingUploadObserver {
    fn resolve(&self, result: Result<Value, Value>) {
        if let Some(callback) = self.callback.lock().unwrap().take() {
            callback(result);
        }
    }
}

impl UploadObserver for ForwardingUploadObserver {
    fn progress(&self, bytes_transferred: u64, total_bytes: u64) {
        // No percentage is computable until the task knows its total size.
        if total_bytes == 0 {
            log::debug!("transferred {bytes_transferred} bytes, total unknown");
            return;
        }
        let progress = (100.0 * bytes_transferred as f64) / total_bytes as f64;
        log::debug!("transferred {bytes_transferred}/{total_bytes} ({progress}% complete)");
        self.events.emit(
            UPLOAD_PROGRESS,
            json!({
                "eventName": "upload_progress",
                "progress": progress,
            }),
        );
    }

    fn paused(&self, bucket: &str) {
        log::debug!("upload paused (bucket {bucket})");
        self.events.emit(
            UPLOAD_PAUSED,
            json!({
                "eventName": "upload_paused",
                "ref": bucket,
            }),
        );
    }

    fn success(&self, result: UploadResult) {
        self.resolve(Ok(upload_success_payload(&result)));
    }

    fn failure(&self, error: SdkError) {
        log::error!("upload failed: {error}");
        self.resolve(Err(upload_failure(&error).to_description_payload()));
    }
}

fn upload_success_payload(result: &UploadResult) -> Value {
    let ObjectMetadata {
        bucket,
        name,
        full_path,
        cache_control,
        content_disposition,
        content_type,
        ..
    } = &result.metadata;
    json!({
        "downloadUrl": result.download_url,
        "fullPath": full_path,
        "bucket": bucket,
        "name": name,
        "metadata": {
            "cacheControl": cache_control,
            "contentDisposition": content_disposition,
            "contentType": content_type,
        },
    })
}

/// Flattens a host metadata mapping into string-valued custom metadata.
fn stringify_metadata(metadata: &Value) -> BTreeMap<String, String> {
    marshal::to_native_children(metadata)
        .into_iter()
        .map(|(key, value)| {
            let rendered = match value {
                NativeValue::Leaf(scalar) => scalar.to_string(),
                branch @ NativeValue::Branch(_) => marshal::snapshot_to_host(&branch).to_string(),
            };
            (key, rendered)
        })
        .collect()
}
