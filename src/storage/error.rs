use std::fmt::{Display, Formatter};

use serde_json::{json, Value};

use crate::bridge::SdkError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageErrorCode {
    DownloadUrl,
    Metadata,
    UploadSetup,
    Upload,
    PathResolution,
}

impl StorageErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageErrorCode::DownloadUrl => "storage/download-url",
            StorageErrorCode::Metadata => "storage/metadata",
            StorageErrorCode::UploadSetup => "storage/upload-setup",
            StorageErrorCode::Upload => "storage/upload",
            StorageErrorCode::PathResolution => "storage/path-resolution",
        }
    }

    /// Numeric code of the historical `{code, message}` wire shape.
    fn wire_code(&self) -> i32 {
        match self {
            StorageErrorCode::UploadSetup => 2,
            _ => 1,
        }
    }
}

/// Storage facade failure.
///
/// The host has always seen storage errors in two shapes; both are produced
/// here from the one internal representation, chosen per call site:
/// [`to_coded_payload`](StorageError::to_coded_payload) for `{code, message}`
/// and [`to_description_payload`](StorageError::to_description_payload) for
/// `{description}`.
#[derive(Clone, Debug)]
pub struct StorageError {
    pub code: StorageErrorCode,
    message: String,
}

impl StorageError {
    pub fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_coded_payload(&self) -> Value {
        json!({
            "code": self.code.wire_code(),
            "message": self.message,
        })
    }

    pub fn to_description_payload(&self) -> Value {
        json!({"description": self.message})
    }

    /// `{status: "error", description}`, the shape of download-URL failures.
    pub fn to_status_payload(&self) -> Value {
        json!({
            "status": "error",
            "description": self.message,
        })
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for StorageError {}

pub fn download_url_failure(error: &SdkError) -> StorageError {
    StorageError::new(StorageErrorCode::DownloadUrl, error.message.clone())
}

pub fn metadata_failure(error: &SdkError) -> StorageError {
    StorageError::new(StorageErrorCode::Metadata, error.message.clone())
}

pub fn upload_setup_failure(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorCode::UploadSetup, message)
}

pub fn upload_failure(error: &SdkError) -> StorageError {
    StorageError::new(StorageErrorCode::Upload, error.message.clone())
}

pub fn path_resolution_failure(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorCode::PathResolution, message)
}
