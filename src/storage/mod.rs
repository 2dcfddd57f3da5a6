//! # Object-storage bridge module
//!
//! Pass-through over the native storage SDK's upload and download tasks.
//! Progress and pause notifications forward as host events
//! (`upload_progress`, `upload_paused`); terminal states resolve each
//! call's completion callback. Platform `content://` URIs resolve through
//! the [`ContentResolver`](sdk::ContentResolver) boundary before upload,
//! and platform directory constants are exposed to the host at init.
//!
//! Storage errors keep their two historical wire shapes, `{code, message}`
//! and `{description}`, both produced from [`error::StorageError`].

pub mod constants;
pub mod error;
mod module;
pub mod sdk;

#[doc(inline)]
pub use constants::{module_constants, PlatformDirs, FILE_TYPE_DIRECTORY, FILE_TYPE_REGULAR};

#[doc(inline)]
pub use error::{StorageError, StorageErrorCode};

#[doc(inline)]
pub use module::StorageModule;

#[doc(inline)]
pub use sdk::{
    ContentResolver, DownloadInfo, ObjectMetadata, StorageSdk, UploadObserver, UploadResult,
};
