//! Constants exposed to the host at module initialization: platform
//! directory paths and file-type markers.

use std::path::PathBuf;

use serde_json::{json, Value};

pub const FILE_TYPE_REGULAR: i64 = 0;
pub const FILE_TYPE_DIRECTORY: i64 = 1;

/// Platform directory layout supplied by the embedding application.
/// Directories the platform does not provide stay `None` and surface to the
/// host as nulls.
#[derive(Clone, Debug, Default)]
pub struct PlatformDirs {
    pub document_dir: Option<PathBuf>,
    pub temporary_dir: Option<PathBuf>,
    pub pictures_dir: Option<PathBuf>,
    pub caches_dir: Option<PathBuf>,
    pub external_dir: Option<PathBuf>,
    pub external_storage_dir: Option<PathBuf>,
}

/// Builds the constants map handed to the host at init.
pub fn module_constants(dirs: &PlatformDirs) -> Value {
    json!({
        "DOCUMENT_DIRECTORY_PATH": dir_value(&dirs.document_dir),
        "TEMPORARY_DIRECTORY_PATH": dir_value(&dirs.temporary_dir),
        "PICTURES_DIRECTORY_PATH": dir_value(&dirs.pictures_dir),
        "CACHES_DIRECTORY_PATH": dir_value(&dirs.caches_dir),
        "EXTERNAL_DIRECTORY_PATH": dir_value(&dirs.external_dir),
        "EXTERNAL_STORAGE_DIRECTORY_PATH": dir_value(&dirs.external_storage_dir),
        "FILETYPE_REGULAR": FILE_TYPE_REGULAR,
        "FILETYPE_DIRECTORY": FILE_TYPE_DIRECTORY,
    })
}

fn dir_value(dir: &Option<PathBuf>) -> Value {
    match dir {
        Some(path) => Value::String(path.to_string_lossy().into_owned()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directories_surface_as_null() {
        let constants = module_constants(&PlatformDirs {
            document_dir: Some(PathBuf::from("/data/files")),
            ..Default::default()
        });
        assert_eq!(constants["DOCUMENT_DIRECTORY_PATH"], json!("/data/files"));
        assert_eq!(constants["EXTERNAL_DIRECTORY_PATH"], Value::Null);
        assert_eq!(constants["FILETYPE_DIRECTORY"], json!(1));
    }
}
