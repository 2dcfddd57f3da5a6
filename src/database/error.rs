use std::fmt::{Display, Formatter};

use serde_json::{json, Value};

use crate::bridge::SdkError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseErrorCode {
    InvalidModifier,
    UnknownModifier,
    InvalidPath,
    Sdk,
}

impl DatabaseErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseErrorCode::InvalidModifier => "database/invalid-modifier",
            DatabaseErrorCode::UnknownModifier => "database/unknown-modifier",
            DatabaseErrorCode::InvalidPath => "database/invalid-path",
            DatabaseErrorCode::Sdk => "database/sdk-failure",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseError {
    pub code: DatabaseErrorCode,
    message: String,
    sdk: Option<SdkError>,
}

impl DatabaseError {
    pub fn new(code: DatabaseErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            sdk: None,
        }
    }

    pub fn from_sdk(error: SdkError) -> Self {
        Self {
            code: DatabaseErrorCode::Sdk,
            message: error.message.clone(),
            sdk: Some(error),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Wire payload delivered to the host: `{errorCode, errorDetails, description}`.
    ///
    /// SDK failures forward their numeric code and details verbatim; local
    /// failures use `-1` and the crate's code string as the details field.
    pub fn to_payload(&self) -> Value {
        match &self.sdk {
            Some(sdk) => json!({
                "errorCode": sdk.code,
                "errorDetails": sdk.details,
                "description": sdk.message,
            }),
            None => json!({
                "errorCode": -1,
                "errorDetails": self.code_str(),
                "description": self.message,
            }),
        }
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for DatabaseError {}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

pub fn invalid_modifier(message: impl Into<String>) -> DatabaseError {
    DatabaseError::new(DatabaseErrorCode::InvalidModifier, message)
}

pub fn unknown_modifier(instruction: &str) -> DatabaseError {
    DatabaseError::new(
        DatabaseErrorCode::UnknownModifier,
        format!("Unrecognized query modifier: {instruction}"),
    )
}

pub fn invalid_path(message: impl Into<String>) -> DatabaseError {
    DatabaseError::new(DatabaseErrorCode::InvalidPath, message)
}

pub fn sdk_failure(error: SdkError) -> DatabaseError {
    DatabaseError::from_sdk(error)
}
