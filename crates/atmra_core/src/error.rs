use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used by the store, import and configuration layers.
///
/// The analytics engine itself never produces one of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

/// Coarse classification callers branch on; derived from the error code prefix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StoreUnavailable,
    Validation,
    NotFound,
    Internal,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    /// Store-side failure (open, query, transaction). Marked retryable.
    pub fn store(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message).with_retryable(true)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("DB_NOT_FOUND", message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        let code = self.code.as_str();
        if code == "DB_NOT_FOUND" {
            ErrorKind::NotFound
        } else if code.starts_with("DB_") {
            ErrorKind::StoreUnavailable
        } else if code.starts_with("VALIDATION_")
            || code.starts_with("INGEST_")
            || code.starts_with("CONFIG_")
        {
            ErrorKind::Validation
        } else {
            ErrorKind::Internal
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
