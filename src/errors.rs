//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zixport.
//! The Zixport project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Zixport Error Module
//!
//! This module defines the error types used throughout Zixport for
//! consistent error handling and reporting.
//!
//! ## Error Categories
//!
//! - **FieldNotFound**: A selected field no longer exists on its form. The
//!   projection resolver skips such fields, so this rarely escapes.
//! - **SourceUnavailable**: The entry source or field catalog failed. The
//!   rebuild aborts and the previous export stays in place.
//! - **WriteFailed**: The export could not be written or replaced.
//! - **InvalidConfig**: Rejected form settings or service configuration.
//! - **Io / Serde / Internal**: Lower-level failures.
//!
//! ## Usage
//!
//! ```rust
//! use zixport::errors::{Result, ZiError};
//!
//! fn check_limit(limit: usize) -> Result<usize> {
//!     if limit == 0 {
//!         return Err(ZiError::invalid_config("entry limit must be at least 1"));
//!     }
//!     Ok(limit)
//! }
//! ```

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Zixport.
pub type Result<T> = std::result::Result<T, ZiError>;

/// Canonical error enumeration for Zixport.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ZiError {
    /// A field identifier is not (or no longer) defined on the form.
    #[error("field '{field_id}' not found on form {form_id}")]
    FieldNotFound { form_id: u64, field_id: String },

    /// The entry source or field catalog could not be read.
    #[error("source unavailable for form {form_id}: {message}")]
    SourceUnavailable { form_id: u64, message: String },

    /// The export destination could not be written, replaced, or removed.
    #[error("write failed for '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Settings or configuration rejected at validation time.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serialization issues (JSON, YAML, CSV).
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for ZiError {
    fn from(err: io::Error) -> Self {
        ZiError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ZiError {
    fn from(err: serde_json::Error) -> Self {
        ZiError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for ZiError {
    fn from(err: serde_yaml::Error) -> Self {
        ZiError::Serde(err.to_string())
    }
}

impl From<csv::Error> for ZiError {
    fn from(err: csv::Error) -> Self {
        ZiError::Serde(format!("csv: {err}"))
    }
}

impl ZiError {
    /// Helper to construct missing-field errors.
    pub fn field_not_found(form_id: u64, field_id: impl Into<String>) -> Self {
        ZiError::FieldNotFound {
            form_id,
            field_id: field_id.into(),
        }
    }

    /// Helper to construct source errors.
    pub fn source_unavailable(form_id: u64, message: impl Into<String>) -> Self {
        ZiError::SourceUnavailable {
            form_id,
            message: message.into(),
        }
    }

    /// Helper to construct write errors.
    pub fn write_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        ZiError::WriteFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Helper to construct configuration errors.
    pub fn invalid_config<T: Into<String>>(message: T) -> Self {
        ZiError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        ZiError::Internal(message.into())
    }

    /// Whether this error only affects a single field and may be skipped.
    pub fn is_field_not_found(&self) -> bool {
        matches!(self, ZiError::FieldNotFound { .. })
    }
}
