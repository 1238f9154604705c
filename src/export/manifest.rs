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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ZiError};
use crate::form::ZiFormId;

/// Outcome of one completed rebuild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiRebuildReport {
    pub form_id: ZiFormId,
    pub key: String,
    pub headers: Vec<String>,
    pub rows_written: usize,
    pub bytes_written: usize,
    /// BLAKE3 hex digest of the written bytes.
    pub content_hash: String,
    pub built_at: DateTime<Utc>,
}

impl ZiRebuildReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ZiError::internal(format!("Failed to serialize rebuild report: {}", e)))
    }
}

/// One configured export as seen by a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiExportListing {
    pub form_id: ZiFormId,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether the export object currently exists in the file store.
    pub exists: bool,
}

/// Hex content hash used in rebuild reports.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
