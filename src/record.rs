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

//! # Zixport Entry Module
//!
//! This module provides the data structure for a single form submission.
//! Entries are created by the external submission pipeline; Zixport only
//! reads them.
//!
//! ## Value Model
//!
//! Field values use `serde_json::Value` so that structured inputs (name
//! parts, list fields, multi-selects) can be carried without a schema.
//! [`ZiEntry::value_text`] flattens whatever is stored to the single string
//! that becomes a CSV cell.
//!
//! ## Usage Example
//!
//! ```rust
//! use chrono::Utc;
//! use serde_json::json;
//! use zixport::record::ZiEntry;
//!
//! let entry = ZiEntry::new(1, 7, Utc::now())
//!     .with_value("1", "Hi, Bob!")
//!     .with_value("2", json!(["red", "blue"]));
//!
//! assert_eq!(entry.value_text(&"2".into()), "red, blue");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::form::{ZiFieldId, ZiFormId};

/// Field values keyed by field identifier.
pub type ZiEntryValues = Map<String, Value>;

/// Lifecycle status of an entry. Only `Active` entries are exported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZiEntryStatus {
    #[default]
    Active,
    Spam,
    Trash,
}

/// One form submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZiEntry {
    /// Identifier assigned by the submission pipeline; increases with time.
    pub id: u64,

    pub form_id: ZiFormId,

    #[serde(default)]
    pub status: ZiEntryStatus,

    /// Submission time. Primary key of the newest-first ordering.
    pub date_created: DateTime<Utc>,

    #[serde(default)]
    pub values: ZiEntryValues,
}

impl ZiEntry {
    pub fn new(id: u64, form_id: impl Into<ZiFormId>, date_created: DateTime<Utc>) -> Self {
        ZiEntry {
            id,
            form_id: form_id.into(),
            status: ZiEntryStatus::Active,
            date_created,
            values: ZiEntryValues::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<ZiFieldId>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into().0, value.into());
        self
    }

    pub fn with_status(mut self, status: ZiEntryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ZiEntryStatus::Active
    }

    /// Raw stored value for `field`, looked up by exact identifier.
    pub fn raw(&self, field: &ZiFieldId) -> Option<&Value> {
        self.values.get(field.as_str())
    }

    /// Stored value for `field` flattened to text; missing values are empty.
    pub fn value_text(&self, field: &ZiFieldId) -> String {
        self.raw(field).map(flatten_value).unwrap_or_default()
    }
}

/// Flattens a JSON value to cell text.
///
/// Scalars use their plain textual form (strings are not quoted). Arrays
/// and objects contribute their non-empty scalar leaves, in order, joined
/// with `", "`.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            let mut leaves = Vec::new();
            collect_leaves(value, &mut leaves);
            leaves.join(", ")
        }
    }
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, out)),
        scalar => {
            let text = flatten_value(scalar);
            if !text.is_empty() {
                out.push(text);
            }
        }
    }
}

/// Convenience alias for working on batches of entries.
pub type ZiEntryBatch = Vec<ZiEntry>;
