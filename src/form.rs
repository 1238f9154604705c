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

//! # Form Model
//!
//! Identifiers, field metadata and the persisted per-form export policy.
//!
//! A [`ZiFormConfig`] is the unit stored by the settings store: it names the
//! fields to export (in column order), the text policy, and an optional
//! retention bound. Only configs with at least one selected field are
//! active; saving anything else is rejected.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ZiError};

/// Identifier of a form. Zero is never a valid form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZiFormId(pub u64);

impl ZiFormId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ZiFormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ZiFormId {
    fn from(value: u64) -> Self {
        ZiFormId(value)
    }
}

/// Identifier of a field within a form.
///
/// Kept textual because entries address sub-inputs with dotted ids
/// such as `"1.3"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZiFieldId(pub String);

impl ZiFieldId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZiFieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZiFieldId {
    fn from(value: &str) -> Self {
        ZiFieldId(value.to_string())
    }
}

impl From<String> for ZiFieldId {
    fn from(value: String) -> Self {
        ZiFieldId(value)
    }
}

impl From<u32> for ZiFieldId {
    fn from(value: u32) -> Self {
        ZiFieldId(value.to_string())
    }
}

/// Metadata describing one field of a form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiFieldMeta {
    pub id: ZiFieldId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_label: Option<String>,
}

impl ZiFieldMeta {
    pub fn new(id: impl Into<ZiFieldId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            admin_label: None,
        }
    }

    pub fn with_admin_label(mut self, admin_label: impl Into<String>) -> Self {
        self.admin_label = Some(admin_label.into());
        self
    }

    /// Column header for this field.
    ///
    /// The admin label wins when non-empty. The chosen label is ASCII
    /// lower-cased and every space becomes an underscore. Two fields may
    /// produce the same header; callers keep both columns.
    pub fn header_label(&self) -> String {
        let label = match self.admin_label.as_deref() {
            Some(admin) if !admin.is_empty() => admin,
            _ => self.label.as_str(),
        };
        label.replace(' ', "_").to_ascii_lowercase()
    }
}

/// Persisted export policy for one form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiFormConfig {
    pub form_id: ZiFormId,
    /// Column order is insertion order.
    #[serde(rename = "fields")]
    pub selected_fields: Vec<ZiFieldId>,
    #[serde(default)]
    pub strip_html: bool,
    #[serde(default)]
    pub strip_punctuation: bool,
    /// Keep only the newest `n` entries. `None` exports every active entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_limit: Option<usize>,
}

impl ZiFormConfig {
    /// Creates a config selecting `fields`; duplicates keep their first position.
    pub fn new<I, F>(form_id: impl Into<ZiFormId>, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<ZiFieldId>,
    {
        Self {
            form_id: form_id.into(),
            selected_fields: dedup_fields(fields.into_iter().map(Into::into).collect()),
            strip_html: false,
            strip_punctuation: false,
            entry_limit: None,
        }
    }

    pub fn with_strip_html(mut self, strip_html: bool) -> Self {
        self.strip_html = strip_html;
        self
    }

    pub fn with_strip_punctuation(mut self, strip_punctuation: bool) -> Self {
        self.strip_punctuation = strip_punctuation;
        self
    }

    pub fn with_entry_limit(mut self, entry_limit: Option<usize>) -> Self {
        self.entry_limit = entry_limit;
        self
    }

    /// A config exports only when at least one field is selected.
    pub fn is_active(&self) -> bool {
        !self.selected_fields.is_empty()
    }

    /// Checks the invariants that saved settings must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.form_id.get() == 0 {
            return Err(ZiError::invalid_config("form id must be positive"));
        }
        if self.selected_fields.is_empty() {
            return Err(ZiError::invalid_config(format!(
                "form {} selects no fields",
                self.form_id
            )));
        }
        if self.entry_limit == Some(0) {
            return Err(ZiError::invalid_config(format!(
                "form {} entry limit must be at least 1",
                self.form_id
            )));
        }
        Ok(())
    }

    /// Removes duplicate field selections, then validates.
    pub fn normalized(mut self) -> Result<Self> {
        let before = self.selected_fields.len();
        self.selected_fields = dedup_fields(std::mem::take(&mut self.selected_fields));
        if self.selected_fields.len() != before {
            log::debug!(
                "form {}: dropped {} duplicate field selection(s)",
                self.form_id,
                before - self.selected_fields.len()
            );
        }
        self.validate()?;
        Ok(self)
    }
}

fn dedup_fields(fields: Vec<ZiFieldId>) -> Vec<ZiFieldId> {
    let mut seen = HashSet::with_capacity(fields.len());
    fields
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
