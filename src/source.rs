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

//! # Form Sources
//!
//! Read-only collaborators supplying field metadata and entries.
//!
//! ## Ordering Contract
//!
//! [`ZiEntrySource::entries`] returns entries newest-first: `date_created`
//! descending, ties broken by entry id descending. An entry limit therefore
//! keeps the most recent `n` entries. Rebuilds trust this order and never
//! re-sort.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{Result, ZiError};
use crate::form::{ZiFieldId, ZiFieldMeta, ZiFormId};
use crate::record::{ZiEntry, ZiEntryBatch, ZiEntryStatus};

/// Selection criteria for [`ZiEntrySource::entries`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZiEntryQuery {
    pub status: ZiEntryStatus,
    /// Maximum number of entries, counted from the newest.
    pub limit: Option<usize>,
}

impl ZiEntryQuery {
    /// Active entries, unbounded.
    pub fn active() -> Self {
        Self {
            status: ZiEntryStatus::Active,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

impl Default for ZiEntryQuery {
    fn default() -> Self {
        Self::active()
    }
}

/// Field metadata lookup.
pub trait ZiFieldCatalog: Send + Sync {
    /// Returns the field, or [`ZiError::FieldNotFound`] when the form does
    /// not define it. Other errors mean the catalog itself is unavailable.
    fn field(&self, form_id: ZiFormId, field_id: &ZiFieldId) -> Result<ZiFieldMeta>;
}

/// Entry lookup honoring the newest-first ordering contract.
pub trait ZiEntrySource: Send + Sync {
    fn entries(&self, form_id: ZiFormId, query: &ZiEntryQuery) -> Result<ZiEntryBatch>;
}

/// Total order used by entry sources: newest first, then highest id first.
pub fn newest_first(a: &ZiEntry, b: &ZiEntry) -> Ordering {
    b.date_created
        .cmp(&a.date_created)
        .then_with(|| b.id.cmp(&a.id))
}

#[derive(Debug, Default)]
struct ZiMemoryFormsInner {
    fields: HashMap<ZiFormId, Vec<ZiFieldMeta>>,
    entries: HashMap<ZiFormId, Vec<ZiEntry>>,
}

/// In-process catalog and entry source.
///
/// Useful for embedding hosts that already hold submissions in memory and
/// for tests.
#[derive(Debug, Default)]
pub struct ZiMemoryForms {
    inner: RwLock<ZiMemoryFormsInner>,
}

impl ZiMemoryForms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) a field on a form.
    pub fn add_field(&self, form_id: impl Into<ZiFormId>, meta: ZiFieldMeta) -> Result<()> {
        let mut inner = self.write()?;
        let fields = inner.fields.entry(form_id.into()).or_default();
        match fields.iter_mut().find(|f| f.id == meta.id) {
            Some(existing) => *existing = meta,
            None => fields.push(meta),
        }
        Ok(())
    }

    /// Removes a field definition, as happens when a form is edited.
    pub fn remove_field(&self, form_id: impl Into<ZiFormId>, field_id: &ZiFieldId) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(fields) = inner.fields.get_mut(&form_id.into()) else {
            return Ok(false);
        };
        let before = fields.len();
        fields.retain(|f| &f.id != field_id);
        Ok(fields.len() != before)
    }

    pub fn add_entry(&self, entry: ZiEntry) -> Result<()> {
        let mut inner = self.write()?;
        inner.entries.entry(entry.form_id).or_default().push(entry);
        Ok(())
    }

    /// Changes an entry's status (spam, trash, restore).
    pub fn set_status(&self, form_id: impl Into<ZiFormId>, entry_id: u64, status: ZiEntryStatus) -> Result<bool> {
        let mut inner = self.write()?;
        let found = inner
            .entries
            .get_mut(&form_id.into())
            .and_then(|entries| entries.iter_mut().find(|e| e.id == entry_id));
        match found {
            Some(entry) => {
                entry.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn entry_count(&self, form_id: impl Into<ZiFormId>) -> usize {
        self.inner
            .read()
            .map(|inner| inner.entries.get(&form_id.into()).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, ZiMemoryFormsInner>> {
        self.inner
            .write()
            .map_err(|_| ZiError::internal("memory form store lock poisoned"))
    }
}

impl ZiFieldCatalog for ZiMemoryForms {
    fn field(&self, form_id: ZiFormId, field_id: &ZiFieldId) -> Result<ZiFieldMeta> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ZiError::source_unavailable(form_id.get(), "field catalog lock poisoned"))?;
        inner
            .fields
            .get(&form_id)
            .and_then(|fields| fields.iter().find(|f| &f.id == field_id))
            .cloned()
            .ok_or_else(|| ZiError::field_not_found(form_id.get(), field_id.as_str()))
    }
}

impl ZiEntrySource for ZiMemoryForms {
    fn entries(&self, form_id: ZiFormId, query: &ZiEntryQuery) -> Result<ZiEntryBatch> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ZiError::source_unavailable(form_id.get(), "entry store lock poisoned"))?;
        let mut batch: ZiEntryBatch = inner
            .entries
            .get(&form_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.status == query.status)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        batch.sort_by(newest_first);
        if let Some(limit) = query.limit {
            batch.truncate(limit);
        }
        Ok(batch)
    }
}
