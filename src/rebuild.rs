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

//! # Export Rebuilder
//!
//! Regenerates a form's export from scratch: resolve columns, read the
//! active entries (newest first, bounded by the entry limit), run every
//! cell through the form's cell pipeline, serialize, and atomically replace
//! the stored object.
//!
//! ## Failure Behavior
//!
//! - No resolvable columns: nothing is written and any existing export is
//!   left as it was.
//! - Entry source failure: [`ZiError::SourceUnavailable`], export untouched.
//! - Serialization or storage failure: [`ZiError::WriteFailed`]; the file
//!   store's atomic replace keeps the previous export visible.
//!
//! The rebuilder is synchronous and does no locking of its own. Callers
//! that may rebuild the same form concurrently go through
//! [`crate::scheduler::ZiRebuildScheduler`].

use std::sync::Arc;

use chrono::Utc;

use crate::errors::{Result, ZiError};
use crate::export::{
    compute_content_hash, ZiExportLayout, ZiFileStore, ZiRebuildReport, ZiTable, ZiTableWriter,
};
use crate::form::{ZiFormConfig, ZiFormId};
use crate::projection::resolve_columns;
use crate::sanitize::ZiCellPipeline;
use crate::source::{ZiEntryQuery, ZiEntrySource, ZiFieldCatalog};

pub struct ZiRebuilder {
    catalog: Arc<dyn ZiFieldCatalog>,
    entries: Arc<dyn ZiEntrySource>,
    files: Arc<dyn ZiFileStore>,
    layout: ZiExportLayout,
}

impl std::fmt::Debug for ZiRebuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZiRebuilder")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl ZiRebuilder {
    pub fn new(
        catalog: Arc<dyn ZiFieldCatalog>,
        entries: Arc<dyn ZiEntrySource>,
        files: Arc<dyn ZiFileStore>,
    ) -> Self {
        Self {
            catalog,
            entries,
            files,
            layout: ZiExportLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: ZiExportLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &ZiExportLayout {
        &self.layout
    }

    pub fn files(&self) -> &Arc<dyn ZiFileStore> {
        &self.files
    }

    /// Builds the projected, sanitized table without writing anything.
    ///
    /// Returns `Ok(None)` when no selected field resolves to a column.
    pub fn build_table(&self, config: &ZiFormConfig) -> Result<Option<ZiTable>> {
        let form_id = config.form_id;
        let projection = resolve_columns(self.catalog.as_ref(), form_id, &config.selected_fields)?;
        if projection.is_empty() {
            log::info!("form {form_id}: no resolvable columns, export left unchanged");
            return Ok(None);
        }

        let query = ZiEntryQuery::active().with_limit(config.entry_limit);
        let mut entries = self
            .entries
            .entries(form_id, &query)
            .map_err(|err| as_source_error(form_id, err))?;
        if let Some(limit) = config.entry_limit {
            entries.truncate(limit);
        }

        let pipeline = ZiCellPipeline::for_policy(config.strip_html, config.strip_punctuation);
        let mut table = ZiTable::new(projection.headers());
        for entry in &entries {
            let row = projection
                .project(entry)
                .into_iter()
                .map(|cell| pipeline.run(cell))
                .collect();
            table.push_row(row);
        }
        Ok(Some(table))
    }

    /// Fully regenerates the export for `config`.
    ///
    /// Returns `Ok(None)` for the no-column no-op.
    pub fn rebuild(&self, config: &ZiFormConfig) -> Result<Option<ZiRebuildReport>> {
        let Some(table) = self.build_table(config)? else {
            return Ok(None);
        };

        let key = self.layout.key_for(config.form_id);
        let bytes = ZiTableWriter::new(self.layout.format)
            .render(&table)
            .map_err(|err| ZiError::write_failed(&key, err.to_string()))?;
        self.files
            .write(&key, &bytes)
            .map_err(|err| as_write_error(&key, err))?;

        let report = ZiRebuildReport {
            form_id: config.form_id,
            key,
            headers: table.headers,
            rows_written: table.rows.len(),
            bytes_written: bytes.len(),
            content_hash: compute_content_hash(&bytes),
            built_at: Utc::now(),
        };
        log::info!(
            "form {}: rebuilt {} with {} row(s), {} column(s)",
            report.form_id,
            report.key,
            report.rows_written,
            report.headers.len()
        );
        Ok(Some(report))
    }

    /// Removes the export object for `form_id`; absent objects are fine.
    pub fn remove(&self, form_id: ZiFormId) -> Result<bool> {
        let key = self.layout.key_for(form_id);
        let removed = self
            .files
            .delete(&key)
            .map_err(|err| as_write_error(&key, err))?;
        if removed {
            log::info!("form {form_id}: removed {key}");
        }
        Ok(removed)
    }
}

fn as_source_error(form_id: ZiFormId, err: ZiError) -> ZiError {
    match err {
        ZiError::SourceUnavailable { .. } => err,
        other => ZiError::source_unavailable(form_id.get(), other.to_string()),
    }
}

fn as_write_error(key: &str, err: ZiError) -> ZiError {
    match err {
        ZiError::WriteFailed { .. } => err,
        other => ZiError::write_failed(key, other.to_string()),
    }
}
