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

//! # Zixport Core Library
//!
//! Zixport turns a stream of form submissions into a durable CSV export per
//! form. Each export is a projection of the form's entries onto a selected,
//! ordered set of fields, with every cell sanitized, optionally bounded to
//! the most recent entries, and always regenerated in full from the entry
//! store.
//!
//! ## Module Overview
//!
//! - **form**: Form and field identifiers, field metadata, per-form export policy
//! - **record**: ZiEntry, one submission's field values
//! - **sanitize**: Cell stages (markup stripping, character sanitization)
//! - **projection**: Column resolution from selected field ids
//! - **source**: Field catalog and entry source collaborators
//! - **store**: Settings stores keyed by form id
//! - **export**: Table writer, file stores, storage layout, reports
//! - **rebuild**: Full export regeneration
//! - **scheduler**: Per-form serialized, coalescing rebuild queue
//! - **service**: Settings lifecycle and the submission trigger
//! - **config**: Service configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use zixport::{ZiExportService, ZiFormConfig, ZiMemoryForms, ZiMemoryFileStore,
//!     ZiMemorySettingsStore, ZiRebuilder, ZiSubmissionEvent};
//!
//! let forms = Arc::new(ZiMemoryForms::new());
//! let rebuilder = ZiRebuilder::new(forms.clone(), forms.clone(), Arc::new(ZiMemoryFileStore::new()));
//! let service = ZiExportService::new(Arc::new(ZiMemorySettingsStore::new()), Arc::new(rebuilder), 4);
//!
//! service.save_config(ZiFormConfig::new(7, ["1", "2"]).with_strip_html(true)).await?;
//! service.on_submission(ZiSubmissionEvent::new(7, Some(42))).await?;
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, ZiError>`. Missing fields are skipped
//! with a warning; source and write failures abort the rebuild and leave
//! the previous export in place.

pub mod config;
pub mod errors;
pub mod export;
pub mod form;
pub mod projection;
pub mod rebuild;
pub mod record;
pub mod sanitize;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod store;

pub use config::ZiExportConfig;
pub use errors::{Result, ZiError};
pub use export::{
    ZiExportLayout, ZiExportListing, ZiFileStore, ZiLocalFileStore, ZiMemoryFileStore,
    ZiOutputFormat, ZiRebuildReport, ZiTable, ZiTableWriter,
};
pub use form::{ZiFieldId, ZiFieldMeta, ZiFormConfig, ZiFormId};
pub use projection::{resolve_columns, ZiColumn, ZiProjection};
pub use rebuild::ZiRebuilder;
pub use record::{ZiEntry, ZiEntryBatch, ZiEntryStatus};
pub use sanitize::{sanitize, strip_html_tags, ZiCellPipeline, ZiCellStage};
pub use scheduler::{ZiRebuildScheduler, ZiRebuildStatus, ZiSchedulerStats};
pub use service::{ZiExportService, ZiSubmissionEvent};
pub use source::{ZiEntryQuery, ZiEntrySource, ZiFieldCatalog, ZiMemoryForms};
pub use store::{ZiJsonSettingsStore, ZiMemorySettingsStore, ZiSettingsStore};
