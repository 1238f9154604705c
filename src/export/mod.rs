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

//! # Data Export Module
//!
//! Everything between a materialized table and the stored export object.
//!
//! ## Module Components
//!
//! - **Writer** ([writer.rs](writer/index.html)): table model and format serialization
//! - **Files** ([files.rs](files/index.html)): atomic export storage (filesystem, memory)
//! - **Layout** ([layout.rs](layout/index.html)): storage keys and download URLs
//! - **Manifest** ([manifest.rs](manifest/index.html)): rebuild reports and export listings
//!
//! ## Supported Output Formats
//!
//! - **CSV**: Comma-separated values with headers (default)
//! - **JSONL**: Header array followed by one cell array per row
//!
//! ## Usage Patterns
//!
//! ```rust
//! use zixport::export::{ZiTable, ZiTableWriter, ZiOutputFormat, ZiFileStore, ZiMemoryFileStore};
//!
//! let mut table = ZiTable::new(vec!["name".into()]);
//! table.push_row(vec!["Bob".into()]);
//! let bytes = ZiTableWriter::new(ZiOutputFormat::Csv).render(&table)?;
//!
//! let store = ZiMemoryFileStore::new();
//! store.write("form-data/gf_form_7_submissions.csv", &bytes)?;
//! ```

pub mod files;
pub mod layout;
pub mod manifest;
pub mod writer;

pub use files::{ZiFileStore, ZiLocalFileStore, ZiMemoryFileStore};
pub use layout::ZiExportLayout;
pub use manifest::{compute_content_hash, ZiExportListing, ZiRebuildReport};
pub use writer::{ZiOutputFormat, ZiTable, ZiTableWriter};
