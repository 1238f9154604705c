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

//! # Column Projection
//!
//! Turns a form's selected field ids into the ordered columns of an export.
//! Selection order is column order. Fields deleted from the form since the
//! settings were saved are skipped with a warning rather than failing the
//! whole export.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::form::{ZiFieldId, ZiFormId};
use crate::record::ZiEntry;
use crate::source::ZiFieldCatalog;

/// One export column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiColumn {
    pub field_id: ZiFieldId,
    pub header: String,
}

/// Ordered column list. Headers may repeat; columns never merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiProjection {
    pub columns: Vec<ZiColumn>,
}

impl ZiProjection {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.clone()).collect()
    }

    /// Raw cell text for each column of `entry`, in column order.
    pub fn project(&self, entry: &ZiEntry) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| entry.value_text(&c.field_id))
            .collect()
    }
}

/// Resolves `selected` against the form's field catalog.
///
/// Missing fields are logged and skipped. Any other catalog error aborts
/// resolution.
pub fn resolve_columns(
    catalog: &dyn ZiFieldCatalog,
    form_id: ZiFormId,
    selected: &[ZiFieldId],
) -> Result<ZiProjection> {
    let mut columns = Vec::with_capacity(selected.len());
    for field_id in selected {
        match catalog.field(form_id, field_id) {
            Ok(meta) => columns.push(ZiColumn {
                field_id: field_id.clone(),
                header: meta.header_label(),
            }),
            Err(err) if err.is_field_not_found() => {
                log::warn!("form {form_id}: skipping column for field '{field_id}': {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(ZiProjection { columns })
}
