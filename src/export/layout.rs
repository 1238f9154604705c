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

use serde::{Deserialize, Serialize};

use crate::export::writer::ZiOutputFormat;
use crate::form::ZiFormId;

/// Naming scheme for export objects and their public URLs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiExportLayout {
    pub export_dir: String,
    pub base_url: Option<String>,
    pub format: ZiOutputFormat,
}

impl Default for ZiExportLayout {
    fn default() -> Self {
        Self {
            export_dir: "form-data".to_string(),
            base_url: None,
            format: ZiOutputFormat::Csv,
        }
    }
}

impl ZiExportLayout {
    /// Storage key, e.g. `form-data/gf_form_7_submissions.csv`.
    pub fn key_for(&self, form_id: ZiFormId) -> String {
        let dir = self.export_dir.trim_matches('/');
        let file = format!("gf_form_{}_submissions.{}", form_id, self.format.extension());
        if dir.is_empty() {
            file
        } else {
            format!("{dir}/{file}")
        }
    }

    /// Public download URL, when a base URL is configured.
    pub fn url_for(&self, form_id: ZiFormId) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), self.key_for(form_id)))
    }
}
