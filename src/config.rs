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

//! # Service Configuration
//!
//! Deployment-level settings of the export service, as opposed to the
//! per-form policies held by the settings store. Loadable from YAML or
//! JSON; every field has a default.
//!
//! ```yaml
//! root_dir: /var/www/uploads
//! export_dir: form-data
//! base_url: https://example.org/uploads
//! format: csv
//! workers: 4
//! settings_path: /var/lib/zixport/settings.json
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ZiError};
use crate::export::{ZiExportLayout, ZiLocalFileStore, ZiOutputFormat};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZiExportConfig {
    /// Storage root for the local file store.
    pub root_dir: PathBuf,
    /// Directory under the root that holds the exports.
    pub export_dir: String,
    /// Public URL prefix of `root_dir`, if exports are served.
    pub base_url: Option<String>,
    pub format: ZiOutputFormat,
    /// Maximum rebuilds in flight across all forms.
    pub workers: usize,
    /// JSON settings document; settings are kept in memory when unset.
    pub settings_path: Option<PathBuf>,
}

impl Default for ZiExportConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            export_dir: "form-data".to_string(),
            base_url: None,
            format: ZiOutputFormat::Csv,
            workers: num_cpus::get().max(1),
            settings_path: None,
        }
    }
}

impl ZiExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = root.into();
        self
    }

    pub fn export_dir(mut self, dir: &str) -> Self {
        self.export_dir = dir.to_string();
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn format(mut self, format: ZiOutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.yaml`/`.yml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "json" => Self::from_json_str(&text),
            _ => Err(ZiError::invalid_config(format!(
                "unsupported config extension for {}",
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ZiError::invalid_config("workers must be at least 1"));
        }
        if self.export_dir.trim_matches('/').is_empty() {
            return Err(ZiError::invalid_config("export_dir must not be empty"));
        }
        Ok(())
    }

    pub fn layout(&self) -> ZiExportLayout {
        ZiExportLayout {
            export_dir: self.export_dir.clone(),
            base_url: self.base_url.clone(),
            format: self.format,
        }
    }

    pub fn file_store(&self) -> ZiLocalFileStore {
        ZiLocalFileStore::new(&self.root_dir)
    }
}
