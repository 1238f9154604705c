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

//! # Settings Stores
//!
//! Keyed persistence of [`ZiFormConfig`]s. Stores are injected into the
//! components that need them; there is no process-wide settings state.
//!
//! - [`ZiMemorySettingsStore`]: process-local map
//! - [`ZiJsonSettingsStore`]: one JSON document keyed by form id, replaced
//!   atomically on every change

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;

use crate::errors::{Result, ZiError};
use crate::form::{ZiFormConfig, ZiFormId};

/// Persisted export policies keyed by form.
pub trait ZiSettingsStore: Send + Sync {
    fn get(&self, form_id: ZiFormId) -> Result<Option<ZiFormConfig>>;

    /// Inserts or replaces the config for `config.form_id`.
    fn upsert(&self, config: ZiFormConfig) -> Result<()>;

    /// Removes the config. Returns `Ok(false)` when none was stored.
    fn delete(&self, form_id: ZiFormId) -> Result<bool>;

    /// All configs in ascending form id order.
    fn list(&self) -> Result<Vec<ZiFormConfig>>;
}

type ZiSettingsMap = BTreeMap<ZiFormId, ZiFormConfig>;

fn poisoned() -> ZiError {
    ZiError::internal("settings lock poisoned")
}

#[derive(Debug, Default)]
pub struct ZiMemorySettingsStore {
    configs: RwLock<ZiSettingsMap>,
}

impl ZiMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ZiSettingsStore for ZiMemorySettingsStore {
    fn get(&self, form_id: ZiFormId) -> Result<Option<ZiFormConfig>> {
        Ok(self.configs.read().map_err(|_| poisoned())?.get(&form_id).cloned())
    }

    fn upsert(&self, config: ZiFormConfig) -> Result<()> {
        self.configs
            .write()
            .map_err(|_| poisoned())?
            .insert(config.form_id, config);
        Ok(())
    }

    fn delete(&self, form_id: ZiFormId) -> Result<bool> {
        Ok(self
            .configs
            .write()
            .map_err(|_| poisoned())?
            .remove(&form_id)
            .is_some())
    }

    fn list(&self) -> Result<Vec<ZiFormConfig>> {
        Ok(self.configs.read().map_err(|_| poisoned())?.values().cloned().collect())
    }
}

/// Settings persisted as a single JSON object `{ "<form id>": { ... } }`.
#[derive(Debug)]
pub struct ZiJsonSettingsStore {
    path: PathBuf,
    configs: RwLock<ZiSettingsMap>,
}

impl ZiJsonSettingsStore {
    /// Opens the store, loading `path` when it exists.
    ///
    /// Every stored config is validated; a document holding an invalid
    /// config is rejected rather than silently repaired.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let configs = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => ZiSettingsMap::new(),
            Ok(text) => {
                let raw: ZiSettingsMap = serde_json::from_str(&text)?;
                let mut configs = ZiSettingsMap::new();
                for (form_id, config) in raw {
                    if config.form_id != form_id {
                        return Err(ZiError::invalid_config(format!(
                            "settings key {form_id} holds config for form {}",
                            config.form_id
                        )));
                    }
                    configs.insert(form_id, config.normalized()?);
                }
                configs
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ZiSettingsMap::new(),
            Err(err) => return Err(err.into()),
        };
        log::debug!("loaded {} form config(s) from {}", configs.len(), path.display());
        Ok(Self {
            path,
            configs: RwLock::new(configs),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the map, persists it, then publishes it.
    fn mutate<T>(&self, change: impl FnOnce(&mut ZiSettingsMap) -> T) -> Result<T> {
        let mut guard = self.configs.write().map_err(|_| poisoned())?;
        let mut next = guard.clone();
        let out = change(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    fn persist(&self, configs: &ZiSettingsMap) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let mut temp = NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(&mut temp, configs)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|err| ZiError::from(err.error))?;
        Ok(())
    }
}

impl ZiSettingsStore for ZiJsonSettingsStore {
    fn get(&self, form_id: ZiFormId) -> Result<Option<ZiFormConfig>> {
        Ok(self.configs.read().map_err(|_| poisoned())?.get(&form_id).cloned())
    }

    fn upsert(&self, config: ZiFormConfig) -> Result<()> {
        self.mutate(|configs| {
            configs.insert(config.form_id, config);
        })
    }

    fn delete(&self, form_id: ZiFormId) -> Result<bool> {
        // Skip the rewrite when nothing changes.
        if self.get(form_id)?.is_none() {
            return Ok(false);
        }
        self.mutate(|configs| configs.remove(&form_id).is_some())
    }

    fn list(&self) -> Result<Vec<ZiFormConfig>> {
        Ok(self.configs.read().map_err(|_| poisoned())?.values().cloned().collect())
    }
}
