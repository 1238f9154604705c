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

//! # Export Service
//!
//! Entry points used by the host application:
//!
//! - [`ZiExportService::save_config`] / [`ZiExportService::delete_config`]:
//!   settings lifecycle. Saving rebuilds immediately so a policy change
//!   applies to every historical entry.
//! - [`ZiExportService::on_submission`]: the export trigger. Every
//!   submission for a configured form causes a full rebuild.
//! - [`ZiExportService::spawn_trigger`]: the same trigger fed from a
//!   channel of [`ZiSubmissionEvent`]s. Failures are logged there and never
//!   reach the submitter.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::ZiExportConfig;
use crate::errors::Result;
use crate::export::ZiExportListing;
use crate::form::{ZiFormConfig, ZiFormId};
use crate::rebuild::ZiRebuilder;
use crate::scheduler::{ZiRebuildScheduler, ZiRebuildStatus};
use crate::source::{ZiEntrySource, ZiFieldCatalog};
use crate::store::{ZiJsonSettingsStore, ZiMemorySettingsStore, ZiSettingsStore};

/// A new entry was stored for a form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiSubmissionEvent {
    pub form_id: ZiFormId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<u64>,
}

impl ZiSubmissionEvent {
    pub fn new(form_id: impl Into<ZiFormId>, entry_id: Option<u64>) -> Self {
        Self {
            form_id: form_id.into(),
            entry_id,
        }
    }
}

#[derive(Clone)]
pub struct ZiExportService {
    settings: Arc<dyn ZiSettingsStore>,
    scheduler: ZiRebuildScheduler,
}

impl std::fmt::Debug for ZiExportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZiExportService")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl ZiExportService {
    pub fn new(settings: Arc<dyn ZiSettingsStore>, rebuilder: Arc<ZiRebuilder>, workers: usize) -> Self {
        let scheduler = ZiRebuildScheduler::new(rebuilder, Arc::clone(&settings), workers);
        Self { settings, scheduler }
    }

    /// Wires a service from deployment configuration: a local file store
    /// under `root_dir` and either a JSON or an in-memory settings store.
    pub fn from_config(
        config: &ZiExportConfig,
        catalog: Arc<dyn ZiFieldCatalog>,
        entries: Arc<dyn ZiEntrySource>,
    ) -> Result<Self> {
        config.validate()?;
        let settings: Arc<dyn ZiSettingsStore> = match &config.settings_path {
            Some(path) => Arc::new(ZiJsonSettingsStore::open(path)?),
            None => Arc::new(ZiMemorySettingsStore::new()),
        };
        let rebuilder = ZiRebuilder::new(catalog, entries, Arc::new(config.file_store()))
            .with_layout(config.layout());
        Ok(Self::new(settings, Arc::new(rebuilder), config.workers))
    }

    pub fn settings(&self) -> &Arc<dyn ZiSettingsStore> {
        &self.settings
    }

    pub fn scheduler(&self) -> &ZiRebuildScheduler {
        &self.scheduler
    }

    /// Validates and stores `config`, then rebuilds the form's export.
    ///
    /// Invalid configs are rejected before anything is stored or written.
    pub async fn save_config(&self, config: ZiFormConfig) -> Result<ZiRebuildStatus> {
        let config = config.normalized()?;
        let form_id = config.form_id;
        self.settings.upsert(config)?;
        log::info!("form {form_id}: export settings saved");
        self.scheduler.request(form_id).await
    }

    /// Removes the form's settings and its export. Idempotent.
    pub async fn delete_config(&self, form_id: ZiFormId) -> Result<()> {
        let had_config = self.settings.delete(form_id)?;
        let had_file = self.scheduler.remove(form_id).await?;
        if had_config || had_file {
            log::info!("form {form_id}: export settings and data deleted");
        }
        Ok(())
    }

    /// Export trigger for one new submission.
    ///
    /// Forms without an active config are a no-op ([`ZiRebuildStatus::Skipped`]).
    pub async fn on_submission(&self, event: ZiSubmissionEvent) -> Result<ZiRebuildStatus> {
        match self.settings.get(event.form_id)? {
            Some(config) if config.is_active() => self.scheduler.request(event.form_id).await,
            _ => Ok(ZiRebuildStatus::Skipped),
        }
    }

    /// Rebuilds every configured form concurrently.
    pub async fn rebuild_all(&self) -> Result<Vec<(ZiFormId, Result<ZiRebuildStatus>)>> {
        let form_ids: Vec<ZiFormId> = self.settings.list()?.into_iter().map(|c| c.form_id).collect();
        let outcomes = join_all(form_ids.iter().map(|&id| self.scheduler.request(id))).await;
        Ok(form_ids.into_iter().zip(outcomes).collect())
    }

    /// Configured exports in ascending form id order.
    pub fn list_exports(&self) -> Result<Vec<ZiExportListing>> {
        let rebuilder = self.scheduler.rebuilder();
        let layout = rebuilder.layout();
        Ok(self
            .settings
            .list()?
            .into_iter()
            .map(|config| {
                let key = layout.key_for(config.form_id);
                ZiExportListing {
                    form_id: config.form_id,
                    exists: rebuilder.files().exists(&key),
                    url: layout.url_for(config.form_id),
                    key,
                }
            })
            .collect())
    }

    /// Subscribes the export trigger to a submission channel.
    ///
    /// Each event is handled on its own task so a slow rebuild of one form
    /// does not hold back others. The returned handle completes after every
    /// sender is dropped and all triggered rebuilds have finished.
    pub fn spawn_trigger(&self, capacity: usize) -> (mpsc::Sender<ZiSubmissionEvent>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ZiSubmissionEvent>(capacity.max(1));
        let service = self.clone();
        let handle = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            while let Some(event) = rx.recv().await {
                let service = service.clone();
                in_flight.spawn(async move {
                    let form_id = event.form_id;
                    if let Err(err) = service.on_submission(event).await {
                        log::error!("form {form_id}: export rebuild after submission failed: {err}");
                    }
                });
                // Reap finished handlers so the set does not grow unbounded.
                while in_flight.try_join_next().is_some() {}
            }
            while in_flight.join_next().await.is_some() {}
            log::debug!("submission trigger stopped");
        });
        (tx, handle)
    }
}
