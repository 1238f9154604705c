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

//! # Rebuild Scheduler
//!
//! Runs rebuilds off the caller's path with two guarantees:
//!
//! - **Per-form serialization**: each form has a slot guarded by an async
//!   mutex, so at most one rebuild (or removal) touches a form's export at
//!   a time. Different forms proceed in parallel, bounded by a semaphore of
//!   `workers` permits.
//! - **Coalescing**: a slot holds at most one queued rebuild. A request
//!   arriving while another is already queued (not yet started) returns
//!   [`ZiRebuildStatus::Coalesced`]; the queued run reads the settings only
//!   once it starts, so it covers the coalesced request too.
//!
//! Requests run as spawned tasks. Dropping the future returned by
//! [`ZiRebuildScheduler::request`] does not cancel a rebuild.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::errors::{Result, ZiError};
use crate::export::ZiRebuildReport;
use crate::form::ZiFormId;
use crate::rebuild::ZiRebuilder;
use crate::store::ZiSettingsStore;

/// What a rebuild request ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZiRebuildStatus {
    /// The export was regenerated.
    Rebuilt(ZiRebuildReport),
    /// No selected field resolved; the existing export was kept.
    Unchanged,
    /// The form has no active config when the run started.
    Skipped,
    /// Folded into a rebuild that was already queued for the form.
    Coalesced,
}

/// Counters since the scheduler was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiSchedulerStats {
    pub rebuilt: u64,
    pub coalesced: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct ZiFormSlot {
    gate: tokio::sync::Mutex<()>,
    queued: AtomicBool,
}

#[derive(Debug, Default)]
struct ZiCounters {
    rebuilt: AtomicU64,
    coalesced: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

struct ZiSchedulerInner {
    rebuilder: Arc<ZiRebuilder>,
    settings: Arc<dyn ZiSettingsStore>,
    slots: Mutex<HashMap<ZiFormId, Arc<ZiFormSlot>>>,
    permits: Arc<Semaphore>,
    counters: ZiCounters,
}

/// Per-form serializing, coalescing rebuild queue.
#[derive(Clone)]
pub struct ZiRebuildScheduler {
    inner: Arc<ZiSchedulerInner>,
}

impl std::fmt::Debug for ZiRebuildScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZiRebuildScheduler")
            .field("available_permits", &self.inner.permits.available_permits())
            .field("stats", &self.stats())
            .finish()
    }
}

impl ZiRebuildScheduler {
    pub fn new(
        rebuilder: Arc<ZiRebuilder>,
        settings: Arc<dyn ZiSettingsStore>,
        workers: usize,
    ) -> Self {
        Self {
            inner: Arc::new(ZiSchedulerInner {
                rebuilder,
                settings,
                slots: Mutex::new(HashMap::new()),
                permits: Arc::new(Semaphore::new(workers.max(1))),
                counters: ZiCounters::default(),
            }),
        }
    }

    pub fn rebuilder(&self) -> &Arc<ZiRebuilder> {
        &self.inner.rebuilder
    }

    /// Rebuilds `form_id` from its current settings.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn request(&self, form_id: ZiFormId) -> Result<ZiRebuildStatus> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_request(form_id).await })
            .await
            .map_err(|err| ZiError::internal(format!("rebuild task for form {form_id} failed: {err}")))?
    }

    /// Deletes the export for `form_id` once no rebuild is running for it.
    pub async fn remove(&self, form_id: ZiFormId) -> Result<bool> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_remove(form_id).await })
            .await
            .map_err(|err| ZiError::internal(format!("remove task for form {form_id} failed: {err}")))?
    }

    pub fn stats(&self) -> ZiSchedulerStats {
        let c = &self.inner.counters;
        ZiSchedulerStats {
            rebuilt: c.rebuilt.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }
}

impl ZiSchedulerInner {
    fn slot(&self, form_id: ZiFormId) -> Result<Arc<ZiFormSlot>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| ZiError::internal("scheduler slot map poisoned"))?;
        // Slots are never removed: a second slot for the same form would
        // allow two concurrent writers.
        Ok(Arc::clone(slots.entry(form_id).or_default()))
    }

    async fn run_request(&self, form_id: ZiFormId) -> Result<ZiRebuildStatus> {
        let slot = self.slot(form_id)?;
        if slot.queued.swap(true, Ordering::SeqCst) {
            log::debug!("form {form_id}: rebuild already queued, coalescing");
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            return Ok(ZiRebuildStatus::Coalesced);
        }

        let _gate = slot.gate.lock().await;
        // From here on, new requests queue behind this run; settings read
        // below include every change made before this point.
        slot.queued.store(false, Ordering::SeqCst);

        let outcome = self.rebuild_current(form_id).await;
        let counter = match &outcome {
            Ok(ZiRebuildStatus::Rebuilt(_)) => &self.counters.rebuilt,
            Ok(_) => &self.counters.skipped,
            Err(_) => &self.counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    async fn rebuild_current(&self, form_id: ZiFormId) -> Result<ZiRebuildStatus> {
        let config = match self.settings.get(form_id)? {
            Some(config) if config.is_active() => config,
            _ => {
                log::debug!("form {form_id}: no active export config, skipping rebuild");
                return Ok(ZiRebuildStatus::Skipped);
            }
        };

        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ZiError::internal("rebuild worker pool closed"))?;
        let rebuilder = Arc::clone(&self.rebuilder);
        let report = tokio::task::spawn_blocking(move || rebuilder.rebuild(&config))
            .await
            .map_err(|err| ZiError::internal(format!("rebuild worker for form {form_id} failed: {err}")))??;

        Ok(match report {
            Some(report) => ZiRebuildStatus::Rebuilt(report),
            None => ZiRebuildStatus::Unchanged,
        })
    }

    async fn run_remove(&self, form_id: ZiFormId) -> Result<bool> {
        let slot = self.slot(form_id)?;
        let _gate = slot.gate.lock().await;
        let rebuilder = Arc::clone(&self.rebuilder);
        tokio::task::spawn_blocking(move || rebuilder.remove(form_id))
            .await
            .map_err(|err| ZiError::internal(format!("remove worker for form {form_id} failed: {err}")))?
    }
}
