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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use zixport::{
    Result, ZiEntry, ZiEntryBatch, ZiEntryQuery, ZiEntrySource, ZiError, ZiExportConfig,
    ZiExportLayout, ZiExportService, ZiFieldMeta, ZiFileStore, ZiFormConfig, ZiFormId,
    ZiMemoryFileStore, ZiMemoryForms, ZiMemorySettingsStore, ZiRebuildStatus, ZiRebuilder,
    ZiSettingsStore, ZiSubmissionEvent,
};

const KEY: &str = "form-data/gf_form_7_submissions.csv";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn form_seven() -> Arc<ZiMemoryForms> {
    let forms = Arc::new(ZiMemoryForms::new());
    forms.add_field(7, ZiFieldMeta::new("1", "Name")).unwrap();
    forms.add_field(7, ZiFieldMeta::new("2", "Comment")).unwrap();
    forms
        .add_entry(ZiEntry::new(1, 7, at(10)).with_value("1", "Ann").with_value("2", "first"))
        .unwrap();
    forms
        .add_entry(ZiEntry::new(2, 7, at(20)).with_value("1", "Bob").with_value("2", "second"))
        .unwrap();
    forms
}

/// Entry source that takes a while and records how many reads overlap.
#[derive(Debug)]
struct SlowSource {
    inner: Arc<ZiMemoryForms>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    runs: AtomicUsize,
}

impl SlowSource {
    fn new(inner: Arc<ZiMemoryForms>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }
}

impl ZiEntrySource for SlowSource {
    fn entries(&self, form_id: ZiFormId, query: &ZiEntryQuery) -> Result<ZiEntryBatch> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let batch = self.inner.entries(form_id, query);
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        batch
    }
}

struct Harness {
    forms: Arc<ZiMemoryForms>,
    files: Arc<ZiMemoryFileStore>,
    service: ZiExportService,
}

fn harness_with(entries: Arc<dyn ZiEntrySource>, forms: Arc<ZiMemoryForms>, layout: ZiExportLayout) -> Harness {
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), entries, files.clone()).with_layout(layout);
    let service = ZiExportService::new(Arc::new(ZiMemorySettingsStore::new()), Arc::new(rebuilder), 4);
    Harness { forms, files, service }
}

fn harness() -> Harness {
    let forms = form_seven();
    harness_with(forms.clone(), forms, ZiExportLayout::default())
}

fn read_text(files: &dyn ZiFileStore, key: &str) -> String {
    String::from_utf8(files.read(key).unwrap().expect("export exists")).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn save_config_rebuilds_immediately() {
    let h = harness();
    let status = h
        .service
        .save_config(ZiFormConfig::new(7, ["2", "1", "2"]))
        .await
        .unwrap();

    let ZiRebuildStatus::Rebuilt(report) = status else {
        panic!("expected a rebuild, got {status:?}");
    };
    assert_eq!(report.headers, ["comment", "name"]);
    assert_eq!(read_text(h.files.as_ref(), KEY), "comment,name\nsecond,Bob\nfirst,Ann\n");

    let stored = h.service.settings().get(ZiFormId(7)).unwrap().unwrap();
    assert_eq!(stored.selected_fields.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalid_config_is_rejected_before_anything_is_stored() {
    let h = harness();

    let err = h
        .service
        .save_config(ZiFormConfig::new(7, Vec::<&str>::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, ZiError::InvalidConfig { .. }));

    let err = h.service.save_config(ZiFormConfig::new(0, ["1"])).await.unwrap_err();
    assert!(matches!(err, ZiError::InvalidConfig { .. }));

    assert!(h.service.settings().list().unwrap().is_empty());
    assert!(h.files.keys().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_removes_settings_and_export() {
    let h = harness();
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();
    assert!(h.files.exists(KEY));

    h.service.delete_config(ZiFormId(7)).await.unwrap();
    assert!(!h.files.exists(KEY));
    assert!(h.service.settings().get(ZiFormId(7)).unwrap().is_none());

    // Submissions after deletion do nothing.
    let status = h.service.on_submission(ZiSubmissionEvent::new(7, Some(3))).await.unwrap();
    assert_eq!(status, ZiRebuildStatus::Skipped);
    assert!(h.files.keys().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_of_unknown_form_is_a_no_op() {
    let h = harness();
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();

    h.service.delete_config(ZiFormId(8)).await.unwrap();
    h.service.delete_config(ZiFormId(8)).await.unwrap();

    assert_eq!(h.files.keys(), [KEY]);
    assert_eq!(h.service.settings().list().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submission_for_unconfigured_form_is_skipped() {
    let h = harness();
    let status = h.service.on_submission(ZiSubmissionEvent::new(7, Some(1))).await.unwrap();
    assert_eq!(status, ZiRebuildStatus::Skipped);
    assert!(h.files.keys().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submission_rebuilds_with_new_entry() {
    let h = harness();
    h.service
        .save_config(ZiFormConfig::new(7, ["1"]).with_entry_limit(Some(2)))
        .await
        .unwrap();

    h.forms
        .add_entry(ZiEntry::new(3, 7, at(30)).with_value("1", "Cy"))
        .unwrap();
    let status = h.service.on_submission(ZiSubmissionEvent::new(7, Some(3))).await.unwrap();

    assert!(matches!(status, ZiRebuildStatus::Rebuilt(_)));
    assert_eq!(read_text(h.files.as_ref(), KEY), "name\nCy\nBob\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_rebuild_keeps_previous_export() {
    let h = harness();
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();
    let before = read_text(h.files.as_ref(), KEY);

    h.files.set_fail_writes(true);
    h.forms
        .add_entry(ZiEntry::new(3, 7, at(30)).with_value("1", "Cy"))
        .unwrap();
    let err = h
        .service
        .on_submission(ZiSubmissionEvent::new(7, Some(3)))
        .await
        .unwrap_err();

    assert!(matches!(err, ZiError::WriteFailed { .. }));
    assert_eq!(read_text(h.files.as_ref(), KEY), before);
    assert_eq!(h.service.scheduler().stats().failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_serialize_and_coalesce() {
    let forms = form_seven();
    let slow = Arc::new(SlowSource::new(forms.clone(), Duration::from_millis(50)));
    let h = harness_with(slow.clone(), forms, ZiExportLayout::default());
    h.service.save_config(ZiFormConfig::new(7, ["1", "2"])).await.unwrap();
    let runs_after_save = slow.runs.load(Ordering::SeqCst);

    let requests = 8;
    let statuses = join_all(
        (0..requests).map(|i| h.service.on_submission(ZiSubmissionEvent::new(7, Some(100 + i)))),
    )
    .await;

    let mut rebuilt = 0;
    let mut coalesced = 0;
    for status in statuses {
        match status.unwrap() {
            ZiRebuildStatus::Rebuilt(_) => rebuilt += 1,
            ZiRebuildStatus::Coalesced => coalesced += 1,
            other => panic!("unexpected status {other:?}"),
        }
    }

    assert_eq!(rebuilt + coalesced, requests);
    assert!(rebuilt >= 1);
    assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(slow.runs.load(Ordering::SeqCst) - runs_after_save, rebuilt as usize);
    assert_eq!(
        read_text(h.files.as_ref(), KEY),
        "name,comment\nBob,second\nAnn,first\n"
    );

    let stats = h.service.scheduler().stats();
    assert_eq!(stats.rebuilt, rebuilt + 1);
    assert_eq!(stats.coalesced, coalesced);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn settings_changed_during_rebuild_are_picked_up() {
    let forms = form_seven();
    let slow = Arc::new(SlowSource::new(forms.clone(), Duration::from_millis(150)));
    let h = harness_with(slow.clone(), forms, ZiExportLayout::default());
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();

    let running = {
        let service = h.service.clone();
        tokio::spawn(async move { service.on_submission(ZiSubmissionEvent::new(7, None)).await })
    };
    while slow.in_flight.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    h.service
        .settings()
        .upsert(ZiFormConfig::new(7, ["2"]))
        .unwrap();
    let follow_up = h.service.on_submission(ZiSubmissionEvent::new(7, None)).await.unwrap();

    assert!(matches!(running.await.unwrap().unwrap(), ZiRebuildStatus::Rebuilt(_)));
    assert!(matches!(follow_up, ZiRebuildStatus::Rebuilt(_)));
    assert_eq!(read_text(h.files.as_ref(), KEY), "comment\nsecond\nfirst\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_forms_rebuild_independently() {
    let h = harness();
    h.forms.add_field(9, ZiFieldMeta::new("1", "Email")).unwrap();
    h.forms
        .add_entry(ZiEntry::new(5, 9, at(5)).with_value("1", "a@example.org"))
        .unwrap();
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();
    h.service.save_config(ZiFormConfig::new(9, ["1"])).await.unwrap();

    let outcomes = h.service.rebuild_all().await.unwrap();
    let ids: Vec<u64> = outcomes.iter().map(|(id, _)| id.get()).collect();
    assert_eq!(ids, [7, 9]);
    assert!(outcomes.iter().all(|(_, status)| matches!(status, Ok(ZiRebuildStatus::Rebuilt(_)))));
    assert_eq!(
        read_text(h.files.as_ref(), "form-data/gf_form_9_submissions.csv"),
        "email\na@example.org\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn trigger_channel_drives_rebuilds() {
    let h = harness();
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();
    h.forms
        .add_entry(ZiEntry::new(3, 7, at(30)).with_value("1", "Cy"))
        .unwrap();

    let (tx, handle) = h.service.spawn_trigger(16);
    tx.send(ZiSubmissionEvent::new(7, Some(3))).await.unwrap();
    tx.send(ZiSubmissionEvent::new(42, Some(1))).await.unwrap();
    drop(tx);
    handle.await.unwrap();

    assert_eq!(read_text(h.files.as_ref(), KEY), "name\nCy\nBob\nAnn\n");
    assert_eq!(h.files.keys(), [KEY]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listing_reports_keys_urls_and_presence() {
    let forms = form_seven();
    let layout = ZiExportLayout {
        base_url: Some("https://example.org/uploads/".to_string()),
        ..ZiExportLayout::default()
    };
    let h = harness_with(forms.clone(), forms, layout);
    h.service.save_config(ZiFormConfig::new(7, ["1"])).await.unwrap();
    h.service.save_config(ZiFormConfig::new(3, ["99"])).await.unwrap();

    let listing = h.service.list_exports().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].form_id, ZiFormId(3));
    assert!(!listing[0].exists);
    assert_eq!(listing[1].key, KEY);
    assert!(listing[1].exists);
    assert_eq!(
        listing[1].url.as_deref(),
        Some("https://example.org/uploads/form-data/gf_form_7_submissions.csv")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn service_from_config_persists_settings_and_files() {
    let tmp = tempfile::tempdir().unwrap();
    let settings_path = tmp.path().join("settings").join("exports.json");
    let config = ZiExportConfig::new()
        .root_dir(tmp.path())
        .workers(2)
        .settings_path(&settings_path);
    let forms = form_seven();

    let service = ZiExportService::from_config(&config, forms.clone(), forms.clone()).unwrap();
    service
        .save_config(ZiFormConfig::new(7, ["1"]).with_strip_punctuation(true))
        .await
        .unwrap();

    let export = tmp.path().join("form-data").join("gf_form_7_submissions.csv");
    assert_eq!(std::fs::read_to_string(&export).unwrap(), "name\nBob\nAnn\n");

    let reopened = ZiExportService::from_config(&config, forms.clone(), forms).unwrap();
    let stored = reopened.settings().get(ZiFormId(7)).unwrap().unwrap();
    assert!(stored.strip_punctuation);

    reopened.delete_config(ZiFormId(7)).await.unwrap();
    assert!(!export.exists());
    assert!(reopened.settings().list().unwrap().is_empty());
}
