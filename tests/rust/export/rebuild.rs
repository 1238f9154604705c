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

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use zixport::{
    Result, ZiEntry, ZiEntryBatch, ZiEntryQuery, ZiEntrySource, ZiEntryStatus, ZiError,
    ZiExportLayout, ZiFieldMeta, ZiFileStore, ZiFormConfig, ZiFormId, ZiLocalFileStore,
    ZiMemoryFileStore, ZiMemoryForms, ZiOutputFormat, ZiRebuilder,
};

const KEY: &str = "form-data/gf_form_7_submissions.csv";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn form_seven() -> Arc<ZiMemoryForms> {
    let forms = Arc::new(ZiMemoryForms::new());
    forms.add_field(7, ZiFieldMeta::new("1", "Label of F1")).unwrap();
    forms.add_field(7, ZiFieldMeta::new("2", "Comment")).unwrap();
    forms
        .add_entry(ZiEntry::new(1, 7, at(20)).with_value("1", "Hi, Bob!"))
        .unwrap();
    forms
        .add_entry(ZiEntry::new(2, 7, at(10)).with_value("1", "<b>Yo</b>"))
        .unwrap();
    forms
}

fn read_text(files: &dyn ZiFileStore, key: &str) -> String {
    String::from_utf8(files.read(key).unwrap().expect("export exists")).unwrap()
}

#[derive(Debug)]
struct Unavailable;

impl ZiEntrySource for Unavailable {
    fn entries(&self, form_id: ZiFormId, _query: &ZiEntryQuery) -> Result<ZiEntryBatch> {
        Err(ZiError::source_unavailable(form_id.get(), "database offline"))
    }
}

#[test]
fn scenario_strip_html_and_punctuation() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    let config = ZiFormConfig::new(7, ["1"])
        .with_strip_html(true)
        .with_strip_punctuation(true);
    let report = rebuilder.rebuild(&config).unwrap().unwrap();

    assert_eq!(report.key, KEY);
    assert_eq!(report.headers, ["label_of_f1"]);
    assert_eq!(report.rows_written, 2);
    assert_eq!(read_text(files.as_ref(), KEY), "label_of_f1\nHi Bob\nYo\n");
    assert_eq!(report.bytes_written, "label_of_f1\nHi Bob\nYo\n".len());
}

#[test]
fn without_html_stripping_markup_becomes_spaces() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    rebuilder.rebuild(&ZiFormConfig::new(7, ["1", "2"])).unwrap();
    assert_eq!(
        read_text(files.as_ref(), KEY),
        "label_of_f1,comment\n\"Hi, Bob!\",\nb Yo b,\n"
    );
}

#[test]
fn entry_limit_keeps_most_recent_entries() {
    let forms = form_seven();
    forms
        .add_entry(ZiEntry::new(3, 7, at(30)).with_value("1", "newest"))
        .unwrap();
    forms
        .add_entry(ZiEntry::new(4, 7, at(40)).with_value("1", "spam").with_status(ZiEntryStatus::Spam))
        .unwrap();
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    let report = rebuilder
        .rebuild(&ZiFormConfig::new(7, ["1"]).with_entry_limit(Some(2)))
        .unwrap()
        .unwrap();

    assert_eq!(report.rows_written, 2);
    assert_eq!(read_text(files.as_ref(), KEY), "label_of_f1\nnewest\n\"Hi, Bob!\"\n");
}

#[test]
fn no_resolvable_columns_leaves_existing_export() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    files.write(KEY, b"previous\n").unwrap();
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    let outcome = rebuilder.rebuild(&ZiFormConfig::new(7, ["42"])).unwrap();

    assert!(outcome.is_none());
    assert_eq!(read_text(files.as_ref(), KEY), "previous\n");
}

#[test]
fn no_columns_and_no_file_writes_nothing() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    assert!(rebuilder.rebuild(&ZiFormConfig::new(7, ["42"])).unwrap().is_none());
    assert!(files.keys().is_empty());
}

#[test]
fn source_failure_preserves_previous_export() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    files.write(KEY, b"previous\n").unwrap();
    let rebuilder = ZiRebuilder::new(forms, Arc::new(Unavailable), files.clone());

    let err = rebuilder.rebuild(&ZiFormConfig::new(7, ["1"])).unwrap_err();

    assert!(matches!(err, ZiError::SourceUnavailable { form_id: 7, .. }));
    assert_eq!(read_text(files.as_ref(), KEY), "previous\n");
}

#[test]
fn write_failure_preserves_previous_export() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    files.write(KEY, b"previous\n").unwrap();
    files.set_fail_writes(true);
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    let err = rebuilder.rebuild(&ZiFormConfig::new(7, ["1"])).unwrap_err();

    assert!(matches!(err, ZiError::WriteFailed { .. }));
    assert_eq!(read_text(files.as_ref(), KEY), "previous\n");
}

#[test]
fn local_store_rebuild_and_remove() {
    let tmp = tempfile::tempdir().unwrap();
    let forms = form_seven();
    let files = Arc::new(ZiLocalFileStore::new(tmp.path()));
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    rebuilder
        .rebuild(&ZiFormConfig::new(7, ["1"]).with_strip_punctuation(true))
        .unwrap();
    let path = tmp.path().join("form-data").join("gf_form_7_submissions.csv");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "label_of_f1\nHi Bob\nb Yo b\n");

    assert!(rebuilder.remove(ZiFormId(7)).unwrap());
    assert!(!path.exists());
    assert!(!rebuilder.remove(ZiFormId(7)).unwrap());
}

#[test]
fn jsonl_layout_reuses_the_same_table() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    let layout = ZiExportLayout {
        format: ZiOutputFormat::Jsonl,
        ..ZiExportLayout::default()
    };
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone()).with_layout(layout);

    let report = rebuilder
        .rebuild(&ZiFormConfig::new(7, ["1"]).with_strip_html(true))
        .unwrap()
        .unwrap();

    assert_eq!(report.key, "form-data/gf_form_7_submissions.jsonl");
    assert_eq!(
        read_text(files.as_ref(), &report.key),
        "[\"label_of_f1\"]\n[\"Hi, Bob!\"]\n[\"Yo\"]\n"
    );
}

#[test]
fn quoted_markup_does_not_leak_into_cells() {
    let forms = form_seven();
    forms
        .add_entry(ZiEntry::new(3, 7, at(30)).with_value("1", r#"<a title="1 > 0">Yo</a> there"#))
        .unwrap();
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files.clone());

    rebuilder
        .rebuild(&ZiFormConfig::new(7, ["1"]).with_strip_html(true).with_entry_limit(Some(1)))
        .unwrap();
    assert_eq!(read_text(files.as_ref(), KEY), "label_of_f1\nYo there\n");
}

#[test]
fn rebuild_is_deterministic() {
    let forms = form_seven();
    let files = Arc::new(ZiMemoryFileStore::new());
    let rebuilder = ZiRebuilder::new(forms.clone(), forms, files);
    let config = ZiFormConfig::new(7, ["2", "1"]);

    let first = rebuilder.rebuild(&config).unwrap().unwrap();
    let second = rebuilder.rebuild(&config).unwrap().unwrap();
    assert_eq!(first.content_hash, second.content_hash);
    assert_eq!(first.headers, ["comment", "label_of_f1"]);
}
