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

//! # Export File Stores
//!
//! Storage for materialized exports, addressed by relative keys such as
//! `form-data/gf_form_7_submissions.csv`.
//!
//! Writes replace the whole object atomically: readers observe either the
//! previous content or the new content, never a partial file. A failed
//! write leaves the previous content in place.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tempfile::NamedTempFile;

use crate::errors::{Result, ZiError};

/// Destination for export files.
pub trait ZiFileStore: Send + Sync {
    /// Atomically replaces the object at `key` with `bytes`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Removes `key`. Returns `Ok(false)` when nothing was there.
    fn delete(&self, key: &str) -> Result<bool>;

    fn exists(&self, key: &str) -> bool;

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Filesystem-backed store rooted at a directory.
#[derive(Clone, Debug)]
pub struct ZiLocalFileStore {
    root: PathBuf,
}

impl ZiLocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for `key`. Keys must be relative and may not climb out
    /// of the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(ZiError::write_failed(key, "key must be a relative path inside the store"));
        }
        Ok(self.root.join(relative))
    }
}

impl ZiFileStore for ZiLocalFileStore {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        let fail = |err: std::io::Error| ZiError::write_failed(key, err.to_string());

        std::fs::create_dir_all(parent).map_err(fail)?;

        // Same directory as the target so the final rename cannot cross filesystems.
        let mut temp = NamedTempFile::new_in(parent).map_err(fail)?;
        temp.write_all(bytes).map_err(fail)?;
        temp.flush().map_err(fail)?;
        temp.as_file().sync_all().map_err(fail)?;
        temp.persist(&path).map_err(|err| fail(err.error))?;

        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(ZiError::write_failed(key, err.to_string())),
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store; writes can be made to fail for exercising error paths.
#[derive(Debug, Default)]
pub struct ZiMemoryFileStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl ZiMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every subsequent `write` fails with [`ZiError::WriteFailed`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ZiFileStore for ZiMemoryFileStore {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ZiError::write_failed(key, "writes disabled"));
        }
        let mut files = self
            .files
            .write()
            .map_err(|_| ZiError::write_failed(key, "file map lock poisoned"))?;
        files.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut files = self
            .files
            .write()
            .map_err(|_| ZiError::write_failed(key, "file map lock poisoned"))?;
        Ok(files.remove(key).is_some())
    }

    fn exists(&self, key: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(key))
            .unwrap_or(false)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let files = self
            .files
            .read()
            .map_err(|_| ZiError::internal("file map lock poisoned"))?;
        Ok(files.get(key).cloned())
    }
}
