// SPDX-License-Identifier: MIT

//! File-backed settings store.
//!
//! Credentials are serialized as one JSON document and replaced via
//! write-then-rename, so a crash mid-write leaves either the old triple or
//! the new one, never a mix.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::Credentials;

use super::SettingsStore;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes writers within this process; cross-process safety comes
    // from the rename.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.clone();
        p.set_extension("json.tmp");
        p
    }
}

impl SettingsStore for JsonFileStore {
    fn credentials(&self) -> Result<Option<Credentials>> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Store(format!("read failed: {}", e))),
        };

        let credentials: Credentials = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Store(format!("corrupt credentials file: {}", e)))?;
        Ok(Some(credentials))
    }

    fn set_credentials(&self, credentials: &Credentials) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AppError::Store(format!("lock poisoned: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("create dir failed: {}", e)))?;
        }

        let json = serde_json::to_vec_pretty(credentials)
            .map_err(|e| AppError::Store(format!("serialize failed: {}", e)))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| AppError::Store(format!("write failed: {}", e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::Store(format!("rename failed: {}", e)))?;
        Ok(())
    }

    fn clear_credentials(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AppError::Store(format!("lock poisoned: {}", e)))?;

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Store(format!("remove failed: {}", e))),
        }
    }
}
