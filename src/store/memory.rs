// SPDX-License-Identifier: MIT

//! In-memory settings store, used by tests and ephemeral sessions.

use std::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::Credentials;

use super::SettingsStore;

#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<Option<Credentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn credentials(&self) -> Result<Option<Credentials>> {
        let guard = self
            .credentials
            .read()
            .map_err(|e| AppError::Store(format!("lock poisoned: {}", e)))?;
        Ok(guard.clone())
    }

    fn set_credentials(&self, credentials: &Credentials) -> Result<()> {
        let mut guard = self
            .credentials
            .write()
            .map_err(|e| AppError::Store(format!("lock poisoned: {}", e)))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    fn clear_credentials(&self) -> Result<()> {
        let mut guard = self
            .credentials
            .write()
            .map_err(|e| AppError::Store(format!("lock poisoned: {}", e)))?;
        *guard = None;
        Ok(())
    }
}
