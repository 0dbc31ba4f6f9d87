// SPDX-License-Identifier: MIT

//! Settings store: the external key-value collaborator that persists the
//! credential triple.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::Credentials;

/// Persistent storage for OAuth credentials.
///
/// The triple is read and written as a unit so a reader can never observe
/// the expiry updated without both tokens.
pub trait SettingsStore: Send + Sync {
    /// Stored credentials, or `None` if not authenticated yet.
    fn credentials(&self) -> Result<Option<Credentials>>;

    /// Atomically replace the stored credential triple.
    fn set_credentials(&self, credentials: &Credentials) -> Result<()>;

    /// Remove any stored credentials (logout).
    fn clear_credentials(&self) -> Result<()>;
}
