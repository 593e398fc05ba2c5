//! Single-slot local cache of the most recent scan session
//!
//! Holds the session submitted for verification so a later counterfeit report
//! can be rebuilt after the in-memory session is gone. Only one reportable
//! session exists at a time: each verification attempt overwrites the slot.

use crate::error::{Error, Result};
use crate::models::ScanSession;
use checkmed_common::config::Settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Slot contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    pub session: ScanSession,
    pub cached_at: DateTime<Utc>,
    /// Detail text of the verdict this session produced, once known
    #[serde(default)]
    pub last_detail: Option<String>,
}

/// File-backed cache slot (`last_scan.json`)
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
    ttl: Duration,
}

impl SessionCache {
    pub const FILE_NAME: &'static str = "last_scan.json";

    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
            ttl,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.cache_dir, settings.cache_ttl)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the slot with `session`
    pub fn store(&self, session: &ScanSession) -> Result<()> {
        let entry = CachedSession {
            session: session.clone(),
            cached_at: checkmed_common::time::now(),
            last_detail: None,
        };
        self.write_atomic(&entry)?;
        debug!(
            session_id = %session.session_id,
            path = %self.path.display(),
            "Scan session cached"
        );
        Ok(())
    }

    /// Current slot contents.
    ///
    /// Missing, expired (removed on sight) and unreadable slots all read as `None`.
    pub fn load(&self) -> Result<Option<CachedSession>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CachedSession = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring unreadable session cache: {}", e);
                return Ok(None);
            }
        };

        if checkmed_common::time::is_older_than(entry.cached_at, self.ttl, checkmed_common::time::now()) {
            debug!(session_id = %entry.session.session_id, "Cached session expired");
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Attach the verdict detail to the cached session, if it is still `session_id`
    pub fn record_detail(&self, session_id: Uuid, detail: &str) -> Result<()> {
        let Some(mut entry) = self.load()? else {
            return Ok(());
        };
        if entry.session.session_id != session_id {
            return Ok(());
        }
        entry.last_detail = Some(detail.to_string());
        self.write_atomic(&entry)
    }

    /// Delete the slot. Clearing an empty slot is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via temp file + rename so readers never see a partial slot
    fn write_atomic(&self, entry: &CachedSession) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Cache(format!("no parent directory for {}", self.path.display())))?;
        std::fs::create_dir_all(dir)?;

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec(entry)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
