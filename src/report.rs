use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::warn;

use crate::types::ProbeResult;

/// Durable record of probe results: one JSON array, one entry per IP.
///
/// Mutation is read-modify-write of the whole file. All writers serialize
/// through a single async mutex so concurrent job completions cannot lose
/// each other's updates; the rewrite itself goes through a temp file and an
/// atomic rename.
pub struct ReportStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current report contents. A missing or corrupt file reads as empty.
    pub async fn load(&self) -> Vec<ProbeResult> {
        let _guard = self.lock.lock().await;
        self.read_entries()
    }

    /// Insert `result`, replacing any existing entry for the same IP.
    /// Entries for other IPs keep their run order.
    pub async fn merge(&self, result: &ProbeResult) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries();
        entries.retain(|r| r.ip != result.ip);
        entries.push(result.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create report dir {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(&entries).context("failed to encode report")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write report to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace report {}", self.path.display()))?;
        Ok(())
    }

    fn read_entries(&self) -> Vec<ProbeResult> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "report unreadable, starting fresh");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }
}
