use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::slices::SliceStore;

/// Full backup payload: every known slice as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    /// RFC-3339 timestamp of when the backup was created
    pub created_at: String,
    /// App version that produced the backup
    pub version: String,
    pub slices: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub slices_imported: usize,
    pub slices_skipped: usize,
}

impl SliceStore {
    /// Export the given slices. Slices that were never written are skipped.
    pub fn export_backup(&mut self, keys: &[&str]) -> BackupPayload {
        let slices = keys
            .iter()
            .filter_map(|key| self.raw(key).map(|value| (key.to_string(), value)))
            .collect();

        BackupPayload {
            created_at: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            slices,
        }
    }

    /// Restore slices from a payload. Only keys listed in `allowed` are
    /// written; each restored slice replaces the current one.
    pub fn import_backup(&mut self, payload: &BackupPayload, allowed: &[&str]) -> ImportStats {
        let mut stats = ImportStats::default();

        for (key, value) in &payload.slices {
            if !allowed.contains(&key.as_str()) {
                tracing::warn!(key = %key, "skipping unknown slice in backup");
                stats.slices_skipped += 1;
                continue;
            }
            self.set_raw(key, value.clone());
            stats.slices_imported += 1;
        }

        tracing::info!(
            imported = stats.slices_imported,
            skipped = stats.slices_skipped,
            "backup imported"
        );

        stats
    }
}
