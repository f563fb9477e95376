use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use concord_common::error::Result;

use super::CommitRecord;

/// On-disk form of the committed results, sorted by topic.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Snapshot {
    pub records: Vec<CommitRecord>,
}

/// Writes the snapshot as pretty JSON, replacing any previous file.
pub fn save_snapshot(path: &Path, data: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
