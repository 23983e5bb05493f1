//! Persisted session snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::Result;
use crate::kernel::audit::CycleRecord;
use crate::kernel::state::InformationState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub state: InformationState,
    /// Audit record of every cycle so far, so a resumed session still knows
    /// which rules fired before it was saved.
    #[serde(default)]
    pub trail: Vec<CycleRecord>,
}

impl SessionRecord {
    pub fn new(id: Uuid, state: InformationState) -> Self {
        Self { id, state, trail: Vec::new() }
    }
}

pub trait SessionStore {
    fn save(&mut self, record: &SessionRecord) -> Result<()>;
    /// `Ok(None)` when nothing was saved under `id`.
    fn load(&self, id: Uuid) -> Result<Option<SessionRecord>>;
    fn list(&self) -> Result<Vec<Uuid>>;
}

/// Keeps the serialised form, so a load goes through the same path as a file.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: BTreeMap<Uuid, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn save(&mut self, record: &SessionRecord) -> Result<()> {
        self.records.insert(record.id, serde_json::to_string(record)?);
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        match self.records.get(&id) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Uuid>> {
        Ok(self.records.keys().copied().collect())
    }
}

/// One pretty-printed JSON file per session: `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&mut self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.path_for(record.id), json)?;
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn list(&self) -> Result<Vec<Uuid>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
