use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::host::SharedStore;

/// Shared text persisted as JSON lines under a data directory.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
    pub shared_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SharedEntry {
    key: String,
    text: String,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let shared_path = data_dir.join("shared.data");
        if !shared_path.exists() {
            fs::write(&shared_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            shared = %shared_path.display(),
            "opened shared store"
        );

        Ok(Self {
            data_dir,
            shared_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        load_jsonl(&self.shared_path).context("failed to load shared.data")
    }
}

impl SharedStore for FileStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load_all()?.remove(key))
    }

    #[tracing::instrument(skip(self, text))]
    fn write(&mut self, key: &str, text: &str) -> anyhow::Result<()> {
        let mut entries = self.load_all()?;
        entries.insert(key.to_string(), text.to_string());
        save_jsonl_atomic(&self.shared_path, &entries).context("failed to save shared.data")
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = BTreeMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let entry: SharedEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.insert(entry.key, entry.text);
    }

    debug!(count = out.len(), "loaded shared entries");
    Ok(out)
}

#[tracing::instrument(skip(path, entries))]
fn save_jsonl_atomic(path: &Path, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = entries.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for (key, text) in entries {
        let serialized = serde_json::to_string(&SharedEntry {
            key: key.clone(),
            text: text.clone(),
        })?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
