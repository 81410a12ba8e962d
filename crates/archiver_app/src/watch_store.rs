use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use archiver_core::{WatchEntry, WatchKind, WatchList};
use archiver_engine::AtomicFileWriter;
use archiver_logging::archiver_warn;
use serde::{Deserialize, Serialize};

pub const WATCH_LIST_FILENAME: &str = "watch_list.json";

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    #[serde(rename = "type")]
    kind: String,
    url: String,
    id: String,
    name: String,
    #[serde(default)]
    last_check: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

impl StoredEntry {
    fn into_entry(self) -> Option<WatchEntry> {
        let kind = WatchKind::parse(&self.kind)?;
        Some(WatchEntry {
            kind,
            url: self.url,
            id: self.id,
            name: self.name,
            last_check: self.last_check,
            active: self.active,
        })
    }
}

impl From<&WatchEntry> for StoredEntry {
    fn from(entry: &WatchEntry) -> Self {
        Self {
            kind: entry.kind.as_str().to_string(),
            url: entry.url.clone(),
            id: entry.id.clone(),
            name: entry.name.clone(),
            last_check: entry.last_check.clone(),
            active: entry.active,
        }
    }
}

pub fn load_watch_list(path: &Path) -> WatchList {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return WatchList::new(),
        Err(err) => {
            archiver_warn!("Failed to read watch list from {:?}: {}", path, err);
            return WatchList::new();
        }
    };

    let stored: Vec<StoredEntry> = match serde_json::from_str(&content) {
        Ok(stored) => stored,
        Err(err) => {
            archiver_warn!("Failed to parse watch list from {:?}: {}", path, err);
            return WatchList::new();
        }
    };

    WatchList::from_entries(stored.into_iter().filter_map(|entry| {
        let described = format!("{} {}", entry.kind, entry.id);
        let parsed = entry.into_entry();
        if parsed.is_none() {
            archiver_warn!("Dropping watch entry of unknown kind: {}", described);
        }
        parsed
    }))
}

pub fn save_watch_list(path: &Path, list: &WatchList) -> anyhow::Result<()> {
    let stored: Vec<StoredEntry> = list.entries().iter().map(StoredEntry::from).collect();
    let content = serde_json::to_string_pretty(&stored).context("serializing watch list")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(WATCH_LIST_FILENAME);
    AtomicFileWriter::new(dir)
        .write(filename, &content)
        .with_context(|| format!("writing watch list to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_entries_and_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(WATCH_LIST_FILENAME);

        let mut list = WatchList::new();
        list.add(WatchEntry::new(
            WatchKind::Thread,
            "https://arhivach.vc/thread/5/",
            "5",
            "five",
        ))
        .unwrap();
        list.add(WatchEntry::new(WatchKind::Tag, "https://arhivach.vc/?tags=9", "9", ""))
            .unwrap();
        list.toggle(2).unwrap();
        list.mark_checked(1, "2025-01-20 10:00:00").unwrap();

        save_watch_list(&path, &list).unwrap();
        assert_eq!(load_watch_list(&path), list);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"type\": \"tag\""));
    }

    #[test]
    fn unknown_kinds_and_bad_json_are_tolerated() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(WATCH_LIST_FILENAME);

        fs::write(
            &path,
            r#"[{"type":"board","url":"x","id":"1","name":"b"},
                {"type":"thread","url":"https://arhivach.vc/thread/2/","id":"2","name":"t"}]"#,
        )
        .unwrap();
        let list = load_watch_list(&path);
        assert_eq!(list.len(), 1);
        assert!(list.get(1).unwrap().active);

        fs::write(&path, "{not json").unwrap();
        assert!(load_watch_list(&path).is_empty());
    }
}
