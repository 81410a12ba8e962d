use std::fmt;

use thiserror::Error;

/// Upper bound on watched threads and tags together.
pub const MAX_WATCH_ENTRIES: usize = 20;
/// Display names are cut to this many characters.
pub const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Thread,
    Tag,
}

impl WatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchKind::Thread => "thread",
            WatchKind::Tag => "tag",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "thread" => Some(WatchKind::Thread),
            "tag" => Some(WatchKind::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for WatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub kind: WatchKind,
    pub url: String,
    pub id: String,
    pub name: String,
    /// Local time of the last successful check, `YYYY-MM-DD HH:MM:SS`.
    pub last_check: Option<String>,
    pub active: bool,
}

impl WatchEntry {
    /// A new, active, never checked entry. An empty `name` falls back to
    /// `"<kind> <id>"`.
    pub fn new(kind: WatchKind, url: impl Into<String>, id: impl Into<String>, name: &str) -> Self {
        let id = id.into();
        let name = match name.trim() {
            "" => format!("{kind} {id}"),
            trimmed => trimmed.chars().take(MAX_NAME_CHARS).collect(),
        };
        Self {
            kind,
            url: url.into(),
            id,
            name,
            last_check: None,
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("watch list is full ({MAX_WATCH_ENTRIES} entries)")]
    Full,
    #[error("{kind} {id} is already watched")]
    Duplicate { kind: WatchKind, id: String },
    #[error("no entry number {0}")]
    NoSuchEntry(usize),
}

/// Bounded list of watched threads and tags; `(kind, id)` is unique.
///
/// Positions exposed to callers are 1-based, matching what users see in
/// listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    entries: Vec<WatchEntry>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored entries. Duplicates and anything past the limit
    /// are dropped; the first occurrence wins.
    pub fn from_entries(entries: impl IntoIterator<Item = WatchEntry>) -> Self {
        let mut list = Self::new();
        for entry in entries {
            let _ = list.add(entry);
        }
        list
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_WATCH_ENTRIES
    }

    pub fn contains(&self, kind: WatchKind, id: &str) -> bool {
        self.entries.iter().any(|e| e.kind == kind && e.id == id)
    }

    pub fn get(&self, position: usize) -> Option<&WatchEntry> {
        position.checked_sub(1).and_then(|idx| self.entries.get(idx))
    }

    pub fn add(&mut self, entry: WatchEntry) -> Result<(), WatchError> {
        if self.contains(entry.kind, &entry.id) {
            return Err(WatchError::Duplicate {
                kind: entry.kind,
                id: entry.id,
            });
        }
        if self.is_full() {
            return Err(WatchError::Full);
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, position: usize) -> Result<WatchEntry, WatchError> {
        let idx = self.index_of(position)?;
        Ok(self.entries.remove(idx))
    }

    /// Flip an entry between active and paused; returns the new state.
    pub fn toggle(&mut self, position: usize) -> Result<bool, WatchError> {
        let idx = self.index_of(position)?;
        let entry = &mut self.entries[idx];
        entry.active = !entry.active;
        Ok(entry.active)
    }

    pub fn mark_checked(&mut self, position: usize, stamp: impl Into<String>) -> Result<(), WatchError> {
        let idx = self.index_of(position)?;
        self.entries[idx].last_check = Some(stamp.into());
        Ok(())
    }

    /// Active entries with their 1-based positions.
    pub fn active(&self) -> impl Iterator<Item = (usize, &WatchEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.active)
            .map(|(idx, entry)| (idx + 1, entry))
    }

    fn index_of(&self, position: usize) -> Result<usize, WatchError> {
        match position.checked_sub(1) {
            Some(idx) if idx < self.entries.len() => Ok(idx),
            _ => Err(WatchError::NoSuchEntry(position)),
        }
    }
}
