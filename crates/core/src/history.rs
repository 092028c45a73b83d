//! Line history, persisted between sessions.
//!
//! The history file holds one submitted line per row, oldest first. Only
//! the most recent [`HISTORY_LENGTH`] lines are kept. New lines are appended
//! to the file when the store is flushed, which the session does after every
//! command and once more at exit.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::config::HISTORY_LENGTH;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub line: String,
    pub sequence: u64,
}

pub trait HistoryStore {
    /// Reads persisted history; entries are returned oldest first.
    fn load(&mut self) -> Result<Vec<HistoryEntry>>;

    fn append(&mut self, line: &str) -> HistoryEntry;

    /// Persists entries appended since the last flush.
    fn flush(&mut self) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    fn entries(&self) -> &[HistoryEntry];
}

fn push_entry(entries: &mut Vec<HistoryEntry>, next_sequence: &mut u64, line: &str) -> HistoryEntry {
    let entry = HistoryEntry {
        line: line.to_string(),
        sequence: *next_sequence,
    };
    *next_sequence += 1;
    entries.push(entry.clone());
    if entries.len() > HISTORY_LENGTH {
        let excess = entries.len() - HISTORY_LENGTH;
        entries.drain(..excess);
    }
    entry
}

/// History kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    next_sequence: u64,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&mut self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.clone())
    }

    fn append(&mut self, line: &str) -> HistoryEntry {
        push_entry(&mut self.entries, &mut self.next_sequence, line)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

/// History backed by a newline-delimited file.
#[derive(Debug)]
pub struct FileHistory {
    path: String,
    entries: Vec<HistoryEntry>,
    pending: Vec<String>,
    next_sequence: u64,
}

impl FileHistory {
    pub fn new(path: String) -> Self {
        Self {
            path,
            entries: Vec::new(),
            pending: Vec::new(),
            next_sequence: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn io_error(&self, error: std::io::Error) -> Error {
        Error::io_error("history".to_string(), self.path.clone(), error)
    }

    /// Rewrites the file with only the retained entries once it grows well
    /// past the limit.
    fn compact_if_needed(&self) -> Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io_error(e)),
        };
        if contents.lines().count() <= HISTORY_LENGTH * 2 {
            return Ok(());
        }

        let mut retained = String::new();
        for entry in &self.entries {
            retained.push_str(&entry.line);
            retained.push('\n');
        }
        fs::write(&self.path, retained).map_err(|e| self.io_error(e))
    }
}

impl HistoryStore for FileHistory {
    fn load(&mut self) -> Result<Vec<HistoryEntry>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No history file at {}", self.path);
                String::new()
            }
            Err(e) => return Err(self.io_error(e)),
        };

        self.entries.clear();
        self.next_sequence = 0;
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            push_entry(&mut self.entries, &mut self.next_sequence, line);
        }
        log::debug!("Loaded {} history entries from {}", self.entries.len(), self.path);

        Ok(self.entries.clone())
    }

    fn append(&mut self, line: &str) -> HistoryEntry {
        let line = line.replace(['\n', '\r'], " ");
        self.pending.push(line.clone());
        push_entry(&mut self.entries, &mut self.next_sequence, &line)
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        if let Some(parent) = Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        for line in &self.pending {
            writeln!(file, "{line}").map_err(|e| self.io_error(e))?;
        }
        self.pending.clear();

        self.compact_if_needed()
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.pending.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}
