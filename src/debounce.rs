//! Completion marker filtering and per-directory deduplication.
//!
//! The DAQ signals that a scan directory is complete by dropping one or more
//! marker files into it. Every marker creation arrives as a raw filesystem
//! event; the debouncer turns those into at most one [`CompletionEvent`] per
//! scan directory for the lifetime of the process.
//!
//! The set of emitted directories lives in memory only. After a restart a
//! marker that is created again triggers its directory again.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

/// Marker suffixes recognised when none are configured.
pub const DEFAULT_MARKER_SUFFIXES: [&str; 2] = [".done", ".complete"];

/// Kind of a raw filesystem notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FsEventKind {
    /// An entry was created.
    Created,
    /// Any other change (modification, removal, rename, access).
    Other,
}

/// Raw notification delivered by the filesystem event source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawFsEvent {
    /// Path of the affected entry.
    pub path: Utf8PathBuf,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Notification kind.
    pub kind: FsEventKind,
}

impl RawFsEvent {
    /// Creates a file creation notification.
    #[must_use]
    pub fn file_created(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            kind: FsEventKind::Created,
        }
    }

    /// Creates a directory creation notification.
    #[must_use]
    pub fn directory_created(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            kind: FsEventKind::Created,
        }
    }
}

/// Logical "scan complete" signal for one directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletionEvent {
    /// Scan directory that completed.
    pub scan_directory: Utf8PathBuf,
    /// Marker file that triggered the event.
    pub marker: Utf8PathBuf,
    /// When the first marker for this directory was observed.
    pub first_seen_at: DateTime<Utc>,
}

/// Set of file-name suffixes that mark a scan directory as complete.
///
/// An empty set treats every created file as a marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarkerPatterns {
    suffixes: Vec<String>,
}

impl MarkerPatterns {
    /// Creates a pattern set from the given suffixes, skipping blank ones.
    #[must_use]
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(Into::into)
                .filter(|suffix| !suffix.trim().is_empty())
                .collect(),
        }
    }

    /// Returns the configured suffixes.
    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Returns whether `path` names a marker file.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        self.suffixes.is_empty()
            || self
                .suffixes
                .iter()
                .any(|suffix| path.as_str().ends_with(suffix.as_str()))
    }
}

impl Default for MarkerPatterns {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_SUFFIXES)
    }
}

/// Turns raw marker notifications into one event per scan directory.
#[derive(Debug, Default)]
pub struct CompletionDebouncer {
    patterns: MarkerPatterns,
    emitted: Mutex<HashSet<Utf8PathBuf>>,
}

impl CompletionDebouncer {
    /// Creates a debouncer with an empty emitted set.
    #[must_use]
    pub fn new(patterns: MarkerPatterns) -> Self {
        Self {
            patterns,
            emitted: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the marker patterns in use.
    #[must_use]
    pub const fn patterns(&self) -> &MarkerPatterns {
        &self.patterns
    }

    /// Processes one raw notification.
    ///
    /// Returns the completion event when `event` is the first marker seen for
    /// its scan directory and `None` when it is ignored or suppressed. The
    /// emitted-set check and insertion happen under a single lock, so racing
    /// callers cannot both emit the same directory.
    pub fn observe(&self, event: &RawFsEvent) -> Option<CompletionEvent> {
        if event.kind != FsEventKind::Created || event.is_directory {
            return None;
        }
        if !self.patterns.matches(&event.path) {
            return None;
        }
        let scan_directory = event.path.parent().filter(|dir| !dir.as_str().is_empty())?;

        let newly_inserted = self
            .emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scan_directory.to_path_buf());
        if !newly_inserted {
            return None;
        }

        Some(CompletionEvent {
            scan_directory: scan_directory.to_path_buf(),
            marker: event.path.clone(),
            first_seen_at: Utc::now(),
        })
    }

    /// Returns whether `scan_directory` has already been emitted.
    #[must_use]
    pub fn has_emitted(&self, scan_directory: &Utf8Path) -> bool {
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(scan_directory)
    }

    /// Returns how many scan directories have been emitted.
    #[must_use]
    pub fn emitted_count(&self) -> usize {
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
