//! Filesystem notification source backed by `notify`.
//!
//! The watcher delivers events on its own thread. Each notification is
//! converted into [`RawFsEvent`]s and pushed onto an unbounded channel, so
//! the delivery thread never waits on submission work.

use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::debounce::{FsEventKind, RawFsEvent};

/// Errors raised while setting up a filesystem watch.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watch root does not exist or is not a directory.
    #[error("watch root {0} is not a directory")]
    NotADirectory(Utf8PathBuf),
    /// The platform watcher could not be created or attached.
    #[error("failed to watch {root}: {message}")]
    Notify {
        /// Directory being watched.
        root: Utf8PathBuf,
        /// Error reported by the watcher backend.
        message: String,
    },
}

/// Recursive watch on a directory tree. Dropping it stops the watch.
#[derive(Debug)]
pub struct FsEventSource {
    root: Utf8PathBuf,
    _watcher: RecommendedWatcher,
}

impl FsEventSource {
    /// Starts watching `root` recursively, forwarding events to `sender`.
    ///
    /// A relative `root` is resolved against the working directory first, so
    /// reported paths are always absolute and can be translated to
    /// collection paths.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] when `root` is not a directory or the watcher
    /// cannot be attached.
    pub fn spawn(root: &Utf8Path, sender: UnboundedSender<RawFsEvent>) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.to_path_buf()));
        }
        let absolute = root
            .canonicalize_utf8()
            .map_err(|_| WatchError::NotADirectory(root.to_path_buf()))?;

        let notify_error = |err: notify::Error| WatchError::Notify {
            root: absolute.clone(),
            message: err.to_string(),
        };

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    for raw in convert_event(&event) {
                        if sender.send(raw).is_err() {
                            debug!("event receiver closed; dropping filesystem event");
                        }
                    }
                }
                Err(err) => warn!(error = %err, "filesystem watch error"),
            })
            .map_err(notify_error)?;

        watcher
            .watch(absolute.as_std_path(), RecursiveMode::Recursive)
            .map_err(notify_error)?;
        info!(root = %absolute, "watching for completion markers");

        Ok(Self {
            root: absolute,
            _watcher: watcher,
        })
    }

    /// Returns the absolute path of the watched directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Converts a `notify` event into raw notifications, one per path.
///
/// Paths that are not valid UTF-8 are skipped.
#[must_use]
pub fn convert_event(event: &Event) -> Vec<RawFsEvent> {
    event
        .paths
        .iter()
        .filter_map(|path| {
            let Some(utf8) = Utf8Path::from_path(path) else {
                warn!(path = %path.display(), "skipping non UTF-8 path");
                return None;
            };
            let (kind, is_directory) = classify(event.kind, path);
            Some(RawFsEvent {
                path: utf8.to_path_buf(),
                is_directory,
                kind,
            })
        })
        .collect()
}

fn classify(kind: EventKind, path: &Path) -> (FsEventKind, bool) {
    match kind {
        EventKind::Create(CreateKind::File) => (FsEventKind::Created, false),
        EventKind::Create(CreateKind::Folder) => (FsEventKind::Created, true),
        EventKind::Create(_) => (FsEventKind::Created, path.is_dir()),
        _ => (FsEventKind::Other, path.is_dir()),
    }
}
