//! Filesystem change notifications through `notify`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::assets::cache::normalize_path;
use crate::foundation::error::{FlipreelError, FlipreelResult};
use crate::watch::PathWatcher;

type Registered = Arc<Mutex<HashSet<PathBuf>>>;

/// [`PathWatcher`] backed by the platform's native notification API.
///
/// Each registered file's parent directory is watched non-recursively, so a path can be
/// registered before the file exists and its creation is reported like any other change.
pub struct FsWatcher {
    inner: RecommendedWatcher,
    watched_dirs: HashSet<PathBuf>,
    registered: Registered,
}

/// Receiving half of an [`FsWatcher`]: batches of changed, registered paths.
pub struct ChangeFeed {
    rx: Receiver<Event>,
    registered: Registered,
}

impl FsWatcher {
    pub fn new() -> FlipreelResult<(Self, ChangeFeed)> {
        let (tx, rx) = channel();
        let inner = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })
        .context("create filesystem watcher")?;
        let registered = Registered::default();
        Ok((
            Self {
                inner,
                watched_dirs: HashSet::new(),
                registered: registered.clone(),
            },
            ChangeFeed { rx, registered },
        ))
    }
}

impl PathWatcher for FsWatcher {
    fn watch(&mut self, path: &Path) -> FlipreelResult<()> {
        let path = normalize_path(path);
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !self.watched_dirs.contains(&dir) {
            self.inner
                .watch(&dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watch directory '{}'", dir.display()))?;
            self.watched_dirs.insert(dir);
        }
        tracing::debug!(path = %path.display(), "watching");
        lock(&self.registered).insert(path);
        Ok(())
    }
}

impl ChangeFeed {
    /// Wait up to `wait` for a change, then keep collecting until `settle` passes with no new
    /// events. Returns the registered paths that changed, deduplicated, in first-seen order.
    ///
    /// An empty batch means nothing happened within `wait`.
    pub fn next_batch(&self, wait: Duration, settle: Duration) -> FlipreelResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        let first = match self.rx.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => return Ok(out),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FlipreelError::validation("filesystem watcher disconnected"));
            }
        };
        self.collect(first, &mut out);

        let mut last = Instant::now();
        while last.elapsed() < settle {
            match self.rx.recv_timeout(settle) {
                Ok(ev) => {
                    self.collect(ev, &mut out);
                    last = Instant::now();
                }
                Err(_) => break,
            }
        }
        Ok(out)
    }

    fn collect(&self, event: Event, out: &mut Vec<PathBuf>) {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        let registered = lock(&self.registered);
        for path in event.paths {
            let path = normalize_path(&path);
            if registered.contains(&path) && !out.contains(&path) {
                out.push(path);
            }
        }
    }
}

fn lock(set: &Registered) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
