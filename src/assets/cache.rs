use std::{
    collections::{HashMap, HashSet},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use image::RgbaImage;

use crate::{
    assets::decode,
    foundation::error::{FlipreelError, FlipreelResult},
};

/// Shared handle to a decoded frame image.
pub type ImageHandle = Arc<RgbaImage>;

/// Source of decoded images, keyed by normalized path.
pub trait ImageLoader {
    /// Read and decode the image at `path`.
    fn load(&self, path: &Path) -> FlipreelResult<RgbaImage>;
}

/// Loads images from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load(&self, path: &Path) -> FlipreelResult<RgbaImage> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))?;
        decode::decode_image(&bytes)
    }
}

/// A path the cache tried to load for the first time, pending watch registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchRequest {
    pub path: PathBuf,
    /// Whether the first attempt produced an image.
    pub loaded: bool,
}

struct CacheEntry {
    plain: ImageHandle,
    inverted: Option<ImageHandle>,
}

/// Decoded images keyed by normalized path, loaded at most once per invalidation.
///
/// Entries are never evicted by pressure; only [`AssetCache::invalidate`] removes one. The
/// inverted variant of an image is derived from the same decode and lives in the same entry.
pub struct AssetCache {
    loader: Box<dyn ImageLoader>,
    entries: HashMap<PathBuf, CacheEntry>,
    load_counts: HashMap<PathBuf, u64>,
    attempted: HashSet<PathBuf>,
    pending_watch: Vec<WatchRequest>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.entries.len())
            .field("attempted", &self.attempted.len())
            .finish()
    }
}

impl AssetCache {
    /// Cache backed by [`FsImageLoader`].
    pub fn new() -> Self {
        Self::with_loader(FsImageLoader)
    }

    pub fn with_loader(loader: impl ImageLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: HashMap::new(),
            load_counts: HashMap::new(),
            attempted: HashSet::new(),
            pending_watch: Vec::new(),
        }
    }

    /// Return the cached image for `path`, loading it on a miss.
    ///
    /// Failures are returned as [`FlipreelError::AssetLoad`] and nothing is stored, so the next
    /// call retries.
    pub fn get(&mut self, path: &Path, invert: bool) -> FlipreelResult<ImageHandle> {
        let key = normalize_path(path);

        if !self.entries.contains_key(&key) {
            let result = self.loader.load(&key);
            *self.load_counts.entry(key.clone()).or_insert(0) += 1;
            if self.attempted.insert(key.clone()) {
                self.pending_watch.push(WatchRequest {
                    path: key.clone(),
                    loaded: result.is_ok(),
                });
            }
            let img = result.map_err(|e| FlipreelError::asset_load(&key, e.to_string()))?;
            tracing::debug!(path = %key.display(), "loaded asset");
            self.entries.insert(
                key.clone(),
                CacheEntry {
                    plain: Arc::new(img),
                    inverted: None,
                },
            );
        }

        let Some(entry) = self.entries.get_mut(&key) else {
            return Err(FlipreelError::asset_load(&key, "cache entry vanished"));
        };
        let CacheEntry { plain, inverted } = entry;
        if !invert {
            return Ok(plain.clone());
        }
        let inverted = inverted.get_or_insert_with(|| Arc::new(decode::invert_rgb(plain.as_ref())));
        Ok(inverted.clone())
    }

    /// Cached image for `path` without loading.
    pub fn peek(&self, path: &Path, invert: bool) -> Option<ImageHandle> {
        let entry = self.entries.get(&normalize_path(path))?;
        if invert {
            entry.inverted.clone()
        } else {
            Some(entry.plain.clone())
        }
    }

    /// Drop the entry for exactly `path`. The next [`AssetCache::get`] reloads it.
    ///
    /// Returns whether an entry was present.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let key = normalize_path(path);
        let removed = self.entries.remove(&key).is_some();
        if removed {
            tracing::debug!(path = %key.display(), "invalidated asset");
        }
        removed
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    /// Number of times the loader has been called for `path`.
    pub fn load_count(&self, path: &Path) -> u64 {
        self.load_counts
            .get(&normalize_path(path))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `path` has ever been requested.
    pub fn was_requested(&self, path: &Path) -> bool {
        self.attempted.contains(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths requested for the first time since the last call, in request order.
    pub fn take_watch_requests(&mut self) -> Vec<WatchRequest> {
        std::mem::take(&mut self.pending_watch)
    }
}

/// Join `file` onto `dir` and normalize the result.
pub fn normalize_asset_path(dir: &Path, file: &str) -> PathBuf {
    normalize_path(&dir.join(file))
}

/// Lexically normalize `path`: drop `.` segments and fold `..` into the preceding segment.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
