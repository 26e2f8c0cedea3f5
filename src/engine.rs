//! The engine: one document, its resolved timeline, and the process-wide asset cache.
//!
//! Everything enters through explicit messages: [`Engine::on_document_changed`],
//! [`Engine::on_asset_changed`], [`Engine::on_path_changed`] and [`Engine::query_tick`]. Each
//! runs to completion. A rebuild is assembled off to the side and swapped in as a single
//! `Arc`, so a reader holding a snapshot never sees a half-built table; a document that fails to
//! parse leaves the previous snapshot in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::{
    assets::cache::{AssetCache, normalize_path},
    document::model::Document,
    foundation::core::Tick,
    foundation::error::{FlipreelError, FlipreelResult},
    render::cpu::render_tick,
    timeline::builder::{BuildOpts, Timeline, build_timeline},
    timeline::frame_table::Placement,
    timeline::position::PositionMapper,
    watch::{NullWatcher, PathWatcher},
};

/// Options controlling how the engine builds and watches.
#[derive(Clone, Debug)]
pub struct EngineOpts {
    /// Asset naming used when expanding segments.
    pub build: BuildOpts,
    /// Register asset paths with the watcher even when their first load failed, so that
    /// creating the file later triggers a rebuild.
    pub watch_missing_assets: bool,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            build: BuildOpts::default(),
            watch_missing_assets: true,
        }
    }
}

/// A successfully loaded document and the timeline built from it.
#[derive(Clone, Debug)]
pub struct LoadedDocument {
    pub document: Document,
    pub timeline: Timeline,
}

impl LoadedDocument {
    pub fn mapper(&self) -> PositionMapper<'_> {
        PositionMapper::new(&self.timeline, self.document.fps())
    }
}

/// What is on screen at one playback position.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TickView {
    pub tick: Tick,
    /// Status line, see [`PositionMapper::describe`].
    pub label: String,
    /// Segments to highlight.
    pub active_segments: Vec<String>,
    /// Placements to draw, back to front.
    pub placements: Vec<Placement>,
}

/// Owns the current timeline snapshot, the asset cache and the watcher.
pub struct Engine<W: PathWatcher = NullWatcher> {
    doc_path: PathBuf,
    opts: EngineOpts,
    cache: AssetCache,
    watcher: W,
    doc_watched: bool,
    current: Option<Arc<LoadedDocument>>,
}

impl<W: PathWatcher> Engine<W> {
    /// Engine for the document at `doc_path`. Nothing is loaded until
    /// [`Engine::on_document_changed`] is called.
    pub fn new(doc_path: impl AsRef<Path>, opts: EngineOpts, watcher: W) -> Self {
        Self::with_cache(doc_path, opts, watcher, AssetCache::new())
    }

    /// Like [`Engine::new`] with a caller-provided cache, which survives every reload.
    pub fn with_cache(
        doc_path: impl AsRef<Path>,
        opts: EngineOpts,
        watcher: W,
        cache: AssetCache,
    ) -> Self {
        let doc_path = doc_path.as_ref();
        let doc_path = std::path::absolute(doc_path).unwrap_or_else(|_| doc_path.to_path_buf());
        Self {
            doc_path: normalize_path(&doc_path),
            opts,
            cache,
            watcher,
            doc_watched: false,
            current: None,
        }
    }

    /// Re-read the document and rebuild everything from it.
    ///
    /// On a parse failure the error is returned and the previous snapshot stays authoritative.
    pub fn on_document_changed(&mut self) -> FlipreelResult<Arc<LoadedDocument>> {
        tracing::info!(path = %self.doc_path.display(), "loading document");
        self.ensure_document_watched();

        let document = match Document::from_path(&self.doc_path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(kept_previous = self.current.is_some(), "{e}");
                return Err(e);
            }
        };
        Ok(self.rebuild_with(document))
    }

    /// Drop the cached image for `path` and rebuild from the current document.
    ///
    /// Placements hold asset paths by value, so the rebuild is what re-fetches the image.
    pub fn on_asset_changed(&mut self, path: &Path) -> FlipreelResult<Arc<LoadedDocument>> {
        if !self.cache.invalidate(path) {
            tracing::info!(path = %path.display(), "changed asset was not loaded");
        }
        match &self.current {
            Some(loaded) => {
                let document = loaded.document.clone();
                Ok(self.rebuild_with(document))
            }
            None => self.on_document_changed(),
        }
    }

    /// Dispatch a change notification for `path`.
    pub fn on_path_changed(&mut self, path: &Path) -> FlipreelResult<Arc<LoadedDocument>> {
        tracing::info!(path = %path.display(), "detected changed file");
        if normalize_path(path) == self.doc_path {
            self.on_document_changed()
        } else {
            self.on_asset_changed(path)
        }
    }

    /// What to show at `playback_millis`, or `None` before the first successful load.
    pub fn query_tick(&self, playback_millis: u64) -> Option<TickView> {
        let loaded = self.current.as_ref()?;
        let mapper = loaded.mapper();
        let tick = mapper.tick_for_time(playback_millis);
        Some(TickView {
            tick,
            label: mapper.describe(tick),
            active_segments: mapper
                .segments_active_at(tick)
                .into_iter()
                .map(str::to_string)
                .collect(),
            placements: mapper.placements_at(tick).to_vec(),
        })
    }

    /// Composite `tick` of the current timeline into an image of the document's canvas size.
    pub fn render_tick(&mut self, tick: Tick) -> FlipreelResult<RgbaImage> {
        let loaded = self
            .current
            .clone()
            .ok_or_else(|| FlipreelError::validation("no document loaded"))?;
        let placements = loaded.timeline.frames.at_clamped(tick);
        render_tick(loaded.document.canvas(), placements, &mut self.cache)
    }

    /// Current snapshot.
    pub fn current(&self) -> Option<Arc<LoadedDocument>> {
        self.current.clone()
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    fn rebuild_with(&mut self, document: Document) -> Arc<LoadedDocument> {
        let timeline = build_timeline(&document, &mut self.cache, &self.opts.build);
        if timeline.has_errors() {
            tracing::warn!(
                count = timeline.diagnostics.len(),
                "some files/segments could not be loaded"
            );
        }
        self.register_asset_watches();

        let loaded = Arc::new(LoadedDocument { document, timeline });
        self.current = Some(loaded.clone());
        loaded
    }

    fn ensure_document_watched(&mut self) {
        if self.doc_watched {
            return;
        }
        match self.watcher.watch(&self.doc_path) {
            Ok(()) => self.doc_watched = true,
            Err(e) => tracing::warn!(path = %self.doc_path.display(), "cannot watch document: {e}"),
        }
    }

    fn register_asset_watches(&mut self) {
        for req in self.cache.take_watch_requests() {
            if !req.loaded && !self.opts.watch_missing_assets {
                continue;
            }
            if let Err(e) = self.watcher.watch(&req.path) {
                tracing::warn!(path = %req.path.display(), "cannot watch asset: {e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod tests;
