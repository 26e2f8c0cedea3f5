//! flipreel resolves declarative animation segment documents into a per-tick frame table and
//! serves the frame images through a path-keyed, invalidation-aware cache.
//!
//! # Pipeline overview
//!
//! 1. **Parse**: document JSON -> [`Document`] (canvas, fps, frame directory, raw segment records)
//! 2. **Resolve**: each raw record -> [`SegmentSpec`] via [`resolve`] (defaults, inheritance, validation)
//! 3. **Build**: resolved segments -> [`Timeline`] = [`FrameTable`] + [`TimelineIndex`] + [`Diagnostics`]
//! 4. **Map**: playback milliseconds -> [`Tick`] -> placements and active segments ([`PositionMapper`])
//!
//! [`Engine`] ties these together behind explicit change messages and keeps the [`AssetCache`]
//! alive across document reloads.
//!
//! Building never fails as a whole: bad segments are skipped, unknown references fall back to
//! defaults, and missing images yield placements flagged `broken`, each with a [`Diagnostic`].
#![forbid(unsafe_code)]

mod assets;
mod document;
mod engine;
mod foundation;
mod render;
mod timeline;
mod watch;

pub use assets::cache::{
    AssetCache, FsImageLoader, ImageHandle, ImageLoader, WatchRequest, normalize_asset_path,
    normalize_path,
};
pub use assets::decode::{decode_image, invert_rgb};
pub use document::model::{Document, DocumentDef};
pub use document::segment::{CropRect, RawSegment, SchemaError, SchemaProblem, SegmentSpec, resolve};
pub use engine::{Engine, EngineOpts, LoadedDocument, TickView};
pub use foundation::core::{Canvas, Fps, Tick, TickRange};
pub use foundation::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use foundation::error::{FlipreelError, FlipreelResult};
pub use render::cpu::render_tick;
pub use timeline::builder::{BuildOpts, Timeline, build_timeline};
pub use timeline::frame_table::{FrameTable, Placement};
pub use timeline::index::{SegmentInterval, TimelineIndex};
pub use timeline::position::PositionMapper;
pub use timeline::progression::FrameProgression;
pub use watch::fs::{ChangeFeed, FsWatcher};
pub use watch::{NullWatcher, PathWatcher};
