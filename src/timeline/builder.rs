use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::{
    assets::cache::{AssetCache, normalize_asset_path},
    document::model::Document,
    document::segment::{RawSegment, SchemaError, SegmentSpec, resolve},
    foundation::core::{Tick, TickRange},
    foundation::diagnostic::Diagnostics,
    foundation::error::FlipreelError,
    timeline::frame_table::{FrameTable, Placement},
    timeline::index::TimelineIndex,
    timeline::progression::FrameProgression,
};

/// Asset naming options used while expanding segments.
#[derive(Clone, Debug)]
pub struct BuildOpts {
    /// Zero-padding width of the frame number in asset file names.
    pub frame_digits: usize,
    /// Asset file extension, without the dot.
    pub asset_extension: String,
}

impl Default for BuildOpts {
    fn default() -> Self {
        Self {
            frame_digits: 2,
            asset_extension: "png".to_string(),
        }
    }
}

impl BuildOpts {
    /// `<filename><frame padded>.<ext>`
    pub fn asset_file_name(&self, filename: &str, frame: i64) -> String {
        format!(
            "{filename}{frame:0width$}.{ext}",
            width = self.frame_digits,
            ext = self.asset_extension
        )
    }
}

/// The resolved animation for one document load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    /// Per-tick placements.
    pub frames: FrameTable,
    /// Segment intervals in declaration order.
    pub index: TimelineIndex,
    /// Resolved segments, parallel to `index`.
    pub segments: Vec<SegmentSpec>,
    /// Everything that went wrong, in the order it was found.
    pub diagnostics: Diagnostics,
}

impl Timeline {
    /// Resolved record for `name`.
    pub fn segment(&self, name: &str) -> Option<&SegmentSpec> {
        self.index.position(name).map(|i| &self.segments[i])
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Resolve every segment of `doc` into a fresh [`Timeline`].
///
/// Invalid segments are skipped with a diagnostic; the build itself never fails. Assets are
/// fetched through `cache` so that load failures are caught here and the placement is marked
/// broken.
#[tracing::instrument(skip_all, fields(segments = doc.framesets().len()))]
pub fn build_timeline(doc: &Document, cache: &mut AssetCache, opts: &BuildOpts) -> Timeline {
    let frame_dir = doc.frame_dir();
    let init = Fold {
        timeline: Timeline {
            frames: FrameTable::with_len(doc.length_hint()),
            ..Timeline::default()
        },
        last_resolved: None,
        broken: HashSet::new(),
    };

    let done = doc.framesets().iter().fold(init, |mut acc, record| {
        acc.add_record(record, doc.defaults(), &frame_dir, cache, opts);
        acc
    });

    let timeline = done.timeline;
    if timeline.frames.len() > doc.length_hint() {
        tracing::warn!(
            declared = doc.length_hint(),
            actual = timeline.frames.len(),
            "segments run past the declared length"
        );
    }
    tracing::info!(
        segments = timeline.segments.len(),
        ticks = timeline.frames.len(),
        diagnostics = timeline.diagnostics.len(),
        "timeline built"
    );
    timeline
}

struct Fold {
    timeline: Timeline,
    last_resolved: Option<String>,
    // Paths that failed during this build; not retried until the next one.
    broken: HashSet<PathBuf>,
}

impl Fold {
    fn add_record(
        &mut self,
        record: &serde_json::Value,
        doc_defaults: &RawSegment,
        frame_dir: &Path,
        cache: &mut AssetCache,
        opts: &BuildOpts,
    ) {
        let raw = match RawSegment::from_value(record) {
            Ok(raw) => raw,
            Err(e) => return self.reject(e.into()),
        };

        let defaults = self.defaults_for(&raw, doc_defaults);
        let spec = match resolve(&raw, &defaults) {
            Ok(spec) => spec,
            Err(e) => return self.reject(e.into()),
        };
        if self.timeline.index.contains(&spec.name) {
            return self.reject(SchemaError::duplicate(&spec.name).into());
        }

        let Some(range) = self.place_interval(&spec) else {
            return;
        };

        let progression = FrameProgression::for_segment(&spec);
        for (tick, frame) in (range.start.0..range.end.0).zip(progression) {
            let placement = self.instantiate(&spec, frame, frame_dir, cache, opts);
            self.timeline.frames.push(Tick(tick), placement);
        }

        tracing::debug!(
            segment = %spec.name,
            start = range.start.0,
            ticks = range.len_ticks(),
            "resolved segment"
        );
        self.timeline.index.insert(&spec.name, range);
        self.last_resolved = Some(spec.name.clone());
        self.timeline.segments.push(spec);
    }

    fn reject(&mut self, err: FlipreelError) {
        self.timeline.diagnostics.record(&err, None);
    }

    // Document defaults overlaid by the resolved `inherit` target, if any.
    fn defaults_for(&mut self, raw: &RawSegment, doc_defaults: &RawSegment) -> RawSegment {
        let Some(parent) = raw.inherit.as_deref().filter(|p| !p.is_empty()) else {
            return doc_defaults.clone();
        };
        match self.timeline.segment(parent) {
            Some(spec) => spec.as_defaults().overlay(doc_defaults),
            None => {
                let err = FlipreelError::reference(format!(
                    "inherits from unknown segment '{parent}'"
                ));
                self.timeline
                    .diagnostics
                    .record(&err, raw.name.as_deref());
                doc_defaults.clone()
            }
        }
    }

    // Absolute `[start, end)` for `spec`, or `None` (with a diagnostic) when it is unusable.
    fn place_interval(&mut self, spec: &SegmentSpec) -> Option<TickRange> {
        let after = spec.after.as_deref().filter(|a| !a.is_empty());
        let base = match after {
            Some(after) => match self.timeline.index.end_of(after) {
                Some(end) => end.0 as i64,
                None => {
                    let err = FlipreelError::reference(format!(
                        "'after' names unknown segment '{after}'; starting at tick 0"
                    ));
                    self.timeline.diagnostics.record(&err, Some(&spec.name));
                    0
                }
            },
            None => self
                .last_resolved
                .as_deref()
                .and_then(|last| self.timeline.index.end_of(last))
                .map_or(0, |end| end.0 as i64),
        };

        let end = spec
            .frame_count()
            .checked_mul(spec.framelen)
            .and_then(|ticks| ticks.checked_add(base))
            .and_then(|end| end.checked_add(spec.endoffset))
            .and_then(|end| end.checked_add(spec.offset));
        let start = base
            .checked_add(spec.startoffset)
            .and_then(|start| start.checked_add(spec.offset));
        let (Some(start), Some(end)) = (start, end) else {
            let field = if start.is_none() { "startoffset" } else { "len" };
            self.reject(SchemaError::invalid(&spec.name, field, "out of range").into());
            return None;
        };

        if start < 0 {
            self.reject(
                SchemaError::invalid(
                    &spec.name,
                    "startoffset",
                    format!("moves the start to negative tick {start}"),
                )
                .into(),
            );
            return None;
        }
        if end < start {
            self.reject(
                SchemaError::invalid(
                    &spec.name,
                    "endoffset",
                    format!("moves the end ({end}) before the start ({start})"),
                )
                .into(),
            );
            return None;
        }

        if end as u64 > FrameTable::MAX_LEN {
            self.reject(
                SchemaError::invalid(
                    &spec.name,
                    "len",
                    format!(
                        "ends at tick {end}, past the limit of {} ticks",
                        FrameTable::MAX_LEN
                    ),
                )
                .into(),
            );
            return None;
        }

        Some(TickRange {
            start: Tick(start as u64),
            end: Tick(end as u64),
        })
    }

    fn instantiate(
        &mut self,
        spec: &SegmentSpec,
        frame: i64,
        frame_dir: &Path,
        cache: &mut AssetCache,
        opts: &BuildOpts,
    ) -> Placement {
        let file_name = opts.asset_file_name(&spec.filename, frame);
        let asset_path = normalize_asset_path(frame_dir, &file_name);

        let broken = if self.broken.contains(&asset_path) {
            true
        } else if let Err(e) = cache.get(&asset_path, spec.invert) {
            self.timeline.diagnostics.record(&e, Some(&spec.name));
            self.broken.insert(asset_path.clone());
            true
        } else {
            false
        };

        Placement {
            segment: spec.name.clone(),
            file_name,
            asset_path,
            source_frame: frame,
            x: spec.x,
            y: spec.y,
            scale: spec.scale,
            crop: spec.crop,
            invert: spec.invert,
            broken,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
