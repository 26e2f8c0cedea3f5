use super::*;
use crate::assets::cache::ImageLoader;
use crate::foundation::diagnostic::DiagnosticKind;
use crate::foundation::error::FlipreelResult;
use image::{Rgba, RgbaImage};
use std::io::Cursor;

// Succeeds for every path except files whose name is listed in `missing`.
struct FakeLoader {
    missing: Vec<&'static str>,
}

impl ImageLoader for FakeLoader {
    fn load(&self, path: &Path) -> FlipreelResult<RgbaImage> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if self.missing.iter().any(|m| *m == name) {
            return Err(anyhow::anyhow!("no such file").into());
        }
        Ok(RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255])))
    }
}

fn doc(framesets: serde_json::Value, length: u64) -> Document {
    let src = serde_json::json!({
        "width": 64, "height": 48, "fps": 25,
        "framedir": "frames",
        "length": length,
        "default": { "y": 9 },
        "framesets": framesets,
    });
    Document::from_reader(Cursor::new(src.to_string()), "/anim").unwrap()
}

fn build_with(doc: &Document, missing: Vec<&'static str>) -> Timeline {
    let mut cache = AssetCache::with_loader(FakeLoader { missing });
    build_timeline(doc, &mut cache, &BuildOpts::default())
}

fn build(doc: &Document) -> Timeline {
    build_with(doc, Vec::new())
}

fn files_of(t: &Timeline, segment: &str) -> Vec<String> {
    t.frames
        .iter()
        .flat_map(|(_, ps)| ps.iter())
        .filter(|p| p.segment == segment)
        .map(|p| p.file_name.clone())
        .collect()
}

fn range(t: &Timeline, name: &str) -> (u64, u64) {
    let r = t.index.get(name).unwrap();
    (r.start.0, r.end.0)
}

#[test]
fn walk_segment_expands_frame_by_frame() {
    let d = doc(
        serde_json::json!([{ "name": "walk", "from": 1, "to": 3, "framelen": 2 }]),
        6,
    );
    let t = build(&d);
    assert!(t.diagnostics.is_empty());
    assert_eq!(range(&t, "walk"), (0, 6));
    assert_eq!(
        files_of(&t, "walk"),
        [
            "walk01.png",
            "walk01.png",
            "walk02.png",
            "walk02.png",
            "walk03.png",
            "walk03.png"
        ]
    );
    let first = &t.frames.at(Tick(0)).unwrap()[0];
    assert_eq!(first.asset_path, PathBuf::from("/anim/frames/walk01.png"));
    assert_eq!(first.y, 9);
    assert!(!first.broken);
}

#[test]
fn segments_follow_the_previous_one() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 0, "to": 1 },
            { "name": "b", "from": 0, "to": 2, "filename": "blink" },
            { "name": "c", "from": 0, "len": 1, "after": "a" },
        ]),
        0,
    );
    let t = build(&d);
    assert_eq!(range(&t, "a"), (0, 2));
    assert_eq!(range(&t, "b"), (2, 5));
    assert_eq!(range(&t, "c"), (2, 3));
    assert_eq!(files_of(&t, "b")[0], "blink00.png");
    assert_eq!(t.index.labels(), ["0-1: a", "2-4: b", "2-2: c"]);
}

#[test]
fn unknown_after_starts_at_zero_and_continues() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 0, "to": 4 },
            { "name": "b", "from": 0, "to": 1, "after": "missing" },
            { "name": "c", "from": 0, "to": 0 },
        ]),
        0,
    );
    let t = build(&d);
    assert_eq!(range(&t, "b"), (0, 2));
    assert_eq!(range(&t, "c"), (2, 3));

    let refs: Vec<_> = t.diagnostics.of_kind(DiagnosticKind::Reference).collect();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].segment.as_deref(), Some("b"));
    assert!(t.has_errors());
}

#[test]
fn duplicate_name_keeps_the_first() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 0, "to": 1 },
            { "name": "a", "from": 0, "to": 9 },
            { "name": "b", "from": 0, "to": 0 },
        ]),
        0,
    );
    let t = build(&d);
    assert_eq!(t.segments.len(), 2);
    assert_eq!(range(&t, "a"), (0, 2));
    assert_eq!(range(&t, "b"), (2, 3));
    assert_eq!(t.segment("a").unwrap().to, 1);

    let schema: Vec<_> = t.diagnostics.of_kind(DiagnosticKind::Schema).collect();
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].field, Some("name"));
}

#[test]
fn invalid_records_are_skipped_with_diagnostics() {
    let d = doc(
        serde_json::json!([
            { "from": 0, "to": 1 },
            { "name": "nofrom", "to": 1 },
            { "name": "typed", "from": "zero", "to": 1 },
            { "name": "ok", "from": 0, "to": 0 },
        ]),
        0,
    );
    let t = build(&d);
    assert_eq!(t.segments.len(), 1);
    assert_eq!(range(&t, "ok"), (0, 1));
    let fields: Vec<_> = t.diagnostics.iter().map(|d| d.field).collect();
    assert_eq!(fields, [Some("name"), Some("from"), Some("record")]);
}

#[test]
fn inherit_takes_resolved_fields_and_beats_document_defaults() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 2, "to": 3, "x": 5, "y": 1, "framelen": 2 },
            { "name": "b", "inherit": "a", "x": 7 },
            { "name": "c", "inherit": "ghost", "from": 0, "to": 0 },
        ]),
        0,
    );
    let t = build(&d);
    let b = t.segment("b").unwrap();
    assert_eq!((b.from, b.to, b.framelen), (2, 3, 2));
    assert_eq!((b.x, b.y), (7, 1));
    assert_eq!(b.filename, "a");
    assert_eq!(range(&t, "b"), (4, 8));

    let c = t.segment("c").unwrap();
    assert_eq!(c.y, 9);
    assert_eq!(t.diagnostics.of_kind(DiagnosticKind::Reference).count(), 1);
}

#[test]
fn offsets_shift_the_interval() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 0, "to": 3, "startoffset": 1, "endoffset": -1 },
            { "name": "b", "from": 0, "to": 1, "offset": 2 },
            { "name": "c", "from": 2, "to": 5, "len": 0 },
        ]),
        0,
    );
    let t = build(&d);
    assert_eq!(range(&t, "a"), (1, 3));
    assert_eq!(files_of(&t, "a"), ["a00.png", "a01.png"]);
    assert_eq!(range(&t, "b"), (5, 7));
    assert_eq!(range(&t, "c"), (7, 10));
}

#[test]
fn negative_start_or_inverted_interval_is_rejected() {
    let d = doc(
        serde_json::json!([
            { "name": "early", "from": 0, "to": 1, "startoffset": -3 },
            { "name": "short", "from": 0, "to": 1, "endoffset": -5 },
            { "name": "fine", "from": 0, "to": 0 },
        ]),
        0,
    );
    let t = build(&d);
    assert!(t.index.get("early").is_none());
    assert!(t.index.get("short").is_none());
    assert_eq!(range(&t, "fine"), (0, 1));
    let fields: Vec<_> = t.diagnostics.iter().map(|d| d.field).collect();
    assert_eq!(fields, [Some("startoffset"), Some("endoffset")]);
}

#[test]
fn table_grows_past_declared_length() {
    let d = doc(serde_json::json!([{ "name": "a", "from": 0, "to": 4 }]), 2);
    let t = build(&d);
    assert_eq!(t.frames.len(), 5);

    let d = doc(serde_json::json!([{ "name": "a", "from": 0, "to": 0 }]), 10);
    let t = build(&d);
    assert_eq!(t.frames.len(), 10);
    assert!(t.frames.at(Tick(9)).unwrap().is_empty());
}

#[test]
fn missing_assets_are_marked_broken_once_per_path() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 1, "to": 2, "framelen": 3 },
            { "name": "b", "from": 1, "to": 1, "filename": "a" },
        ]),
        0,
    );
    let t = build_with(&d, vec!["a02.png"]);

    let broken: Vec<_> = t
        .frames
        .iter()
        .flat_map(|(_, ps)| ps.iter())
        .map(|p| (p.file_name.as_str(), p.broken))
        .collect();
    assert_eq!(
        broken,
        [
            ("a01.png", false),
            ("a01.png", false),
            ("a01.png", false),
            ("a02.png", true),
            ("a02.png", true),
            ("a02.png", true),
            ("a01.png", false),
        ]
    );
    let loads: Vec<_> = t.diagnostics.of_kind(DiagnosticKind::AssetLoad).collect();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].segment.as_deref(), Some("a"));
}

#[test]
fn builds_are_deterministic() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 1, "to": 3, "framelen": 2, "frameoffset": -1 },
            { "name": "b", "from": 0, "to": 2, "after": "nope" },
            { "name": "a", "from": 0, "to": 0 },
        ]),
        4,
    );
    assert_eq!(build(&d), build(&d));
}

#[test]
fn asset_file_names_are_zero_padded() {
    let opts = BuildOpts::default();
    assert_eq!(opts.asset_file_name("walk", 7), "walk07.png");
    assert_eq!(opts.asset_file_name("walk", 123), "walk123.png");
    let opts = BuildOpts {
        frame_digits: 4,
        asset_extension: "jpg".into(),
    };
    assert_eq!(opts.asset_file_name("x", 7), "x0007.jpg");
}

#[test]
fn out_of_range_numbers_skip_only_that_segment() {
    let d = doc(
        serde_json::json!([
            { "name": "huge", "from": 1, "len": 1i64 << 62, "framelen": 4 },
            { "name": "wide", "from": 0, "to": i64::MAX, "endoffset": -i64::MAX },
            { "name": "long", "from": 0, "to": 0, "len": 1i64 << 62, "framelen": 4 },
            { "name": "shifted", "from": 0, "to": 0, "offset": i64::MAX },
            { "name": "back", "from": 0, "to": 0, "startoffset": i64::MIN, "offset": -1 },
            { "name": "ok", "from": 1, "to": 2 },
        ]),
        0,
    );
    let t = build(&d);
    assert_eq!(t.segments.len(), 1);
    assert_eq!(range(&t, "ok"), (0, 2));

    let rejected: Vec<_> = t
        .diagnostics
        .iter()
        .map(|d| (d.kind, d.segment.clone().unwrap_or_default()))
        .collect();
    assert_eq!(
        rejected,
        ["huge", "wide", "long", "shifted", "back"].map(|n| (DiagnosticKind::Schema, n.to_string()))
    );
}

#[test]
fn segments_past_the_table_limit_are_rejected() {
    let limit = FrameTable::MAX_LEN as i64;
    let d = doc(
        serde_json::json!([
            { "name": "far", "from": 0, "to": 0, "offset": limit },
            { "name": "edge", "from": 0, "to": 0, "after": "missing", "offset": limit - 1 },
        ]),
        0,
    );
    let t = build(&d);
    assert!(t.index.get("far").is_none());
    assert_eq!(range(&t, "edge"), (FrameTable::MAX_LEN - 1, FrameTable::MAX_LEN));
    assert_eq!(t.frames.len(), FrameTable::MAX_LEN);

    let far = t.diagnostics.iter().next().unwrap();
    assert_eq!((far.segment.as_deref(), far.field), (Some("far"), Some("len")));
}

#[test]
fn extreme_prewind_resolves() {
    let d = doc(
        serde_json::json!([
            { "name": "a", "from": 1, "to": 3, "framelen": 2, "frameoffset": i64::MIN },
        ]),
        0,
    );
    let t = build(&d);
    assert!(t.diagnostics.is_empty());
    assert_eq!(files_of(&t, "a").len(), 6);
}
