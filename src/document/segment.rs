use std::fmt;

use serde::{Deserialize, Deserializer};

/// Pixel rectangle cut out of a source frame before scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One segment record as written in the document, every field optional.
///
/// Unknown keys are ignored so documents can carry editor-only annotations.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RawSegment {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub len: Option<i64>,
    pub framelen: Option<i64>,
    pub frameoffset: Option<i64>,
    pub offset: Option<i64>,
    pub startoffset: Option<i64>,
    pub endoffset: Option<i64>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub scale: Option<f64>,
    pub invert: Option<bool>,
    /// `Some(None)` is an explicit `null`, which clears an inherited crop.
    #[serde(deserialize_with = "explicit_null")]
    pub crop: Option<Option<CropRect>>,
    /// `Some(None)` is an explicit `null`, which clears an inherited predecessor.
    #[serde(deserialize_with = "explicit_null")]
    pub after: Option<Option<String>>,
    pub inherit: Option<String>,
}

// Present fields deserialize to `Some(..)`, including `null`; absent fields stay `None`.
fn explicit_null<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

impl RawSegment {
    /// Convert one generic document record into a raw segment.
    ///
    /// A type mismatch is scoped to this record so the rest of the document still resolves.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value.clone()).map_err(|e| SchemaError {
            segment: value
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string),
            field: "record",
            problem: SchemaProblem::Invalid(e.to_string()),
        })
    }

    /// Fill every unset field from `defaults`. `name` and `inherit` are never taken from defaults.
    pub fn overlay(&self, defaults: &RawSegment) -> RawSegment {
        RawSegment {
            name: self.name.clone(),
            filename: self.filename.clone().or_else(|| defaults.filename.clone()),
            from: self.from.or(defaults.from),
            to: self.to.or(defaults.to),
            len: self.len.or(defaults.len),
            framelen: self.framelen.or(defaults.framelen),
            frameoffset: self.frameoffset.or(defaults.frameoffset),
            offset: self.offset.or(defaults.offset),
            startoffset: self.startoffset.or(defaults.startoffset),
            endoffset: self.endoffset.or(defaults.endoffset),
            looping: self.looping.or(defaults.looping),
            x: self.x.or(defaults.x),
            y: self.y.or(defaults.y),
            scale: self.scale.or(defaults.scale),
            invert: self.invert.or(defaults.invert),
            crop: self.crop.or(defaults.crop),
            after: self.after.clone().or_else(|| defaults.after.clone()),
            inherit: self.inherit.clone(),
        }
    }
}

/// A fully resolved segment with every default applied.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SegmentSpec {
    pub name: String,
    pub filename: String,
    pub from: i64,
    pub to: i64, // inclusive
    pub len: i64,
    pub framelen: i64,
    pub frameoffset: i64,
    pub offset: i64,
    pub startoffset: i64,
    pub endoffset: i64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub x: i32,
    pub y: i32,
    pub scale: f64,
    pub invert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl SegmentSpec {
    /// This record as defaults for a segment that inherits from it.
    pub fn as_defaults(&self) -> RawSegment {
        RawSegment {
            name: None,
            filename: Some(self.filename.clone()),
            from: Some(self.from),
            to: Some(self.to),
            len: Some(self.len),
            framelen: Some(self.framelen),
            frameoffset: Some(self.frameoffset),
            offset: Some(self.offset),
            startoffset: Some(self.startoffset),
            endoffset: Some(self.endoffset),
            looping: Some(self.looping),
            x: Some(self.x),
            y: Some(self.y),
            scale: Some(self.scale),
            invert: Some(self.invert),
            crop: Some(self.crop),
            after: Some(self.after.clone()),
            inherit: None,
        }
    }

    /// Number of source frames the segment plays before any offsets are applied.
    ///
    /// An explicit zero `len` falls back to `to - from`.
    pub fn frame_count(&self) -> i64 {
        if self.len == 0 {
            self.to.saturating_sub(self.from)
        } else {
            self.len
        }
    }

    /// Length of one pass over `[from, to]`, in source frames.
    pub fn cycle_len(&self) -> i64 {
        self.to.saturating_sub(self.from).saturating_add(1)
    }
}

/// What is wrong with a segment field.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaProblem {
    /// Required field absent.
    Missing,
    /// Field present but unusable.
    Invalid(String),
    /// `name` is already taken by an earlier segment.
    Duplicate,
}

/// Structured, field-scoped segment validation failure.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaError {
    /// Segment name, when the record has one.
    pub segment: Option<String>,
    /// Offending field.
    pub field: &'static str,
    pub problem: SchemaProblem,
}

impl SchemaError {
    fn missing(segment: Option<&str>, field: &'static str) -> Self {
        Self {
            segment: segment.map(str::to_string),
            field,
            problem: SchemaProblem::Missing,
        }
    }

    pub(crate) fn invalid(segment: &str, field: &'static str, why: impl Into<String>) -> Self {
        Self {
            segment: Some(segment.to_string()),
            field,
            problem: SchemaProblem::Invalid(why.into()),
        }
    }

    /// Duplicate-name rejection for `name`.
    pub fn duplicate(name: &str) -> Self {
        Self {
            segment: Some(name.to_string()),
            field: "name",
            problem: SchemaProblem::Duplicate,
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.segment {
            Some(name) => write!(f, "segment '{name}': ")?,
            None => write!(f, "unnamed segment: ")?,
        }
        match &self.problem {
            SchemaProblem::Missing => write!(f, "field '{}' is missing", self.field),
            SchemaProblem::Invalid(why) => write!(f, "field '{}' {why}", self.field),
            SchemaProblem::Duplicate => write!(f, "name already exists"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Merge `raw` over `defaults`, check required fields, and fill in derived values.
///
/// `to` is derived as `from + len` when only `len` is given; `len` as `to - from + 1` when only
/// `to` is given.
pub fn resolve(raw: &RawSegment, defaults: &RawSegment) -> Result<SegmentSpec, SchemaError> {
    let merged = raw.overlay(defaults);

    let Some(name) = merged.name.filter(|n| !n.trim().is_empty()) else {
        return Err(SchemaError::missing(None, "name"));
    };
    let Some(from) = merged.from else {
        return Err(SchemaError::missing(Some(&name), "from"));
    };
    let (to, len) = match (merged.to, merged.len) {
        (Some(to), Some(len)) => (to, len),
        (Some(to), None) => match to.checked_sub(from).and_then(|d| d.checked_add(1)) {
            Some(len) => (to, len),
            None => return Err(SchemaError::invalid(&name, "to", "out of range")),
        },
        (None, Some(len)) => match from.checked_add(len) {
            Some(to) => (to, len),
            None => return Err(SchemaError::invalid(&name, "len", "out of range")),
        },
        (None, None) => return Err(SchemaError::missing(Some(&name), "to")),
    };

    let framelen = merged.framelen.unwrap_or(1);
    let scale = merged.scale.unwrap_or(1.0);

    if from < 0 {
        return Err(SchemaError::invalid(&name, "from", "must be >= 0"));
    }
    if from > to {
        return Err(SchemaError::invalid(&name, "to", format!("must be >= from ({from})")));
    }
    if len < 0 {
        return Err(SchemaError::invalid(&name, "len", "must be >= 0"));
    }
    if framelen < 1 {
        return Err(SchemaError::invalid(&name, "framelen", "must be >= 1"));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(SchemaError::invalid(&name, "scale", "must be finite and > 0"));
    }
    // One full loop, in ticks, must be representable.
    let cycle_ticks = (to - from)
        .checked_add(1)
        .and_then(|frames| frames.checked_mul(framelen));
    if cycle_ticks.is_none() {
        return Err(SchemaError::invalid(&name, "framelen", "out of range"));
    }

    let filename = merged
        .filename
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| name.clone());

    Ok(SegmentSpec {
        filename,
        from,
        to,
        len,
        framelen,
        frameoffset: merged.frameoffset.unwrap_or(0),
        offset: merged.offset.unwrap_or(0),
        startoffset: merged.startoffset.unwrap_or(0),
        endoffset: merged.endoffset.unwrap_or(0),
        looping: merged.looping.unwrap_or(true),
        x: merged.x.unwrap_or(0),
        y: merged.y.unwrap_or(0),
        scale,
        invert: merged.invert.unwrap_or(false),
        crop: merged.crop.flatten(),
        after: merged.after.flatten(),
        name,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/document/segment.rs"]
mod tests;
