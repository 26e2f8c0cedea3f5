use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::document::segment::RawSegment;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{FlipreelError, FlipreelResult};
use crate::timeline::frame_table::FrameTable;

/// Serde shape of an animation document.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct DocumentDef {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    #[serde(default)]
    pub audio: Option<String>,
    pub framedir: String,
    /// Duration hint in ticks; segments may run past it.
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Segment records, kept generic so each converts (and fails) on its own.
    #[serde(default)]
    pub framesets: Vec<serde_json::Value>,
}

/// A parsed animation document plus the directory its relative paths resolve against.
#[derive(Clone, Debug)]
pub struct Document {
    def: DocumentDef,
    fps: Fps,
    base_dir: PathBuf,
    defaults: RawSegment,
}

impl Document {
    /// Parse a document from a JSON reader. Relative paths resolve against `base_dir`.
    pub fn from_reader<R: std::io::Read>(r: R, base_dir: impl Into<PathBuf>) -> FlipreelResult<Self> {
        let def: DocumentDef = serde_json::from_reader(r)
            .map_err(|e| FlipreelError::document_parse(format!("parse document JSON: {e}")))?;
        Self::from_def(def, base_dir)
    }

    /// Parse a document from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> FlipreelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FlipreelError::document_parse(format!("open document '{}': {e}", path.display()))
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_reader(BufReader::new(f), base_dir)
    }

    pub fn from_def(def: DocumentDef, base_dir: impl Into<PathBuf>) -> FlipreelResult<Self> {
        let fps = Fps::new(def.fps, 1)
            .map_err(|e| FlipreelError::document_parse(format!("fps: {e}")))?;
        if def.length > FrameTable::MAX_LEN {
            return Err(FlipreelError::document_parse(format!(
                "length {} exceeds the limit of {} ticks",
                def.length,
                FrameTable::MAX_LEN
            )));
        }
        if def.framedir.trim().is_empty() {
            return Err(FlipreelError::document_parse("framedir must be non-empty"));
        }
        let defaults = match &def.default {
            None | Some(serde_json::Value::Null) => RawSegment::default(),
            Some(v) => RawSegment::from_value(v)
                .map_err(|e| FlipreelError::document_parse(format!("default block: {e}")))?,
        };
        Ok(Self {
            def,
            fps,
            base_dir: base_dir.into(),
            defaults,
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.def.width,
            height: self.def.height,
        }
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Declared duration in ticks.
    pub fn length_hint(&self) -> u64 {
        self.def.length
    }

    /// Directory holding the frame images.
    pub fn frame_dir(&self) -> PathBuf {
        self.base_dir.join(&self.def.framedir)
    }

    /// Soundtrack path, if the document names one.
    pub fn audio_path(&self) -> Option<PathBuf> {
        self.def.audio.as_ref().map(|a| self.base_dir.join(a))
    }

    /// Document-level `default` block.
    pub fn defaults(&self) -> &RawSegment {
        &self.defaults
    }

    pub fn framesets(&self) -> &[serde_json::Value] {
        &self.def.framesets
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/model.rs"]
mod tests;
