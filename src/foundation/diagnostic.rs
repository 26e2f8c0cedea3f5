use std::fmt;

use crate::foundation::error::FlipreelError;

/// Category of a recorded problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Missing/invalid field or duplicate name; the segment was skipped.
    Schema,
    /// Unknown `after`/`inherit` target; resolution fell back to a default.
    Reference,
    /// Asset file missing or undecodable; the placement was marked broken.
    AssetLoad,
    /// The document itself could not be read; the previous state was kept.
    DocumentParse,
}

/// How bad a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Something was dropped or degraded.
    Error,
    /// Resolution continued with a fallback value.
    Warning,
}

/// One problem found while loading or building a document.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    /// Problem category.
    pub kind: DiagnosticKind,
    /// Severity of the problem.
    pub severity: Severity,
    /// Segment the problem belongs to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Offending field, when the problem is field-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Rendered error message.
    pub message: String,
}

impl Diagnostic {
    /// Convert an engine error into a diagnostic.
    ///
    /// Reference problems are warnings; everything else is an error.
    pub fn from_error(err: &FlipreelError, segment: Option<&str>) -> Self {
        let (kind, severity, field) = match err {
            FlipreelError::Schema(e) => (DiagnosticKind::Schema, Severity::Error, Some(e.field)),
            FlipreelError::Reference(_) => (DiagnosticKind::Reference, Severity::Warning, None),
            FlipreelError::AssetLoad { .. } => (DiagnosticKind::AssetLoad, Severity::Error, None),
            FlipreelError::DocumentParse(_)
            | FlipreelError::Validation(_)
            | FlipreelError::Other(_) => (DiagnosticKind::DocumentParse, Severity::Error, None),
        };
        let segment = match err {
            FlipreelError::Schema(e) => e.segment.clone().or_else(|| segment.map(str::to_string)),
            _ => segment.map(str::to_string),
        };
        Self {
            kind,
            severity,
            segment,
            field,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };
        match &self.segment {
            Some(seg) => write!(f, "{level} [{seg}] {}", self.message),
            None => write!(f, "{level} {}", self.message),
        }
    }
}

/// Ordered list of diagnostics accumulated during one load/build.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `err` and log it.
    pub fn record(&mut self, err: &FlipreelError, segment: Option<&str>) {
        let diag = Diagnostic::from_error(err, segment);
        match diag.severity {
            Severity::Error => tracing::error!("{diag}"),
            Severity::Warning => tracing::warn!("{diag}"),
        }
        self.0.push(diag);
    }

    /// The "document has errors" flag: true when anything was recorded, warnings included.
    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/diagnostic.rs"]
mod tests;
