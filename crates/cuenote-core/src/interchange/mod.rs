//! Import/export formats.
//!
//! Four formats with different fidelity:
//! - `structured` - JSON carrying every field; lossless round trip
//! - `tabular` - CSV for spreadsheets; export only
//! - `srt` / `vtt` - subtitle files; comments and highlights only

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::Annotation;

pub mod structured;
pub mod subtitle;
pub mod tabular;
pub mod timecode;

pub use subtitle::{SubtitleFlavor, SubtitleImport, DEFAULT_DURATION_SECS};

/// Interchange format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterchangeFormat {
    Structured,
    Tabular,
    Srt,
    Vtt,
}

impl InterchangeFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Tabular => "tabular",
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }
}

impl fmt::Display for InterchangeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterchangeFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(Self::Structured),
            "tabular" | "csv" => Ok(Self::Tabular),
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            other => Err(EngineError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Options for structured import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Assign new ids to every imported record instead of keeping the ones
    /// in the file. Colliding ids are reassigned regardless.
    pub fresh_ids: bool,
}

/// What an import did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Records actually added to the store.
    pub imported: usize,
    /// Records or blocks the parser looked at, including skipped ones.
    pub attempted: usize,
}

/// Render annotations in the given format.
pub fn export(annotations: &[&Annotation], format: InterchangeFormat) -> Result<String, EngineError> {
    match format {
        InterchangeFormat::Structured => structured::export(annotations),
        InterchangeFormat::Tabular => Ok(tabular::export(annotations)),
        InterchangeFormat::Srt => Ok(subtitle::export(annotations, SubtitleFlavor::Srt)),
        InterchangeFormat::Vtt => Ok(subtitle::export(annotations, SubtitleFlavor::Vtt)),
    }
}
