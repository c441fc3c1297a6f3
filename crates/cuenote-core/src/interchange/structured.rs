//! Full-fidelity JSON interchange.
//!
//! The structured format carries every field of every record, so
//! `import(export(set))` reproduces the set exactly. A version number on the
//! envelope guards future layout changes.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::Annotation;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ExportDocument<'a> {
    version: u32,
    annotations: &'a [&'a Annotation],
}

#[derive(Deserialize)]
struct ImportDocument {
    version: u32,
    annotations: Vec<Annotation>,
}

/// Serialize the annotation set with every field intact.
pub fn export(annotations: &[&Annotation]) -> Result<String, EngineError> {
    let document = ExportDocument {
        version: FORMAT_VERSION,
        annotations,
    };
    serde_json::to_string_pretty(&document)
        .map_err(|e| EngineError::InvalidInput(format!("failed to encode annotations: {e}")))
}

/// Parse a structured document back into records.
pub fn import(data: &str) -> Result<Vec<Annotation>, EngineError> {
    let document: ImportDocument = serde_json::from_str(data)
        .map_err(|e| EngineError::InvalidInput(format!("invalid structured document: {e}")))?;
    if document.version != FORMAT_VERSION {
        return Err(EngineError::UnsupportedFormat(format!(
            "structured version {}",
            document.version
        )));
    }
    Ok(document.annotations)
}
