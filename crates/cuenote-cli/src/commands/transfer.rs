//! Import and export command handlers

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use cuenote_core::{AnnotationEngine, ImportOptions, InterchangeFormat};

use crate::commands::annotate::build_filter;
use crate::output::Output;

/// Export annotations to stdout or a file
#[allow(clippy::too_many_arguments)]
pub fn export(
    engine: &AnnotationEngine,
    format: String,
    file: Option<PathBuf>,
    from: Option<String>,
    to: Option<String>,
    kind: Option<String>,
    tag: Option<String>,
    output: &Output,
) -> Result<()> {
    let format: InterchangeFormat = format.parse()?;

    let spec = if from.is_some() || to.is_some() || kind.is_some() || tag.is_some() {
        Some(build_filter(from, to, kind, tag, None, None)?)
    } else {
        None
    };

    let data = engine.export_annotations(format, spec.as_ref())?;

    match file {
        Some(path) => {
            fs::write(&path, &data)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!("Exported {} to {}", format, path.display()));
        }
        None => {
            // The exported payload is the output, whatever the format flags say
            print!("{}", data);
        }
    }

    Ok(())
}

/// Import annotations from a file
pub fn import(
    engine: &AnnotationEngine,
    file: PathBuf,
    format: Option<String>,
    fresh_ids: bool,
    output: &Output,
) -> Result<()> {
    let format = match format {
        Some(f) => f.parse()?,
        None => infer_format(&file)?,
    };

    let data =
        fs::read_to_string(&file).with_context(|| format!("Failed to read import file: {:?}", file))?;

    let outcome = engine.import_annotations(&data, format, ImportOptions { fresh_ids })?;

    output.success(&format!(
        "Imported {}/{} annotations from {}",
        outcome.imported,
        outcome.attempted,
        file.display()
    ));
    if output.is_quiet() {
        println!("{}", outcome.imported);
    }

    Ok(())
}

/// Guess the interchange format from a file extension
fn infer_format(path: &Path) -> Result<InterchangeFormat> {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        bail!(
            "Cannot infer format for {:?}. Pass --format (structured, srt, vtt).",
            path
        );
    };
    extension.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unrecognized extension '.{}'. Pass --format (structured, srt, vtt).",
            extension
        )
    })
}
