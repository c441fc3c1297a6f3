//! Stats command handler

use anyhow::Result;

use cuenote_core::AnnotationEngine;

use crate::output::Output;

/// Show the analytics snapshot for the active stream
pub fn show(engine: &AnnotationEngine, output: &Output) -> Result<()> {
    let analytics = engine.analytics()?;
    output.print_analytics(&analytics);
    Ok(())
}
