//! Layer command handlers
//!
//! Layers group annotations by a saved filter and can be toggled as a set.

use anyhow::{bail, Result};
use uuid::Uuid;

use cuenote_core::AnnotationEngine;

use crate::commands::annotate::build_filter;
use crate::output::Output;

/// Create a layer from filter flags
pub fn create(
    engine: &AnnotationEngine,
    name: String,
    kind: Option<String>,
    tag: Option<String>,
    actor: Option<String>,
    output: &Output,
) -> Result<()> {
    let filter = build_filter(None, None, kind, tag, actor, None)?;
    let layer = engine.create_layer(name, filter)?;

    output.success(&format!(
        "Created layer {}: {}",
        &layer.id.to_string()[..8],
        layer.name
    ));
    if output.is_quiet() {
        println!("{}", layer.id);
    }

    Ok(())
}

/// List all layers
pub fn list(engine: &AnnotationEngine, output: &Output) -> Result<()> {
    let layers = engine.layers()?;
    output.print_layers(&layers);
    Ok(())
}

/// Toggle a layer's visibility
pub fn toggle(engine: &AnnotationEngine, id: String, output: &Output) -> Result<()> {
    let uuid = parse_layer_id(&id, engine)?;
    let visible = engine.toggle_layer(uuid)?;

    let state = if visible { "visible" } else { "hidden" };
    output.success(&format!("Layer {} is now {}", &uuid.to_string()[..8], state));

    Ok(())
}

/// Show the annotations a layer currently selects
pub fn members(engine: &AnnotationEngine, id: String, output: &Output) -> Result<()> {
    let uuid = parse_layer_id(&id, engine)?;
    let members = engine.layer_members(uuid)?;
    output.print_annotations(&members);
    Ok(())
}

/// Make a layer the default
pub fn set_default(engine: &AnnotationEngine, id: String, output: &Output) -> Result<()> {
    let uuid = parse_layer_id(&id, engine)?;
    engine.set_default_layer(uuid)?;
    output.success(&format!("Layer {} is now the default", &uuid.to_string()[..8]));
    Ok(())
}

/// Delete a layer
pub fn delete(engine: &AnnotationEngine, id: String, output: &Output) -> Result<()> {
    let uuid = parse_layer_id(&id, engine)?;
    engine.remove_layer(uuid)?;
    output.success(&format!("Deleted layer {}", &uuid.to_string()[..8]));
    Ok(())
}

/// Resolve a full UUID or unique prefix to a layer id
fn parse_layer_id(id: &str, engine: &AnnotationEngine) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match
    let layers = engine.layers()?;
    let matches: Vec<_> = layers
        .iter()
        .filter(|l| l.id.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No layer found matching: {}", id),
        1 => Ok(matches[0].id),
        _ => {
            eprintln!("Multiple layers match '{}':", id);
            for layer in &matches {
                eprintln!("  {} - {}", layer.id, layer.name);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
