//! Template command handlers
//!
//! Templates are reusable annotation blueprints stamped onto the timeline.

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use cuenote_core::interchange::timecode;
use cuenote_core::{AnnotationEngine, AnnotationTemplate};

use crate::commands::annotate::parse_timestamp;
use crate::output::Output;

/// Create a new template
pub fn create(
    engine: &AnnotationEngine,
    name: String,
    kind: String,
    content: String,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    let kind = kind.parse().context("Invalid annotation kind")?;

    let mut template = AnnotationTemplate::new(name, kind, content);
    for tag in tags {
        template = template.with_tag(tag);
    }

    let template = engine.create_template(template)?;
    output.success(&format!(
        "Created template {}: {}",
        &template.id.to_string()[..8],
        template.name
    ));
    if output.is_quiet() {
        println!("{}", template.id);
    }

    Ok(())
}

/// List all templates
pub fn list(engine: &AnnotationEngine, output: &Output) -> Result<()> {
    let templates = engine.templates()?;
    output.print_templates(&templates);
    Ok(())
}

/// Stamp an annotation from a template
pub fn apply(engine: &AnnotationEngine, id: String, at: String, output: &Output) -> Result<()> {
    let uuid = parse_template_id(&id, engine)?;
    let timestamp = parse_timestamp(&at)?;

    let annotation = engine.apply_template(uuid, timestamp)?;
    output.success(&format!(
        "Created {} {} at {}",
        annotation.kind,
        &annotation.id.to_string()[..8],
        timecode::format_vtt(annotation.timestamp)
    ));
    if output.is_quiet() {
        println!("{}", annotation.id);
    }

    Ok(())
}

/// Resolve a full UUID or unique prefix to a template id
fn parse_template_id(id: &str, engine: &AnnotationEngine) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match, by id then by name
    let templates = engine.templates()?;
    let matches: Vec<_> = templates
        .iter()
        .filter(|t| t.id.to_string().starts_with(id) || t.name == id)
        .collect();

    match matches.len() {
        0 => bail!("No template found matching: {}", id),
        1 => Ok(matches[0].id),
        _ => {
            eprintln!("Multiple templates match '{}':", id);
            for template in &matches {
                eprintln!("  {} - {}", template.id, template.name);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
