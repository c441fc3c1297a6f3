//! Annotation command handlers
//!
//! Create, inspect, edit, and remove annotations on the active stream.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use uuid::Uuid;

use cuenote_core::interchange::timecode;
use cuenote_core::{
    AnnotationDraft, AnnotationEngine, AnnotationFilter, AnnotationPatch, InteractionData,
    InteractionKind,
};

use crate::editor::{confirm, edit_text};
use crate::output::Output;

/// Create a new annotation
#[allow(clippy::too_many_arguments)]
pub fn create(
    engine: &AnnotationEngine,
    content: Option<String>,
    at: String,
    kind: Option<String>,
    duration: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    priority: Option<String>,
    expires_in: Option<i64>,
    output: &Output,
) -> Result<()> {
    let timestamp = parse_timestamp(&at)?;

    // Get content from the argument or open the editor
    let body = match content {
        Some(c) => c,
        None => {
            let initial = format!(
                "<!-- New annotation at {} -->\n\n",
                timecode::format_vtt(timestamp)
            );
            let edited = edit_text(&initial).context("Failed to edit annotation")?;

            // Remove the comment lines
            edited
                .lines()
                .filter(|line| !line.starts_with("<!--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        }
    };

    if body.is_empty() {
        bail!("Annotation content cannot be empty");
    }

    let mut draft = AnnotationDraft {
        content: body,
        timestamp,
        ..AnnotationDraft::default()
    };
    if let Some(ref kind) = kind {
        draft.kind = Some(kind.parse().context("Invalid annotation kind")?);
    }
    if let Some(ref duration) = duration {
        draft.duration = Some(parse_timestamp(duration)?);
    }
    draft.tags = tags.into_iter().collect();
    draft.category = category;
    if let Some(ref priority) = priority {
        draft.priority = Some(priority.parse().context("Invalid priority")?);
    }
    if let Some(secs) = expires_in {
        if secs <= 0 {
            bail!("--expires-in must be a positive number of seconds");
        }
        draft.expires_at = Some(Utc::now() + Duration::seconds(secs));
    }

    let annotation = engine.create_annotation(draft)?;

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

/// List annotations, optionally narrowed by time window and facets
#[allow(clippy::too_many_arguments)]
pub fn list(
    engine: &AnnotationEngine,
    from: Option<String>,
    to: Option<String>,
    kind: Option<String>,
    tag: Option<String>,
    actor: Option<String>,
    status: Option<String>,
    output: &Output,
) -> Result<()> {
    let filter = build_filter(from, to, kind, tag, actor, status)?;
    let annotations = engine.filter_annotations(&filter)?;
    output.print_annotations(&annotations);
    Ok(())
}

/// Show annotation details (including its reply thread)
pub fn show(engine: &AnnotationEngine, id: String, output: &Output) -> Result<()> {
    let uuid = parse_annotation_id(&id, engine)?;
    let annotation = engine.get_annotation(uuid)?;
    output.print_annotation(&annotation);

    if let Some(thread) = engine.thread(uuid)? {
        let replies: Vec<_> = thread
            .replies
            .iter()
            .filter_map(|reply_id| engine.get_annotation(*reply_id).ok())
            .collect();
        output.print_thread(&thread, &replies);
    }

    Ok(())
}

/// Edit an annotation
///
/// With no field flags, opens the content in $EDITOR.
#[allow(clippy::too_many_arguments)]
pub fn edit(
    engine: &AnnotationEngine,
    id: String,
    content: Option<String>,
    at: Option<String>,
    duration: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    output: &Output,
) -> Result<()> {
    let uuid = parse_annotation_id(&id, engine)?;

    let open_editor = content.is_none()
        && at.is_none()
        && duration.is_none()
        && tags.is_empty()
        && category.is_none()
        && priority.is_none()
        && status.is_none();

    let mut patch = AnnotationPatch {
        content,
        ..AnnotationPatch::default()
    };
    if open_editor {
        let current = engine.get_annotation(uuid)?;
        let edited = edit_text(&current.content).context("Failed to edit annotation")?;
        let edited = edited.trim().to_string();
        if edited.is_empty() {
            bail!("Annotation content cannot be empty");
        }
        if edited == current.content {
            output.message("No changes.");
            return Ok(());
        }
        patch.content = Some(edited);
    }
    if let Some(ref at) = at {
        patch.timestamp = Some(parse_timestamp(at)?);
    }
    if let Some(ref duration) = duration {
        patch.duration = Some(parse_timestamp(duration)?);
    }
    if !tags.is_empty() {
        patch.tags = Some(tags.into_iter().collect());
    }
    patch.category = category;
    if let Some(ref priority) = priority {
        patch.priority = Some(priority.parse().context("Invalid priority")?);
    }
    if let Some(ref status) = status {
        patch.status = Some(status.parse().context("Invalid status")?);
    }

    let updated = engine.update_annotation(uuid, patch)?;
    output.success(&format!("Updated annotation {}", &updated.id.to_string()[..8]));

    Ok(())
}

/// Delete an annotation
pub fn delete(engine: &AnnotationEngine, id: String, output: &Output) -> Result<()> {
    let uuid = parse_annotation_id(&id, engine)?;
    let annotation = engine.get_annotation(uuid)?;

    // Confirm deletion
    if output.should_prompt() {
        let preview = if annotation.content.len() > 50 {
            format!("{}...", &annotation.content[..50])
        } else {
            annotation.content.clone()
        };
        println!(
            "Delete annotation: {} - {}",
            &uuid.to_string()[..8],
            preview.replace('\n', " ")
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    engine.delete_annotation(uuid)?;
    output.success(&format!("Deleted annotation {}", &uuid.to_string()[..8]));

    Ok(())
}

/// Reply to an annotation
pub fn reply(
    engine: &AnnotationEngine,
    id: String,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let uuid = parse_annotation_id(&id, engine)?;

    // Get the parent to show context
    let parent = engine.get_annotation(uuid)?;

    let body = match content {
        Some(c) => c,
        None => {
            let first_line = parent.content.lines().next().unwrap_or("");
            let initial = format!(
                "<!-- Replying to {}: {} -->\n\n",
                parent.actor_name, first_line
            );
            let edited = edit_text(&initial).context("Failed to edit reply")?;

            edited
                .lines()
                .filter(|line| !line.starts_with("<!--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        }
    };

    if body.is_empty() {
        bail!("Reply content cannot be empty");
    }

    let reply = engine.reply(uuid, body)?;
    output.success(&format!(
        "Added reply {} to annotation {}",
        &reply.id.to_string()[..8],
        &uuid.to_string()[..8]
    ));

    Ok(())
}

/// Add an interaction to an annotation
pub fn react(
    engine: &AnnotationEngine,
    id: String,
    kind: String,
    emoji: Option<String>,
    reason: Option<String>,
    choice: Option<String>,
    output: &Output,
) -> Result<()> {
    let uuid = parse_annotation_id(&id, engine)?;
    let kind: InteractionKind = kind.parse().context("Invalid interaction kind")?;

    let data = match (kind, emoji, reason, choice) {
        (InteractionKind::Reaction, Some(emoji), _, _) => {
            Some(InteractionData::Reaction { emoji })
        }
        (InteractionKind::Reaction, None, _, _) => {
            bail!("A reaction needs --emoji");
        }
        (InteractionKind::Report, _, Some(reason), _) => Some(InteractionData::Report { reason }),
        (InteractionKind::PollVote, _, _, Some(choice)) => {
            Some(InteractionData::PollVote { choice })
        }
        (InteractionKind::PollVote, _, _, None) => {
            bail!("A poll vote needs --choice");
        }
        _ => None,
    };

    engine.interact(uuid, kind, data)?;
    output.success(&format!(
        "Added {} to annotation {}",
        kind,
        &uuid.to_string()[..8]
    ));

    Ok(())
}

/// Search annotations by text
pub fn search(
    engine: &AnnotationEngine,
    query: String,
    kind: Option<String>,
    tag: Option<String>,
    output: &Output,
) -> Result<()> {
    let spec = if kind.is_some() || tag.is_some() {
        Some(build_filter(None, None, kind, tag, None, None)?)
    } else {
        None
    };

    let results = engine.search_annotations(&query, spec.as_ref())?;
    output.print_annotations(&results);
    Ok(())
}

/// Build a filter spec from common CLI flags
pub(crate) fn build_filter(
    from: Option<String>,
    to: Option<String>,
    kind: Option<String>,
    tag: Option<String>,
    actor: Option<String>,
    status: Option<String>,
) -> Result<AnnotationFilter> {
    let mut filter = AnnotationFilter::default();
    if from.is_some() || to.is_some() {
        let start = from.map(|s| parse_timestamp(&s)).transpose()?.unwrap_or(0.0);
        let end = to
            .map(|s| parse_timestamp(&s))
            .transpose()?
            .unwrap_or(f64::MAX);
        filter.window = Some((start, end));
    }
    if let Some(ref kind) = kind {
        filter = filter.with_kind(kind.parse().context("Invalid annotation kind")?);
    }
    if let Some(tag) = tag {
        filter = filter.with_tag(tag);
    }
    if let Some(actor) = actor {
        filter = filter.with_actor(actor);
    }
    if let Some(ref status) = status {
        filter = filter.with_status(status.parse().context("Invalid status")?);
    }
    Ok(filter)
}

/// Parse a time argument: plain seconds ("95.5") or a timecode ("1:35.5")
pub(crate) fn parse_timestamp(input: &str) -> Result<f64> {
    if let Ok(seconds) = input.trim().parse::<f64>() {
        return Ok(seconds);
    }
    timecode::parse(input).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid time '{}'. Use seconds (95.5) or a timecode (1:35.5)",
            input
        )
    })
}

/// Resolve a full UUID or unique prefix to an annotation id
pub(crate) fn parse_annotation_id(id: &str, engine: &AnnotationEngine) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match
    let annotations = engine.filter_annotations(&AnnotationFilter::default())?;
    let matches: Vec<_> = annotations
        .iter()
        .filter(|a| a.id.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No annotation found matching: {}", id),
        1 => Ok(matches[0].id),
        _ => {
            eprintln!("Multiple annotations match '{}':", id);
            for annotation in &matches {
                let first_line = annotation.content.lines().next().unwrap_or("");
                eprintln!("  {} - {}", annotation.id, first_line);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
