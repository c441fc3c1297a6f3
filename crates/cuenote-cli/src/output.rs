//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeMap;

use cuenote_core::analytics::HOTSPOT_BUCKET_SECS;
use cuenote_core::interchange::timecode;
use cuenote_core::model::Thread;
use cuenote_core::{Annotation, AnnotationAnalytics, AnnotationLayer, AnnotationTemplate};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single annotation in full detail
    pub fn print_annotation(&self, annotation: &Annotation) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", annotation.id);
                println!("Stream:   {}", annotation.stream_id);
                println!(
                    "Author:   {} ({})",
                    annotation.actor_name, annotation.actor_id
                );
                println!("Kind:     {}", annotation.kind);
                println!("Status:   {}", annotation.status);
                print!("Time:     {}", timecode::format_vtt(annotation.timestamp));
                if let Some(duration) = annotation.duration {
                    print!(" → {}", timecode::format_vtt(annotation.timestamp + duration));
                }
                println!();
                if !annotation.metadata.tags.is_empty() {
                    let tags: Vec<&str> =
                        annotation.metadata.tags.iter().map(String::as_str).collect();
                    println!("Tags:     {}", tags.join(", "));
                }
                if let Some(ref category) = annotation.metadata.category {
                    println!("Category: {}", category);
                }
                println!("Priority: {}", annotation.metadata.priority);
                if !annotation.interactions.is_empty() {
                    println!("Reactions: {}", summarize_interactions(annotation));
                }
                println!(
                    "Created:  {}",
                    annotation.created_at.format("%Y-%m-%d %H:%M")
                );
                println!(
                    "Updated:  {}",
                    annotation.updated_at.format("%Y-%m-%d %H:%M")
                );
                if let Some(expires_at) = annotation.expires_at {
                    println!("Expires:  {}", expires_at.format("%Y-%m-%d %H:%M"));
                }
                println!();
                println!("{}", annotation.content);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(annotation).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", annotation.id);
            }
        }
    }

    /// Print a list of annotations, one line each
    pub fn print_annotations(&self, annotations: &[Annotation]) {
        match self.format {
            OutputFormat::Human => {
                if annotations.is_empty() {
                    println!("No annotations found.");
                    return;
                }
                for annotation in annotations {
                    let reactions = if annotation.interactions.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", annotation.interactions.len())
                    };
                    println!(
                        "{} | {} | {:<14} | {}{}",
                        &annotation.id.to_string()[..8],
                        timecode::format_vtt(annotation.timestamp),
                        annotation.kind.to_string(),
                        truncate_line(&annotation.content, 45),
                        reactions
                    );
                }
                println!("\n{} annotation(s)", annotations.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(annotations).unwrap());
            }
            OutputFormat::Quiet => {
                for annotation in annotations {
                    println!("{}", annotation.id);
                }
            }
        }
    }

    /// Print the reply thread under an annotation
    pub fn print_thread(&self, thread: &Thread, replies: &[Annotation]) {
        match self.format {
            OutputFormat::Human => {
                println!();
                println!(
                    "── Replies ({}, {} participant(s)) ──",
                    thread.total_replies,
                    thread.participants.len()
                );
                for reply in replies {
                    println!(
                        "[{}] {}: {}",
                        reply.created_at.format("%Y-%m-%d %H:%M"),
                        reply.actor_name,
                        truncate_line(&reply.content, 60)
                    );
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(replies).unwrap());
            }
            OutputFormat::Quiet => {
                for reply in replies {
                    println!("{}", reply.id);
                }
            }
        }
    }

    /// Print a list of layers
    pub fn print_layers(&self, layers: &[AnnotationLayer]) {
        match self.format {
            OutputFormat::Human => {
                if layers.is_empty() {
                    println!("No layers found.");
                    return;
                }
                for layer in layers {
                    let visible = if layer.is_visible { "visible" } else { "hidden" };
                    let default = if layer.is_default { " (default)" } else { "" };
                    println!(
                        "{} | {:<7} | {}{}",
                        &layer.id.to_string()[..8],
                        visible,
                        truncate(&layer.name, 40),
                        default
                    );
                }
                println!("\n{} layer(s)", layers.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(layers).unwrap());
            }
            OutputFormat::Quiet => {
                for layer in layers {
                    println!("{}", layer.id);
                }
            }
        }
    }

    /// Print a list of templates
    pub fn print_templates(&self, templates: &[AnnotationTemplate]) {
        match self.format {
            OutputFormat::Human => {
                if templates.is_empty() {
                    println!("No templates found.");
                    return;
                }
                for template in templates {
                    println!(
                        "{} | {:<14} | {} (used {})",
                        &template.id.to_string()[..8],
                        template.kind.to_string(),
                        truncate(&template.name, 30),
                        template.usage_count
                    );
                }
                println!("\n{} template(s)", templates.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(templates).unwrap());
            }
            OutputFormat::Quiet => {
                for template in templates {
                    println!("{}", template.id);
                }
            }
        }
    }

    /// Print an analytics snapshot
    pub fn print_analytics(&self, analytics: &AnnotationAnalytics) {
        match self.format {
            OutputFormat::Human => {
                println!("Annotations: {}", analytics.total);
                println!(
                    "Engagement:  {:.2} interactions/annotation",
                    analytics.engagement_rate
                );
                if !analytics.by_kind.is_empty() {
                    println!();
                    println!("By kind:");
                    for (kind, count) in &analytics.by_kind {
                        println!("  {:<14} {}", kind.to_string(), count);
                    }
                }
                if !analytics.top_contributors.is_empty() {
                    println!();
                    println!("Top contributors:");
                    for (actor, count) in &analytics.top_contributors {
                        println!("  {:<20} {}", actor, count);
                    }
                }
                if !analytics.hotspots.is_empty() {
                    println!();
                    println!("Hotspots:");
                    let mut buckets: Vec<(&u64, &usize)> = analytics.hotspots.iter().collect();
                    buckets.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
                    for (start, count) in buckets.into_iter().take(5) {
                        println!(
                            "  {} - {}  {}",
                            timecode::format_vtt(*start as f64),
                            timecode::format_vtt((start + HOTSPOT_BUCKET_SECS) as f64),
                            count
                        );
                    }
                }
                println!();
                println!("Quality:");
                println!("  avg accuracy:  {:.2}", analytics.quality.avg_accuracy);
                println!("  avg relevance: {:.2}", analytics.quality.avg_relevance);
                println!("  report rate:   {:.2}", analytics.quality.report_rate);
                println!("  verified rate: {:.2}", analytics.quality.verification_rate);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(analytics).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", analytics.total);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Count interactions per kind, e.g. "3 like, 1 report"
fn summarize_interactions(annotation: &Annotation) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for interaction in &annotation.interactions {
        *counts.entry(interaction.kind.to_string()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(kind, count)| format!("{} {}", count, kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }

    #[test]
    fn test_summarize_interactions() {
        use cuenote_core::{Annotation, AnnotationKind, Interaction, InteractionKind};

        let mut annotation = Annotation::new(
            "stream-1",
            "viewer-1",
            "Viewer",
            AnnotationKind::Comment,
            "body",
            5.0,
        );
        annotation.add_interaction(Interaction::new("a", InteractionKind::Like, None));
        annotation.add_interaction(Interaction::new("b", InteractionKind::Like, None));
        annotation.add_interaction(Interaction::new("c", InteractionKind::Report, None));
        assert_eq!(summarize_interactions(&annotation), "2 like, 1 report");
    }
}
