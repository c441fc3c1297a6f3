//! Cuenote CLI
//!
//! Command-line interface for cuenote - time-indexed annotations on media
//! timelines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use cuenote_core::{AnnotationEngine, Config, FileStore, NoopTransport};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "cuenote")]
#[command(about = "Cuenote - time-indexed annotations on media timelines")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Stream to annotate (overrides config)
    #[arg(long, global = true)]
    stream: Option<String>,

    /// Act as this viewer id (overrides config)
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new annotation
    #[command(alias = "a")]
    Add {
        /// Annotation text (opens editor if not provided)
        content: Option<String>,
        /// Timeline position, as seconds or a timecode (1:35.5)
        #[arg(long)]
        at: String,
        /// Annotation kind (comment, highlight, question, ...)
        #[arg(short, long)]
        kind: Option<String>,
        /// Covered span, as seconds or a timecode
        #[arg(short, long)]
        duration: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        /// Category label
        #[arg(short, long)]
        category: Option<String>,
        /// Priority (low, medium, high, urgent)
        #[arg(short, long)]
        priority: Option<String>,
        /// Expire after this many seconds
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// List annotations
    #[command(alias = "ls")]
    List {
        /// Window start, as seconds or a timecode
        #[arg(long)]
        from: Option<String>,
        /// Window end, as seconds or a timecode
        #[arg(long)]
        to: Option<String>,
        /// Filter by kind
        #[arg(short, long)]
        kind: Option<String>,
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Filter by author
        #[arg(short, long)]
        actor: Option<String>,
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show annotation details (including replies)
    Show {
        /// Annotation ID (full UUID or prefix)
        id: String,
    },
    /// Edit an annotation (opens editor without field flags)
    Edit {
        /// Annotation ID (full UUID or prefix)
        id: String,
        /// New annotation text
        #[arg(long)]
        content: Option<String>,
        /// New timeline position, as seconds or a timecode
        #[arg(long)]
        at: Option<String>,
        /// New covered span, as seconds or a timecode
        #[arg(short, long)]
        duration: Option<String>,
        /// Replace all tags
        #[arg(short, long)]
        tag: Vec<String>,
        /// New category label
        #[arg(short, long)]
        category: Option<String>,
        /// New priority (low, medium, high, urgent)
        #[arg(short, long)]
        priority: Option<String>,
        /// New status (active, hidden, featured, ...)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Delete an annotation
    Rm {
        /// Annotation ID (full UUID or prefix)
        id: String,
    },
    /// Reply to an annotation
    Reply {
        /// Annotation ID (full UUID or prefix)
        id: String,
        /// Reply text (opens editor if not provided)
        content: Option<String>,
    },
    /// Add an interaction to an annotation
    React {
        /// Annotation ID (full UUID or prefix)
        id: String,
        /// Interaction kind (like, dislike, reaction, report, bookmark, share, poll_vote)
        kind: String,
        /// Emoji for a reaction
        #[arg(short, long)]
        emoji: Option<String>,
        /// Reason for a report
        #[arg(short, long)]
        reason: Option<String>,
        /// Choice for a poll vote
        #[arg(long)]
        choice: Option<String>,
    },
    /// Search annotations
    Search {
        /// Search query
        query: String,
        /// Filter by kind
        #[arg(short, long)]
        kind: Option<String>,
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Manage annotation layers
    Layer {
        #[command(subcommand)]
        command: LayerCommands,
    },
    /// Manage annotation templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Import annotations from a file
    Import {
        /// File to import (.json, .srt, .vtt)
        file: PathBuf,
        /// Interchange format (inferred from the extension if omitted)
        #[arg(short, long)]
        format: Option<String>,
        /// Assign new ids to every imported record
        #[arg(long)]
        fresh_ids: bool,
    },
    /// Export annotations
    Export {
        /// Interchange format (structured, tabular, srt, vtt)
        #[arg(short, long, default_value = "structured")]
        format: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Window start, as seconds or a timecode
        #[arg(long)]
        from: Option<String>,
        /// Window end, as seconds or a timecode
        #[arg(long)]
        to: Option<String>,
        /// Filter by kind
        #[arg(short, long)]
        kind: Option<String>,
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Show annotation analytics
    Stats,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (session, sync, contents)
    Status,
}

#[derive(Subcommand)]
enum LayerCommands {
    /// Create a layer from filter flags
    #[command(alias = "add")]
    Create {
        /// Layer name
        name: String,
        /// Select annotations by kind
        #[arg(short, long)]
        kind: Option<String>,
        /// Select annotations by tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Select annotations by author
        #[arg(short, long)]
        actor: Option<String>,
    },
    /// List all layers
    #[command(alias = "ls")]
    List,
    /// Toggle a layer's visibility
    Toggle {
        /// Layer ID (full UUID or prefix)
        id: String,
    },
    /// Show the annotations a layer selects
    Members {
        /// Layer ID (full UUID or prefix)
        id: String,
    },
    /// Make a layer the default
    Default {
        /// Layer ID (full UUID or prefix)
        id: String,
    },
    /// Delete a layer
    #[command(alias = "rm")]
    Delete {
        /// Layer ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create a new template
    #[command(alias = "add")]
    Create {
        /// Template name
        name: String,
        /// Annotation text the template stamps
        content: String,
        /// Annotation kind (comment, highlight, question, ...)
        #[arg(short, long, default_value = "comment")]
        kind: String,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List all templates
    #[command(alias = "ls")]
    List,
    /// Stamp an annotation from a template
    Apply {
        /// Template ID (full UUID, prefix, or exact name)
        id: String,
        /// Timeline position, as seconds or a timecode
        #[arg(long)]
        at: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, sync_url, sync_enabled, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    init_logging();

    // Config commands don't need the engine
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    let storage = Arc::new(FileStore::new(&config.data_dir));
    let engine = AnnotationEngine::new(config, storage, Arc::new(NoopTransport));
    engine.initialize(cli.stream, cli.actor, None)?;

    let result = match cli.command {
        Commands::Add {
            content,
            at,
            kind,
            duration,
            tag,
            category,
            priority,
            expires_in,
        } => commands::annotate::create(
            &engine, content, at, kind, duration, tag, category, priority, expires_in, &output,
        ),
        Commands::List {
            from,
            to,
            kind,
            tag,
            actor,
            status,
        } => commands::annotate::list(&engine, from, to, kind, tag, actor, status, &output),
        Commands::Show { id } => commands::annotate::show(&engine, id, &output),
        Commands::Edit {
            id,
            content,
            at,
            duration,
            tag,
            category,
            priority,
            status,
        } => commands::annotate::edit(
            &engine, id, content, at, duration, tag, category, priority, status, &output,
        ),
        Commands::Rm { id } => commands::annotate::delete(&engine, id, &output),
        Commands::Reply { id, content } => commands::annotate::reply(&engine, id, content, &output),
        Commands::React {
            id,
            kind,
            emoji,
            reason,
            choice,
        } => commands::annotate::react(&engine, id, kind, emoji, reason, choice, &output),
        Commands::Search { query, kind, tag } => {
            commands::annotate::search(&engine, query, kind, tag, &output)
        }
        Commands::Layer { command } => handle_layer_command(command, &engine, &output),
        Commands::Template { command } => handle_template_command(command, &engine, &output),
        Commands::Import {
            file,
            format,
            fresh_ids,
        } => commands::transfer::import(&engine, file, format, fresh_ids, &output),
        Commands::Export {
            format,
            output: file,
            from,
            to,
            kind,
            tag,
        } => commands::transfer::export(&engine, format, file, from, to, kind, tag, &output),
        Commands::Stats => commands::stats::show(&engine, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&engine, &output),
    };

    // Persist a final snapshot and stop the background tasks
    if let Err(e) = engine.dispose() {
        warn!("Failed to dispose engine cleanly: {e}");
    }

    result
}

fn handle_layer_command(
    command: LayerCommands,
    engine: &AnnotationEngine,
    output: &Output,
) -> Result<()> {
    match command {
        LayerCommands::Create {
            name,
            kind,
            tag,
            actor,
        } => commands::layer::create(engine, name, kind, tag, actor, output),
        LayerCommands::List => commands::layer::list(engine, output),
        LayerCommands::Toggle { id } => commands::layer::toggle(engine, id, output),
        LayerCommands::Members { id } => commands::layer::members(engine, id, output),
        LayerCommands::Default { id } => commands::layer::set_default(engine, id, output),
        LayerCommands::Delete { id } => commands::layer::delete(engine, id, output),
    }
}

fn handle_template_command(
    command: TemplateCommands,
    engine: &AnnotationEngine,
    output: &Output,
) -> Result<()> {
    match command {
        TemplateCommands::Create {
            name,
            content,
            kind,
            tag,
        } => commands::template::create(engine, name, kind, content, tag, output),
        TemplateCommands::List => commands::template::list(engine, output),
        TemplateCommands::Apply { id, at } => commands::template::apply(engine, id, at, output),
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Install the stderr logger. RUST_LOG overrides the default filter.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
