//! Status command handler

use anyhow::Result;

use cuenote_core::AnnotationEngine;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(engine: &AnnotationEngine, output: &Output) -> Result<()> {
    let session = engine.session()?;
    let config = engine.config();
    let annotations = engine.annotation_count()?;
    let layers = engine.layers()?.len();
    let templates = engine.templates()?.len();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "session": {
                        "stream_id": session.stream_id,
                        "actor_id": session.actor_id,
                        "actor_name": session.actor_name,
                        "started_at": session.started_at
                    },
                    "sync_enabled": config.sync_enabled,
                    "sync_url": config.sync_url,
                    "storage": {
                        "data_dir": config.data_dir
                    },
                    "counts": {
                        "annotations": annotations,
                        "layers": layers,
                        "templates": templates
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", session.stream_id);
        }
        OutputFormat::Human => {
            println!("Cuenote Status");
            println!("==============");
            println!();
            println!("Session:");
            println!("  Stream: {}", session.stream_id);
            println!("  Actor:  {} ({})", session.actor_name, session.actor_id);
            println!(
                "  Since:  {}",
                session.started_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("Sync:");
            println!(
                "  Status: {}",
                if config.sync_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            if let Some(ref url) = config.sync_url {
                println!("  Server: {}", url);
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Contents:");
            println!("  Annotations: {}", annotations);
            println!("  Layers:      {}", layers);
            println!("  Templates:   {}", templates);
        }
    }

    Ok(())
}
