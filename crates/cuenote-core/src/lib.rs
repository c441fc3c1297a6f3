//! Cuenote Core Library
//!
//! This crate provides the core functionality for cuenote, a time-indexed
//! annotation engine for media timelines: actors attach structured,
//! positioned, time-scoped notes to a stream, organized into reply threads
//! and visibility layers, searchable by facet, and exportable to common
//! interchange formats.
//!
//! # Architecture
//!
//! - **AnnotationEngine**: the façade hosts talk to (main entry point)
//! - **AnnotationStore**: in-memory source of truth with a time-range index
//!
//! Queries are served from memory; a key-value cache makes sessions
//! resumable, and a pluggable transport carries sync envelopes between
//! peers. Both are traits the host can replace.
//!
//! # Quick Start
//!
//! ```text
//! let engine = AnnotationEngine::new(config, storage, transport);
//! engine.initialize(None, None, None)?;
//!
//! // Annotate the timeline
//! let note = engine.create_annotation(AnnotationDraft::comment("nice shot", 125.0))?;
//!
//! // Query what is on screen
//! let visible = engine.annotations_at(127.0)?;
//! ```
//!
//! # Modules
//!
//! - `engine`: engine façade (main entry point)
//! - `model`: annotation, thread, layer, filter, and template types
//! - `store`: indexed annotation storage and the status state machine
//! - `access`: permission and visibility predicates
//! - `threads` / `layers` / `templates`: component sets over the store
//! - `search` / `analytics`: faceted queries and derived metrics
//! - `interchange`: structured, tabular, and subtitle formats
//! - `sync`: wire envelopes and the transport seam
//! - `storage`: key-value persistence and snapshot cache
//! - `config` / `session`: configuration and stream identity

pub mod access;
pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod interchange;
pub mod layers;
pub mod model;
pub mod search;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;
pub mod templates;
pub mod threads;

pub use analytics::{AnnotationAnalytics, QualityMetrics};
pub use config::Config;
pub use engine::AnnotationEngine;
pub use error::EngineError;
pub use events::EngineEvent;
pub use interchange::{ImportOptions, ImportOutcome, InterchangeFormat};
pub use model::{
    Annotation, AnnotationDraft, AnnotationFilter, AnnotationKind, AnnotationLayer,
    AnnotationPatch, AnnotationStatus, AnnotationTemplate, Interaction, InteractionData,
    InteractionKind, Priority, Provenance,
};
pub use session::StreamSession;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::AnnotationStore;
pub use sync::{ChannelTransport, NoopTransport, Transport};
