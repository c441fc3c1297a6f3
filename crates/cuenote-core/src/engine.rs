//! Engine façade tying the components together.
//!
//! `AnnotationEngine` holds the store, threads, layers and templates behind
//! a single `RwLock` and coordinates:
//! - checked mutations and timeline queries for the local actor,
//! - cache snapshots through the key-value store,
//! - outbound envelopes and inbound remote events through the transport,
//! - a cleanup sweep for expired records and a periodic reconcile request.
//!
//! A mutation commits entirely under the write lock (including the cache
//! snapshot), then observers are notified and the envelope is published, so
//! neither an observer nor a peer ever sees a half-applied change. Storage
//! and transport failures degrade to in-memory operation with a warning;
//! they never fail the caller's mutation.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = AnnotationEngine::new(config, storage, transport);
//! engine.initialize(None, None, None)?;   // session from config defaults
//!
//! let note = engine.create_annotation(AnnotationDraft::comment("nice shot", 125.0))?;
//! let visible = engine.annotations_at(127.0)?;
//!
//! engine.dispose()?;
//! ```

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access;
use crate::analytics::AnnotationAnalytics;
use crate::config::Config;
use crate::error::EngineError;
use crate::events::{EngineEvent, ObserverSet};
use crate::interchange::{self, ImportOptions, ImportOutcome, InterchangeFormat};
use crate::layers::LayerSet;
use crate::model::{
    Annotation, AnnotationDraft, AnnotationFilter, AnnotationLayer, AnnotationPatch,
    AnnotationStatus, AnnotationTemplate, Interaction, InteractionData, InteractionKind, Thread,
    ThreadModeration,
};
use crate::search;
use crate::session::StreamSession;
use crate::storage::{cache, KeyValueStore};
use crate::store::{sort_timeline, AnnotationStore};
use crate::sync::{Envelope, RemoteEvent, Topic, Transport};
use crate::templates::TemplateSet;
use crate::threads::ThreadSet;

/// The annotation engine. Cheap to clone; clones share one core.
#[derive(Clone)]
pub struct AnnotationEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    core: RwLock<EngineCore>,
    observers: Mutex<ObserverSet>,
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    config: Config,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything behind the lock. `session` doubles as the liveness flag:
/// `None` between construction/dispose and the next `initialize`.
#[derive(Default)]
struct EngineCore {
    session: Option<StreamSession>,
    store: AnnotationStore,
    threads: ThreadSet,
    layers: LayerSet,
    templates: TemplateSet,
}

impl EngineCore {
    fn session(&self) -> Result<&StreamSession, EngineError> {
        self.session.as_ref().ok_or(EngineError::NotInitialized)
    }
}

impl AnnotationEngine {
    /// Build a dormant engine. Nothing runs until `initialize`.
    pub fn new(
        config: Config,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                core: RwLock::new(EngineCore::default()),
                observers: Mutex::new(ObserverSet::new()),
                storage,
                transport,
                config,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    // ==================== Lifecycle ====================

    /// Bring the engine live: resolve the session, load cached snapshots,
    /// and spawn the background tasks (inbound pump, reconcile request
    /// sweep when sync is enabled, expiry cleanup sweep).
    ///
    /// Needs a Tokio runtime. Calling on an already-live engine is an
    /// error; `dispose` first to change sessions.
    pub fn initialize(
        &self,
        stream_id: Option<String>,
        actor_id: Option<String>,
        actor_name: Option<String>,
    ) -> Result<StreamSession, EngineError> {
        let session = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            if core.session.is_some() {
                return Err(EngineError::InvalidInput(
                    "engine is already initialized".to_string(),
                ));
            }
            let session = StreamSession::resolve(&self.inner.config, stream_id, actor_id, actor_name);

            match cache::load_snapshot::<Vec<Annotation>>(
                self.inner.storage.as_ref(),
                &cache::annotations_key(&session.stream_id),
            ) {
                Ok(Some(annotations)) => core.store.load_records(annotations),
                Ok(None) => {}
                Err(e) => warn!("Failed to load annotation snapshot, starting empty: {e}"),
            }
            match cache::load_snapshot::<Vec<AnnotationLayer>>(
                self.inner.storage.as_ref(),
                &cache::layers_key(&session.actor_id),
            ) {
                Ok(Some(layers)) => core.layers.load_layers(layers),
                Ok(None) => {}
                Err(e) => warn!("Failed to load layer snapshot, starting empty: {e}"),
            }
            match cache::load_snapshot::<Vec<AnnotationTemplate>>(
                self.inner.storage.as_ref(),
                &cache::templates_key(),
            ) {
                Ok(Some(templates)) => core.templates.load_templates(templates),
                Ok(None) => {}
                Err(e) => warn!("Failed to load template snapshot, starting empty: {e}"),
            }
            core.threads = rebuild_threads(&core.store);
            core.session = Some(session.clone());
            session
        };

        let mut tasks = self.lock_tasks();
        if let Some(receiver) = self.inner.transport.subscribe() {
            tasks.push(self.spawn_pump(receiver));
        }
        if self.inner.config.sync_enabled {
            tasks.push(self.spawn_reconcile_sweep());
        }
        tasks.push(self.spawn_cleanup_sweep());
        drop(tasks);

        info!(
            "Annotation engine initialized for stream {} as {}",
            session.stream_id, session.actor_id
        );
        Ok(session)
    }

    /// Stop the background tasks, persist a final snapshot, and clear all
    /// in-memory state. The engine can be initialized again afterwards.
    pub fn dispose(&self) -> Result<(), EngineError> {
        let session = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            if core.session.is_none() {
                return Err(EngineError::NotInitialized);
            }
            self.persist_annotations(core);
            self.persist_layers(core);
            self.persist_templates(core);
            let session = core.session.take();
            core.store = AnnotationStore::new();
            core.threads = ThreadSet::new();
            core.layers = LayerSet::new();
            core.templates = TemplateSet::new();
            session
        };

        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
        *self.lock_observers() = ObserverSet::new();

        if let Some(session) = session {
            info!("Annotation engine disposed for stream {}", session.stream_id);
        }
        Ok(())
    }

    /// Register a synchronous observer for engine events. Observers are
    /// dropped on `dispose`.
    pub fn on_event(
        &self,
        observer: impl Fn(&EngineEvent) + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        self.read_core().session()?;
        self.lock_observers().register(observer);
        Ok(())
    }

    // ==================== Annotation Operations ====================

    /// Create an annotation from a draft authored by the session actor.
    pub fn create_annotation(&self, draft: AnnotationDraft) -> Result<Annotation, EngineError> {
        let (created, envelope) = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            let created = core.store.create(draft, &session)?;
            self.persist_annotations(core);
            let envelope = Envelope::create(&session.actor_id, &session.stream_id, &created);
            (created, envelope)
        };
        debug!("Created annotation {}", created.id);
        self.emit(&EngineEvent::Created(created.clone()));
        self.publish(envelope);
        Ok(created)
    }

    /// Apply a partial update. A patch whose status lands on `Deleted`
    /// removes the record and cascades like a delete.
    pub fn update_annotation(
        &self,
        id: Uuid,
        patch: AnnotationPatch,
    ) -> Result<Annotation, EngineError> {
        if patch.is_empty() {
            let core = self.read_core();
            core.session()?;
            return core
                .store
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("annotation", id));
        }
        let (updated, removed, envelope) = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            let updated = core.store.update(id, patch, &session.actor_id)?;
            let removed = !core.store.contains(id);
            if removed {
                core.threads.remove_parent(id);
                core.threads.remove_reply(id);
            }
            self.persist_annotations(core);
            let envelope = if removed {
                Envelope::delete(&session.actor_id, &session.stream_id, id)
            } else {
                Envelope::update(&session.actor_id, &session.stream_id, &updated)
            };
            (updated, removed, envelope)
        };
        if removed {
            self.emit(&EngineEvent::Deleted(id));
        } else {
            self.emit(&EngineEvent::Updated(updated.clone()));
        }
        self.publish(envelope);
        Ok(updated)
    }

    /// Delete an annotation. Its thread is destroyed; replies stay as
    /// ordinary annotations.
    pub fn delete_annotation(&self, id: Uuid) -> Result<(), EngineError> {
        let envelope = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            core.store.delete(id, &session.actor_id)?;
            let detached = core.threads.remove_parent(id);
            core.threads.remove_reply(id);
            if !detached.is_empty() {
                debug!("Detached {} replies from annotation {id}", detached.len());
            }
            self.persist_annotations(core);
            Envelope::delete(&session.actor_id, &session.stream_id, id)
        };
        self.emit(&EngineEvent::Deleted(id));
        self.publish(envelope);
        Ok(())
    }

    /// Append an interaction by the session actor.
    pub fn interact(
        &self,
        id: Uuid,
        kind: InteractionKind,
        data: Option<InteractionData>,
    ) -> Result<Annotation, EngineError> {
        let (updated, interaction, envelope) = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            let interaction = Interaction::new(&session.actor_id, kind, data);
            let updated = core
                .store
                .interact(id, interaction.clone(), &session.actor_id)?;
            self.persist_annotations(core);
            let envelope = Envelope::interact(
                &session.actor_id,
                &session.stream_id,
                id,
                interaction.clone(),
            );
            (updated, interaction, envelope)
        };
        self.emit(&EngineEvent::Interacted { id, interaction });
        self.publish(envelope);
        Ok(updated)
    }

    /// Reply to an annotation. The reply is a new annotation at the
    /// parent's timestamp and position, linked back to the parent, and the
    /// parent's thread records it.
    pub fn reply(
        &self,
        parent_id: Uuid,
        content: impl Into<String>,
    ) -> Result<Annotation, EngineError> {
        let content = content.into();
        let (reply, envelope) = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();

            let (timestamp, position, parent_author) = {
                let parent = core
                    .store
                    .get(parent_id)
                    .ok_or_else(|| EngineError::not_found("annotation", parent_id))?;
                if !access::can_reply(parent, &session.actor_id) {
                    return Err(EngineError::PermissionDenied {
                        action: "reply to annotation",
                    });
                }
                (parent.timestamp, parent.position, parent.actor_id.clone())
            };
            if core.threads.get(parent_id).is_some_and(Thread::is_locked) {
                return Err(EngineError::PermissionDenied {
                    action: "reply in locked thread",
                });
            }

            let draft = AnnotationDraft {
                content,
                timestamp,
                position: Some(position),
                linked: vec![parent_id],
                ..AnnotationDraft::default()
            };
            let reply = core.store.create(draft, &session)?;
            core.threads
                .record_reply(parent_id, &parent_author, reply.id, &reply.actor_id);
            self.persist_annotations(core);
            let envelope = Envelope::create(&session.actor_id, &session.stream_id, &reply);
            (reply, envelope)
        };
        self.emit(&EngineEvent::Replied {
            parent_id,
            reply: reply.clone(),
        });
        self.publish(envelope);
        Ok(reply)
    }

    /// Move an annotation through its lifecycle. `Deleted` removes the
    /// record and cascades like a delete.
    pub fn set_status(
        &self,
        id: Uuid,
        status: AnnotationStatus,
    ) -> Result<Annotation, EngineError> {
        let (updated, removed, envelope) = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            let updated = core.store.set_status(id, status, &session.actor_id)?;
            let removed = status == AnnotationStatus::Deleted;
            if removed {
                core.threads.remove_parent(id);
                core.threads.remove_reply(id);
            }
            self.persist_annotations(core);
            let envelope = if removed {
                Envelope::delete(&session.actor_id, &session.stream_id, id)
            } else {
                Envelope::update(&session.actor_id, &session.stream_id, &updated)
            };
            (updated, removed, envelope)
        };
        if removed {
            self.emit(&EngineEvent::Deleted(id));
        } else {
            self.emit(&EngineEvent::StatusChanged { id, status });
        }
        self.publish(envelope);
        Ok(updated)
    }

    /// Flag, lock, or clear a reply thread. Requires the same standing as
    /// a status change on the parent. Thread state is a local view and is
    /// not published.
    pub fn set_thread_moderation(
        &self,
        parent_id: Uuid,
        moderation: ThreadModeration,
    ) -> Result<(), EngineError> {
        let mut guard = self.write_core();
        let core = &mut *guard;
        let session = core.session()?.clone();
        {
            let parent = core
                .store
                .get(parent_id)
                .ok_or_else(|| EngineError::not_found("annotation", parent_id))?;
            if !access::can_set_status(parent, &session.actor_id) {
                return Err(EngineError::PermissionDenied {
                    action: "moderate thread",
                });
            }
        }
        if !core.threads.set_moderation(parent_id, moderation) {
            return Err(EngineError::not_found("thread", parent_id));
        }
        Ok(())
    }

    // ==================== Queries ====================

    /// One annotation by id, if the session actor may see it.
    pub fn get_annotation(&self, id: Uuid) -> Result<Annotation, EngineError> {
        let core = self.read_core();
        let session = core.session()?;
        let annotation = core
            .store
            .get(id)
            .ok_or_else(|| EngineError::not_found("annotation", id))?;
        if !access::is_visible_to(annotation, &session.actor_id, Utc::now()) {
            return Err(EngineError::not_found("annotation", id));
        }
        Ok(annotation.clone())
    }

    /// Annotations whose span covers the instant `t`, visible to the
    /// session actor, timeline ordered.
    pub fn annotations_at(&self, t: f64) -> Result<Vec<Annotation>, EngineError> {
        self.annotations_in_range(t, t)
    }

    /// Annotations overlapping `[start, end]` (bounds inclusive), visible
    /// to the session actor, timeline ordered.
    pub fn annotations_in_range(
        &self,
        start: f64,
        end: f64,
    ) -> Result<Vec<Annotation>, EngineError> {
        let core = self.read_core();
        let session = core.session()?;
        let now = Utc::now();
        Ok(core
            .store
            .query_by_time_range(start, end)?
            .into_iter()
            .filter(|a| access::is_visible_to(a, &session.actor_id, now))
            .cloned()
            .collect())
    }

    /// Faceted filter over everything the session actor may see.
    pub fn filter_annotations(
        &self,
        spec: &AnnotationFilter,
    ) -> Result<Vec<Annotation>, EngineError> {
        let core = self.read_core();
        let session = core.session()?;
        Ok(
            search::filter(&core.store, spec, &session.actor_id, Utc::now())
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Substring search over content, actor names, and tags, optionally
    /// intersected with a filter spec.
    pub fn search_annotations(
        &self,
        query: &str,
        spec: Option<&AnnotationFilter>,
    ) -> Result<Vec<Annotation>, EngineError> {
        let core = self.read_core();
        let session = core.session()?;
        Ok(
            search::search(&core.store, query, spec, &session.actor_id, Utc::now())
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// The reply thread under an annotation, if one exists.
    pub fn thread(&self, parent_id: Uuid) -> Result<Option<Thread>, EngineError> {
        let core = self.read_core();
        core.session()?;
        Ok(core.threads.get(parent_id).cloned())
    }

    // ==================== Layers ====================

    /// Create a visibility layer from a filter. The layer starts visible
    /// and is ordered after every existing layer.
    pub fn create_layer(
        &self,
        name: impl Into<String>,
        filter: AnnotationFilter,
    ) -> Result<AnnotationLayer, EngineError> {
        let layer = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            core.session()?;
            let layer = core.layers.create(name, filter, None, None)?;
            self.persist_layers(core);
            layer
        };
        self.emit(&EngineEvent::LayerCreated(layer.clone()));
        Ok(layer)
    }

    /// Flip a layer's visibility; returns the new state.
    pub fn toggle_layer(&self, id: Uuid) -> Result<bool, EngineError> {
        let visible = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            core.session()?;
            let visible = core.layers.toggle(id)?;
            self.persist_layers(core);
            visible
        };
        self.emit(&EngineEvent::LayerToggled { id, visible });
        Ok(visible)
    }

    /// All layers in z order.
    pub fn layers(&self) -> Result<Vec<AnnotationLayer>, EngineError> {
        let core = self.read_core();
        core.session()?;
        Ok(core.layers.ordered().into_iter().cloned().collect())
    }

    /// A layer's current members: its filter composed with visibility,
    /// computed against the live store.
    pub fn layer_members(&self, id: Uuid) -> Result<Vec<Annotation>, EngineError> {
        let core = self.read_core();
        let session = core.session()?;
        Ok(core
            .layers
            .members(id, &core.store, &session.actor_id, Utc::now())?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Mark a layer as the default, clearing any previous default.
    pub fn set_default_layer(&self, id: Uuid) -> Result<(), EngineError> {
        let mut guard = self.write_core();
        let core = &mut *guard;
        core.session()?;
        core.layers.set_default(id)?;
        self.persist_layers(core);
        Ok(())
    }

    /// Remove a layer. Annotations are untouched; membership was always
    /// computed.
    pub fn remove_layer(&self, id: Uuid) -> Result<(), EngineError> {
        let mut guard = self.write_core();
        let core = &mut *guard;
        core.session()?;
        core.layers.remove(id)?;
        self.persist_layers(core);
        Ok(())
    }

    // ==================== Templates ====================

    /// Add a reusable annotation template to the catalog.
    pub fn create_template(
        &self,
        template: AnnotationTemplate,
    ) -> Result<AnnotationTemplate, EngineError> {
        let mut guard = self.write_core();
        let core = &mut *guard;
        core.session()?;
        let template = core.templates.add(template)?;
        self.persist_templates(core);
        Ok(template)
    }

    /// Templates sorted by name.
    pub fn templates(&self) -> Result<Vec<AnnotationTemplate>, EngineError> {
        let core = self.read_core();
        core.session()?;
        Ok(core.templates.ordered().into_iter().cloned().collect())
    }

    /// Stamp an annotation from a template at `timestamp` and bump the
    /// template's usage counter.
    pub fn apply_template(
        &self,
        template_id: Uuid,
        timestamp: f64,
    ) -> Result<Annotation, EngineError> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "timestamp must be a non-negative number, got {timestamp}"
            )));
        }
        let (created, envelope) = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            let draft = core.templates.instantiate(template_id, timestamp)?;
            let created = core.store.create(draft, &session)?;
            self.persist_templates(core);
            self.persist_annotations(core);
            let envelope = Envelope::create(&session.actor_id, &session.stream_id, &created);
            (created, envelope)
        };
        self.emit(&EngineEvent::Created(created.clone()));
        self.publish(envelope);
        Ok(created)
    }

    // ==================== Interchange ====================

    /// Export annotations in `format`, optionally narrowed by a filter
    /// spec. Only records visible to the session actor are exported.
    pub fn export_annotations(
        &self,
        format: InterchangeFormat,
        spec: Option<&AnnotationFilter>,
    ) -> Result<String, EngineError> {
        let core = self.read_core();
        let session = core.session()?;
        let now = Utc::now();
        let selected: Vec<&Annotation> = match spec {
            Some(spec) => search::filter(&core.store, spec, &session.actor_id, now),
            None => {
                let mut all: Vec<&Annotation> = core
                    .store
                    .iter()
                    .filter(|a| access::is_visible_to(a, &session.actor_id, now))
                    .collect();
                sort_timeline(&mut all);
                all
            }
        };
        interchange::export(&selected, format)
    }

    /// Import annotations from `data`. Structured payloads land as full
    /// records (colliding ids are reassigned; `fresh_ids` reassigns all of
    /// them); subtitle payloads land as new comments by the session actor.
    /// Malformed entries are skipped and counted, not fatal.
    ///
    /// Imports are not published per record; peers converge through the
    /// reconcile exchange.
    pub fn import_annotations(
        &self,
        data: &str,
        format: InterchangeFormat,
        options: ImportOptions,
    ) -> Result<ImportOutcome, EngineError> {
        let outcome = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();

            let outcome = match format {
                InterchangeFormat::Structured => {
                    let annotations = interchange::structured::import(data)?;
                    let attempted = annotations.len();
                    let mut imported = 0;
                    for mut annotation in annotations {
                        if options.fresh_ids || core.store.contains(annotation.id) {
                            annotation.id = Uuid::new_v4();
                        }
                        annotation.stream_id = session.stream_id.clone();
                        match core.store.upsert_remote(annotation) {
                            Ok(()) => imported += 1,
                            Err(e) => debug!("Skipping imported annotation: {e}"),
                        }
                    }
                    ImportOutcome {
                        imported,
                        attempted,
                    }
                }
                InterchangeFormat::Srt | InterchangeFormat::Vtt => {
                    let parsed = interchange::subtitle::import(data);
                    let attempted = parsed.attempted;
                    let mut imported = 0;
                    for draft in parsed.drafts {
                        match core.store.create(draft, &session) {
                            Ok(_) => imported += 1,
                            Err(e) => debug!("Skipping imported cue: {e}"),
                        }
                    }
                    ImportOutcome {
                        imported,
                        attempted,
                    }
                }
                InterchangeFormat::Tabular => {
                    return Err(EngineError::UnsupportedFormat(
                        "tabular import".to_string(),
                    ));
                }
            };
            core.threads = rebuild_threads(&core.store);
            self.persist_annotations(core);
            outcome
        };
        info!(
            "Imported {}/{} annotations",
            outcome.imported, outcome.attempted
        );
        self.emit(&EngineEvent::Imported(outcome));
        Ok(outcome)
    }

    // ==================== Analytics & Status ====================

    /// Fold the live store into an analytics snapshot.
    pub fn analytics(&self) -> Result<AnnotationAnalytics, EngineError> {
        let core = self.read_core();
        core.session()?;
        Ok(AnnotationAnalytics::compute(core.store.iter()))
    }

    /// The live session identity.
    pub fn session(&self) -> Result<StreamSession, EngineError> {
        let core = self.read_core();
        Ok(core.session()?.clone())
    }

    pub fn annotation_count(&self) -> Result<usize, EngineError> {
        let core = self.read_core();
        core.session()?;
        Ok(core.store.len())
    }

    pub fn is_live(&self) -> bool {
        self.read_core().session.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ==================== Remote Application ====================

    /// Decode and apply one inbound envelope. Also the pump task's entry
    /// point. Own echoes and foreign streams are ignored; events apply in
    /// arrival order with the last writer winning.
    pub fn apply_remote(&self, bytes: &[u8]) -> Result<(), EngineError> {
        self.apply_envelope(Envelope::decode(bytes)?)
    }

    fn apply_envelope(&self, envelope: Envelope) -> Result<(), EngineError> {
        let topic = envelope.topic;
        let outbound = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            let session = core.session()?.clone();
            if envelope.sender_id == session.actor_id || envelope.stream_id != session.stream_id {
                return Ok(());
            }

            let mut outbound = None;
            match envelope.decode_event()? {
                RemoteEvent::Create(annotation) => {
                    let reply_id = annotation.id;
                    let reply_actor = annotation.actor_id.clone();
                    let linked = annotation.metadata.linked.clone();
                    core.store.upsert_remote(annotation)?;
                    for parent_id in linked {
                        if let Some(parent) = core.store.get(parent_id) {
                            let parent_author = parent.actor_id.clone();
                            core.threads.record_reply(
                                parent_id,
                                &parent_author,
                                reply_id,
                                &reply_actor,
                            );
                        }
                    }
                }
                RemoteEvent::Update(annotation) => {
                    core.store.upsert_remote(annotation)?;
                }
                RemoteEvent::Delete(id) => {
                    core.store.remove_remote(id);
                    core.threads.remove_parent(id);
                    core.threads.remove_reply(id);
                }
                RemoteEvent::Interact { id, interaction } => {
                    if let Err(e) = core.store.interact_remote(id, interaction) {
                        debug!("Dropping interaction for unknown annotation: {e}");
                    }
                }
                RemoteEvent::ReconcileRequest => {
                    debug!("Answering reconcile request from {}", envelope.sender_id);
                    outbound = Some(Envelope::reconcile_state(
                        &session.actor_id,
                        &session.stream_id,
                        core.store.snapshot(),
                    ));
                }
                RemoteEvent::ReconcileState(annotations) => {
                    debug!(
                        "Reconciling {} annotations from {}",
                        annotations.len(),
                        envelope.sender_id
                    );
                    for annotation in annotations {
                        if let Err(e) = core.store.upsert_remote(annotation) {
                            debug!("Skipping reconciled annotation: {e}");
                        }
                    }
                    core.threads = rebuild_threads(&core.store);
                }
            }
            if topic != Topic::ReconcileRequest {
                self.persist_annotations(core);
            }
            outbound
        };

        if let Some(envelope) = outbound {
            self.publish(envelope);
        }
        self.emit(&EngineEvent::RemoteApplied { topic });
        Ok(())
    }

    // ==================== Internals ====================

    fn read_core(&self) -> RwLockReadGuard<'_, EngineCore> {
        self.inner.core.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_core(&self) -> RwLockWriteGuard<'_, EngineCore> {
        self.inner.core.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_observers(&self) -> std::sync::MutexGuard<'_, ObserverSet> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Notify observers outside any lock, so a callback may call back into
    /// the engine.
    fn emit(&self, event: &EngineEvent) {
        let observers = self.lock_observers().snapshot();
        for observer in &observers {
            observer(event);
        }
    }

    fn publish(&self, envelope: Envelope) {
        let topic = envelope.topic;
        if let Err(e) = self.inner.transport.publish(envelope) {
            warn!("Failed to publish {topic:?} envelope: {e}");
        }
    }

    fn persist_annotations(&self, core: &EngineCore) {
        let Some(session) = &core.session else { return };
        let key = cache::annotations_key(&session.stream_id);
        if let Err(e) = cache::save_snapshot(self.inner.storage.as_ref(), &key, &core.store.snapshot())
        {
            warn!("Failed to persist annotation snapshot: {e}");
        }
    }

    fn persist_layers(&self, core: &EngineCore) {
        let Some(session) = &core.session else { return };
        let key = cache::layers_key(&session.actor_id);
        if let Err(e) =
            cache::save_snapshot(self.inner.storage.as_ref(), &key, &core.layers.snapshot())
        {
            warn!("Failed to persist layer snapshot: {e}");
        }
    }

    fn persist_templates(&self, core: &EngineCore) {
        if core.session.is_none() {
            return;
        }
        let key = cache::templates_key();
        if let Err(e) =
            cache::save_snapshot(self.inner.storage.as_ref(), &key, &core.templates.snapshot())
        {
            warn!("Failed to persist template snapshot: {e}");
        }
    }

    fn spawn_pump(&self, mut receiver: tokio::sync::mpsc::UnboundedReceiver<Envelope>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                if let Err(e) = engine.apply_envelope(envelope) {
                    warn!("Failed to apply inbound envelope: {e}");
                }
            }
            debug!("Inbound transport channel closed");
        })
    }

    fn spawn_reconcile_sweep(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let period = Duration::from_secs(self.inner.config.reconcile_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.request_reconcile();
            }
        })
    }

    fn spawn_cleanup_sweep(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let period = Duration::from_secs(self.inner.config.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.sweep_expired();
            }
        })
    }

    fn request_reconcile(&self) {
        let envelope = {
            let core = self.read_core();
            let Some(session) = &core.session else { return };
            Envelope::reconcile_request(&session.actor_id, &session.stream_id)
        };
        debug!("Requesting reconciliation");
        self.publish(envelope);
    }

    /// Remove every record whose `expires_at` has passed, emitting one
    /// batch `Expired` event. Expiry is not published; peers sweep on
    /// their own clocks.
    fn sweep_expired(&self) {
        let expired: Vec<Uuid> = {
            let mut guard = self.write_core();
            let core = &mut *guard;
            if core.session.is_none() {
                return;
            }
            let removed = core.store.remove_expired(Utc::now());
            if removed.is_empty() {
                return;
            }
            for annotation in &removed {
                core.threads.remove_parent(annotation.id);
                core.threads.remove_reply(annotation.id);
            }
            self.persist_annotations(core);
            removed.into_iter().map(|a| a.id).collect()
        };
        info!("Expired {} annotations", expired.len());
        self.emit(&EngineEvent::Expired(expired));
    }
}

/// Rebuild reply threads from `linked` metadata after a bulk load. Threads
/// are a projection of the store, never persisted on their own.
fn rebuild_threads(store: &AnnotationStore) -> ThreadSet {
    let mut threads = ThreadSet::new();
    let mut replies: Vec<&Annotation> = store
        .iter()
        .filter(|a| !a.metadata.linked.is_empty())
        .collect();
    replies.sort_by_key(|a| a.created_at);
    for reply in replies {
        for parent_id in &reply.metadata.linked {
            if let Some(parent) = store.get(*parent_id) {
                let parent_author = parent.actor_id.clone();
                threads.record_reply(*parent_id, &parent_author, reply.id, &reply.actor_id);
            }
        }
    }
    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationKind;
    use crate::storage::MemoryStore;
    use crate::sync::{ChannelTransport, NoopTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn offline_engine() -> AnnotationEngine {
        offline_engine_with(Arc::new(MemoryStore::new()))
    }

    fn offline_engine_with(storage: Arc<MemoryStore>) -> AnnotationEngine {
        AnnotationEngine::new(Config::default(), storage, Arc::new(NoopTransport))
    }

    fn live(engine: &AnnotationEngine, actor: &str, name: &str) -> StreamSession {
        engine
            .initialize(
                Some("stream-1".to_string()),
                Some(actor.to_string()),
                Some(name.to_string()),
            )
            .unwrap()
    }

    async fn wait_until(condition: impl Fn() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_operations_require_initialize() {
        let engine = offline_engine();
        assert!(!engine.is_live());

        let err = engine
            .create_annotation(AnnotationDraft::comment("early", 1.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        assert!(matches!(
            engine.annotations_at(1.0),
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(
            engine.analytics(),
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(engine.dispose(), Err(EngineError::NotInitialized)));

        live(&engine, "actor-1", "Alice");
        assert!(engine.is_live());

        // Second initialize on a live engine is rejected
        let err = engine
            .initialize(None, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_then_query_containment() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        engine
            .create_annotation(AnnotationDraft::comment("nice shot", 125.0).with_duration(4.0))
            .unwrap();

        assert_eq!(engine.annotations_at(127.0).unwrap().len(), 1);
        assert_eq!(engine.annotations_at(125.0).unwrap().len(), 1);
        assert_eq!(engine.annotations_at(129.0).unwrap().len(), 1);
        assert!(engine.annotations_at(130.1).unwrap().is_empty());
        assert_eq!(engine.annotations_in_range(120.0, 126.0).unwrap().len(), 1);
        assert_eq!(engine.annotation_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_records_edit_history() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let a = engine
            .create_annotation(AnnotationDraft::comment("first", 10.0))
            .unwrap();
        let updated = engine
            .update_annotation(
                a.id,
                AnnotationPatch {
                    content: Some("second".to_string()),
                    ..AnnotationPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.content, "second");
        assert_eq!(updated.metadata.edits.len(), 1);
        assert_eq!(updated.metadata.edits[0].previous_content, "first");
    }

    #[tokio::test]
    async fn test_update_landing_on_deleted_removes() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let a = engine
            .create_annotation(AnnotationDraft::comment("short", 10.0))
            .unwrap();
        let last = engine
            .update_annotation(
                a.id,
                AnnotationPatch {
                    status: Some(AnnotationStatus::Deleted),
                    ..AnnotationPatch::default()
                },
            )
            .unwrap();

        assert_eq!(last.status, AnnotationStatus::Deleted);
        assert_eq!(engine.annotation_count().unwrap(), 0);
        assert!(matches!(
            engine.get_annotation(a.id),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleted_ids_do_not_come_back() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let a = engine
            .create_annotation(AnnotationDraft::comment("gone soon", 10.0))
            .unwrap();
        engine.delete_annotation(a.id).unwrap();

        assert!(matches!(
            engine.update_annotation(a.id, AnnotationPatch::default()),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.set_status(a.id, AnnotationStatus::Hidden),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.reply(a.id, "too late"),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reply_threads_track_replies() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let parent = engine
            .create_annotation(AnnotationDraft::comment("parent", 42.0))
            .unwrap();
        let reply = engine.reply(parent.id, "totally agree").unwrap();

        assert_eq!(reply.timestamp, parent.timestamp);
        assert_eq!(reply.metadata.linked, vec![parent.id]);

        let thread = engine.thread(parent.id).unwrap().unwrap();
        assert_eq!(thread.total_replies, 1);
        assert_eq!(thread.replies, vec![reply.id]);
        assert!(thread.participants.contains("actor-1"));

        // Deleting the parent destroys the thread but detaches the reply
        engine.delete_annotation(parent.id).unwrap();
        assert!(engine.thread(parent.id).unwrap().is_none());
        assert_eq!(engine.annotation_count().unwrap(), 1);
        assert!(engine.get_annotation(reply.id).is_ok());
    }

    #[tokio::test]
    async fn test_locked_thread_refuses_replies() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let parent = engine
            .create_annotation(AnnotationDraft::comment("contentious", 10.0))
            .unwrap();
        engine.reply(parent.id, "hot take").unwrap();
        engine
            .set_thread_moderation(parent.id, ThreadModeration::Locked)
            .unwrap();

        let err = engine.reply(parent.id, "more fuel").unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        engine
            .set_thread_moderation(parent.id, ThreadModeration::Clean)
            .unwrap();
        assert!(engine.reply(parent.id, "calmer now").is_ok());
    }

    #[tokio::test]
    async fn test_status_change_emits_and_deleted_removes() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let a = engine
            .create_annotation(AnnotationDraft::comment("note", 10.0))
            .unwrap();

        let hidden = engine.set_status(a.id, AnnotationStatus::Hidden).unwrap();
        assert_eq!(hidden.status, AnnotationStatus::Hidden);

        engine.set_status(a.id, AnnotationStatus::Active).unwrap();
        engine.set_status(a.id, AnnotationStatus::Deleted).unwrap();
        assert_eq!(engine.annotation_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_interactions_feed_analytics() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let a = engine
            .create_annotation(AnnotationDraft::comment("popular", 10.0))
            .unwrap();
        engine.interact(a.id, InteractionKind::Like, None).unwrap();
        engine
            .interact(
                a.id,
                InteractionKind::Reaction,
                Some(InteractionData::Reaction {
                    emoji: "🔥".to_string(),
                }),
            )
            .unwrap();

        let analytics = engine.analytics().unwrap();
        assert_eq!(analytics.total, 1);
        assert_eq!(analytics.engagement_rate, 2.0);
        assert_eq!(
            analytics.interactions_by_kind.get(&InteractionKind::Like),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn test_layers_compute_membership_against_live_store() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let q = engine
            .create_annotation(
                AnnotationDraft::comment("why though", 10.0).with_kind(AnnotationKind::Question),
            )
            .unwrap();
        engine
            .create_annotation(AnnotationDraft::comment("plain", 20.0))
            .unwrap();

        let layer = engine
            .create_layer(
                "questions",
                AnnotationFilter::default().with_kind(AnnotationKind::Question),
            )
            .unwrap();
        assert!(layer.is_visible);

        let members = engine.layer_members(layer.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, q.id);

        // Membership follows deletions because it is always computed
        engine.delete_annotation(q.id).unwrap();
        assert!(engine.layer_members(layer.id).unwrap().is_empty());

        assert!(!engine.toggle_layer(layer.id).unwrap());
        assert!(engine.toggle_layer(layer.id).unwrap());

        engine.set_default_layer(layer.id).unwrap();
        assert!(engine.layers().unwrap()[0].is_default);

        engine.remove_layer(layer.id).unwrap();
        assert!(engine.layers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_templates_stamp_annotations_and_count_usage() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let template = engine
            .create_template(
                AnnotationTemplate::new("goal", AnnotationKind::Highlight, "GOAL!")
                    .with_tag("sports"),
            )
            .unwrap();

        let stamped = engine.apply_template(template.id, 88.5).unwrap();
        assert_eq!(stamped.kind, AnnotationKind::Highlight);
        assert_eq!(stamped.content, "GOAL!");
        assert_eq!(stamped.timestamp, 88.5);
        assert!(stamped.metadata.tags.contains("sports"));

        engine.apply_template(template.id, 91.0).unwrap();
        assert_eq!(engine.templates().unwrap()[0].usage_count, 2);

        let err = engine.apply_template(template.id, -1.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        // The failed stamp did not bump the counter
        assert_eq!(engine.templates().unwrap()[0].usage_count, 2);
    }

    #[tokio::test]
    async fn test_structured_export_import_roundtrip() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        engine
            .create_annotation(
                AnnotationDraft::comment("first", 10.0)
                    .with_duration(2.5)
                    .with_tag("vip"),
            )
            .unwrap();
        engine
            .create_annotation(AnnotationDraft::comment("second", 20.0))
            .unwrap();

        let exported = engine
            .export_annotations(InterchangeFormat::Structured, None)
            .unwrap();

        // Colliding ids are reassigned, so re-import duplicates the records
        let outcome = engine
            .import_annotations(&exported, InterchangeFormat::Structured, ImportOptions::default())
            .unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.attempted, 2);
        assert_eq!(engine.annotation_count().unwrap(), 4);

        // A fresh engine preserves the original ids
        let other = offline_engine();
        live(&other, "actor-2", "Bobbie");
        other
            .import_annotations(&exported, InterchangeFormat::Structured, ImportOptions::default())
            .unwrap();
        let restored = other.annotations_in_range(0.0, 100.0).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].content, "first");
        assert!(restored[0].metadata.tags.contains("vip"));
    }

    #[tokio::test]
    async fn test_subtitle_import_lands_as_comments() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let srt = "1\r\n00:00:10,000 --> 00:00:13,000\r\nGreat opening\r\n\r\n2\r\n00:00:20,500 --> 00:00:23,500\r\nKey moment here\r\n\r\n";
        let outcome = engine
            .import_annotations(srt, InterchangeFormat::Srt, ImportOptions::default())
            .unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.attempted, 2);

        let hits = engine.annotations_at(11.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Great opening");
        assert_eq!(hits[0].kind, AnnotationKind::Comment);

        // Round trip back out is byte identical
        let re_exported = engine
            .export_annotations(InterchangeFormat::Srt, None)
            .unwrap();
        assert_eq!(re_exported, srt);
    }

    #[tokio::test]
    async fn test_tabular_import_is_unsupported() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let err = engine
            .import_annotations("id,kind\n", InterchangeFormat::Tabular, ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_observers_see_mutations_in_order() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine
            .on_event(move |event| {
                let label = match event {
                    EngineEvent::Created(_) => "created",
                    EngineEvent::Updated(_) => "updated",
                    EngineEvent::Deleted(_) => "deleted",
                    EngineEvent::Replied { .. } => "replied",
                    _ => "other",
                };
                sink.lock().unwrap().push(label);
            })
            .unwrap();

        let a = engine
            .create_annotation(AnnotationDraft::comment("watched", 5.0))
            .unwrap();
        engine
            .update_annotation(
                a.id,
                AnnotationPatch {
                    content: Some("still watched".to_string()),
                    ..AnnotationPatch::default()
                },
            )
            .unwrap();
        engine.reply(a.id, "me too").unwrap();
        engine.delete_annotation(a.id).unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["created", "updated", "replied", "deleted"]);
    }

    #[tokio::test]
    async fn test_expiry_sweep_removes_and_notifies() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let expired_seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&expired_seen);
        engine
            .on_event(move |event| {
                if let EngineEvent::Expired(ids) = event {
                    counter.fetch_add(ids.len(), Ordering::SeqCst);
                }
            })
            .unwrap();

        engine
            .create_annotation(AnnotationDraft::comment("stays", 1.0))
            .unwrap();
        engine
            .create_annotation(AnnotationDraft {
                expires_at: Some(Utc::now() - chrono::Duration::seconds(10)),
                ..AnnotationDraft::comment("flash sale", 2.0)
            })
            .unwrap();

        engine.sweep_expired();
        assert_eq!(engine.annotation_count().unwrap(), 1);
        assert_eq!(expired_seen.load(Ordering::SeqCst), 1);

        // Idle sweep emits nothing
        engine.sweep_expired();
        assert_eq!(expired_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispose_persists_and_reinitialize_restores() {
        let storage = Arc::new(MemoryStore::new());
        let engine = offline_engine_with(Arc::clone(&storage));
        live(&engine, "actor-1", "Alice");

        let parent = engine
            .create_annotation(AnnotationDraft::comment("kept", 30.0))
            .unwrap();
        engine.reply(parent.id, "also kept").unwrap();
        engine
            .create_layer("everything", AnnotationFilter::default())
            .unwrap();

        engine.dispose().unwrap();
        assert!(!engine.is_live());
        assert!(matches!(
            engine.annotation_count(),
            Err(EngineError::NotInitialized)
        ));

        live(&engine, "actor-1", "Alice");
        assert_eq!(engine.annotation_count().unwrap(), 2);
        assert_eq!(engine.layers().unwrap().len(), 1);

        // Threads come back as a projection of the linked metadata
        let thread = engine.thread(parent.id).unwrap().unwrap();
        assert_eq!(thread.total_replies, 1);
        assert!(thread.participants.contains("actor-1"));
    }

    #[tokio::test]
    async fn test_two_engines_converge_over_loopback() {
        let (transport_a, transport_b) = ChannelTransport::pair();
        let engine_a = AnnotationEngine::new(
            Config::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(transport_a),
        );
        let engine_b = AnnotationEngine::new(
            Config::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(transport_b),
        );
        live(&engine_a, "actor-a", "Anne");
        live(&engine_b, "actor-b", "Beau");

        // Create on A arrives at B
        let note = engine_a
            .create_annotation(AnnotationDraft::comment("from A", 10.0))
            .unwrap();
        assert!(
            wait_until(|| engine_b.annotation_count().unwrap_or(0) == 1).await,
            "create never arrived"
        );

        // B cannot edit A's record locally
        let err = engine_b
            .update_annotation(
                note.id,
                AnnotationPatch {
                    content: Some("hijacked".to_string()),
                    ..AnnotationPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        // But B can interact, and the interaction flows back to A
        engine_b
            .interact(note.id, InteractionKind::Like, None)
            .unwrap();
        assert!(
            wait_until(|| {
                engine_a
                    .get_annotation(note.id)
                    .map(|a| a.interactions.len() == 1)
                    .unwrap_or(false)
            })
            .await,
            "interaction never arrived"
        );

        // A's edit wins on B wholesale
        engine_a
            .update_annotation(
                note.id,
                AnnotationPatch {
                    content: Some("revised on A".to_string()),
                    ..AnnotationPatch::default()
                },
            )
            .unwrap();
        assert!(
            wait_until(|| {
                engine_b
                    .get_annotation(note.id)
                    .map(|a| a.content == "revised on A")
                    .unwrap_or(false)
            })
            .await,
            "update never arrived"
        );

        // Delete on A empties B
        engine_a.delete_annotation(note.id).unwrap();
        assert!(
            wait_until(|| engine_b.annotation_count().unwrap_or(1) == 0).await,
            "delete never arrived"
        );
    }

    #[tokio::test]
    async fn test_reconcile_request_is_answered_with_full_state() {
        let (transport_a, transport_b) = ChannelTransport::pair();
        let engine = AnnotationEngine::new(
            Config::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(transport_a),
        );
        live(&engine, "actor-a", "Anne");
        let mut peer_rx = transport_b.subscribe().unwrap();

        engine
            .create_annotation(AnnotationDraft::comment("state", 10.0))
            .unwrap();
        let create = tokio::time::timeout(Duration::from_secs(2), peer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(create.topic, Topic::Create);

        transport_b
            .publish(Envelope::reconcile_request("actor-b", "stream-1"))
            .unwrap();
        let state = tokio::time::timeout(Duration::from_secs(2), peer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.topic, Topic::ReconcileState);

        match state.decode_event().unwrap() {
            RemoteEvent::ReconcileState(annotations) => {
                assert_eq!(annotations.len(), 1);
                assert_eq!(annotations[0].content, "state");
            }
            other => panic!("expected reconcile state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_own_echoes_and_foreign_streams_are_ignored() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let foreign = Annotation::new(
            "stream-2",
            "actor-9",
            "Nine",
            AnnotationKind::Comment,
            "wrong stream",
            5.0,
        );
        engine
            .apply_remote(&Envelope::create("actor-9", "stream-2", &foreign).encode())
            .unwrap();
        assert_eq!(engine.annotation_count().unwrap(), 0);

        let echoed = Annotation::new(
            "stream-1",
            "actor-1",
            "Alice",
            AnnotationKind::Comment,
            "own echo",
            5.0,
        );
        engine
            .apply_remote(&Envelope::create("actor-1", "stream-1", &echoed).encode())
            .unwrap();
        assert_eq!(engine.annotation_count().unwrap(), 0);

        // A proper remote create lands
        let remote = Annotation::new(
            "stream-1",
            "actor-2",
            "Bobbie",
            AnnotationKind::Comment,
            "real one",
            5.0,
        );
        engine
            .apply_remote(&Envelope::create("actor-2", "stream-1", &remote).encode())
            .unwrap();
        assert_eq!(engine.annotation_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dispose_drops_observers() {
        let engine = offline_engine();
        live(&engine, "actor-1", "Alice");

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        engine
            .on_event(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        engine
            .create_annotation(AnnotationDraft::comment("seen", 1.0))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        engine.dispose().unwrap();
        live(&engine, "actor-1", "Alice");
        engine
            .create_annotation(AnnotationDraft::comment("unseen", 2.0))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
