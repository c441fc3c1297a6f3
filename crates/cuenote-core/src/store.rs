//! In-memory annotation store with a time-range index.
//!
//! Single source of truth for annotation records. Lookups by id go through a
//! `HashMap`; timeline queries go through a `BTreeMap` keyed by start time in
//! milliseconds. Because spans can begin long before the queried window, the
//! index also tracks the largest duration ever stored and widens range scans
//! by that much before the exact overlap filter runs.
//!
//! Checked mutations (`create`, `update`, `delete`, `interact`,
//! `set_status`) enforce permissions and validation. The `*_remote` variants
//! skip both for inbound sync payloads, which were checked at their origin.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::access;
use crate::error::EngineError;
use crate::model::{
    Annotation, AnnotationDraft, AnnotationKind, AnnotationPatch, AnnotationStatus, Interaction,
};
use crate::session::StreamSession;

/// Indexed collection of annotations for one stream.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    records: HashMap<Uuid, Annotation>,
    /// Start-time index: millisecond key to the ids anchored there.
    time_index: BTreeMap<u64, Vec<Uuid>>,
    /// Widest duration ever stored, in milliseconds. Never shrinks; range
    /// scans over-approximate and the overlap filter prunes.
    max_duration_ms: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an annotation from a draft, applying engine defaults for
    /// everything the draft leaves out. The author is always granted edit
    /// rights on their own record, even over caller-supplied permissions.
    pub fn create(
        &mut self,
        draft: AnnotationDraft,
        session: &StreamSession,
    ) -> Result<Annotation, EngineError> {
        validate_content(&draft.content)?;
        validate_time(draft.timestamp, "timestamp")?;
        if let Some(duration) = draft.duration {
            validate_time(duration, "duration")?;
        }

        let mut annotation = Annotation::new(
            &session.stream_id,
            &session.actor_id,
            &session.actor_name,
            draft.kind.unwrap_or(AnnotationKind::Comment),
            draft.content,
            draft.timestamp,
        );
        annotation.duration = draft.duration;
        if let Some(position) = draft.position {
            annotation.position = position;
        }
        if let Some(style) = draft.style {
            annotation.style = style;
        }
        annotation.metadata.tags = draft.tags;
        if let Some(priority) = draft.priority {
            annotation.metadata.priority = priority;
        }
        if let Some(source) = draft.source {
            annotation.metadata.source = source;
        }
        annotation.metadata.category = draft.category;
        annotation.metadata.language = draft.language;
        annotation.metadata.scores = draft.scores;
        annotation.metadata.linked = draft.linked;
        if let Some(visibility) = draft.visibility {
            annotation.visibility = visibility;
        }
        if let Some(permissions) = draft.permissions {
            annotation.permissions = permissions;
            annotation
                .permissions
                .editable_by
                .insert(session.actor_id.clone());
        }
        annotation.expires_at = draft.expires_at;

        self.insert(annotation.clone());
        Ok(annotation)
    }

    /// Apply a partial update. Everything in the patch is validated before
    /// any field is written, so a failed update leaves the record untouched.
    ///
    /// A content change appends an edit-history entry carrying the previous
    /// content. A status change runs the transition table; a patch landing
    /// on `Deleted` removes the record, and the returned snapshot is its
    /// final state.
    pub fn update(
        &mut self,
        id: Uuid,
        patch: AnnotationPatch,
        actor_id: &str,
    ) -> Result<Annotation, EngineError> {
        let changed = patch.changed_fields();
        if changed.is_empty() {
            return self
                .records
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("annotation", id));
        }

        {
            let annotation = self
                .records
                .get(&id)
                .ok_or_else(|| EngineError::not_found("annotation", id))?;
            if !access::can_edit(annotation, actor_id) {
                return Err(EngineError::PermissionDenied {
                    action: "edit annotation",
                });
            }
            if let Some(timestamp) = patch.timestamp {
                validate_time(timestamp, "timestamp")?;
            }
            if let Some(duration) = patch.duration {
                validate_time(duration, "duration")?;
            }
            if let Some(content) = &patch.content {
                validate_content(content)?;
            }
            if let Some(target) = patch.status {
                annotation.status.can_transition_to(target)?;
            }
        }

        let old_timestamp;
        let snapshot;
        {
            let annotation = self
                .records
                .get_mut(&id)
                .ok_or_else(|| EngineError::not_found("annotation", id))?;
            old_timestamp = annotation.timestamp;

            if let Some(content) = patch.content {
                let previous = std::mem::replace(&mut annotation.content, content);
                annotation.record_edit(previous, changed);
            }
            if let Some(timestamp) = patch.timestamp {
                annotation.timestamp = timestamp;
            }
            if let Some(duration) = patch.duration {
                annotation.duration = Some(duration);
            }
            if let Some(position) = patch.position {
                annotation.position = position;
            }
            if let Some(style) = patch.style {
                annotation.style = style;
            }
            if let Some(tags) = patch.tags {
                annotation.metadata.tags = tags;
            }
            if let Some(priority) = patch.priority {
                annotation.metadata.priority = priority;
            }
            if let Some(category) = patch.category {
                annotation.metadata.category = Some(category);
            }
            if let Some(language) = patch.language {
                annotation.metadata.language = Some(language);
            }
            if let Some(status) = patch.status {
                annotation.status = status;
            }
            if let Some(visibility) = patch.visibility {
                annotation.visibility = visibility;
            }
            if let Some(expires_at) = patch.expires_at {
                annotation.expires_at = expires_at;
            }
            annotation.touch();

            snapshot = annotation.clone();
        }

        if to_millis(snapshot.timestamp) != to_millis(old_timestamp) {
            self.unindex(id, old_timestamp);
            self.time_index
                .entry(to_millis(snapshot.timestamp))
                .or_default()
                .push(id);
        }
        self.track_duration(snapshot.duration);

        if snapshot.status == AnnotationStatus::Deleted {
            self.take(id);
        }
        Ok(snapshot)
    }

    /// Remove an annotation after a `can_delete` check. Returns the removed
    /// record so the caller can cascade threads and emit events.
    pub fn delete(&mut self, id: Uuid, actor_id: &str) -> Result<Annotation, EngineError> {
        {
            let annotation = self
                .records
                .get(&id)
                .ok_or_else(|| EngineError::not_found("annotation", id))?;
            if !access::can_delete(annotation, actor_id) {
                return Err(EngineError::PermissionDenied {
                    action: "delete annotation",
                });
            }
        }
        self.take(id)
            .ok_or_else(|| EngineError::not_found("annotation", id))
    }

    /// Append an interaction after a `can_interact` check.
    pub fn interact(
        &mut self,
        id: Uuid,
        interaction: Interaction,
        actor_id: &str,
    ) -> Result<Annotation, EngineError> {
        let annotation = self
            .records
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("annotation", id))?;
        if !access::can_interact(annotation, actor_id) {
            return Err(EngineError::PermissionDenied {
                action: "interact with annotation",
            });
        }
        annotation.add_interaction(interaction);
        Ok(annotation.clone())
    }

    /// Change lifecycle status. Allowed to the record's author or a
    /// moderator; the transition must be in the lifecycle table. `Deleted`
    /// through this path removes the record physically.
    pub fn set_status(
        &mut self,
        id: Uuid,
        status: AnnotationStatus,
        actor_id: &str,
    ) -> Result<Annotation, EngineError> {
        {
            let annotation = self
                .records
                .get(&id)
                .ok_or_else(|| EngineError::not_found("annotation", id))?;
            if !access::can_set_status(annotation, actor_id) {
                return Err(EngineError::PermissionDenied {
                    action: "change annotation status",
                });
            }
            annotation.status.can_transition_to(status)?;
        }

        if status == AnnotationStatus::Deleted {
            let mut removed = self
                .take(id)
                .ok_or_else(|| EngineError::not_found("annotation", id))?;
            removed.status = AnnotationStatus::Deleted;
            removed.touch();
            return Ok(removed);
        }

        let annotation = self
            .records
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("annotation", id))?;
        annotation.status = status;
        annotation.touch();
        Ok(annotation.clone())
    }

    pub fn get(&self, id: Uuid) -> Option<&Annotation> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.contains_key(&id)
    }

    /// All annotations whose `[timestamp, end_time]` interval overlaps
    /// `[start, end]`, bounds inclusive on both sides. Sorted by timestamp
    /// ascending, ties broken by creation time.
    pub fn query_by_time_range(
        &self,
        start: f64,
        end: f64,
    ) -> Result<Vec<&Annotation>, EngineError> {
        validate_time(start, "range start")?;
        validate_time(end, "range end")?;
        if start > end {
            return Err(EngineError::InvalidInput(format!(
                "range start {start} is after range end {end}"
            )));
        }

        let lo = to_millis(start).saturating_sub(self.max_duration_ms);
        let hi = to_millis(end);

        let mut hits: Vec<&Annotation> = Vec::new();
        for ids in self.time_index.range(lo..=hi).map(|(_, ids)| ids) {
            for id in ids {
                if let Some(annotation) = self.records.get(id) {
                    if annotation.overlaps(start, end) {
                        hits.push(annotation);
                    }
                }
            }
        }
        sort_timeline(&mut hits);
        Ok(hits)
    }

    /// Annotations covering the instant `t`.
    pub fn query_at(&self, t: f64) -> Result<Vec<&Annotation>, EngineError> {
        self.query_by_time_range(t, t)
    }

    /// Unchecked insert-or-replace for inbound sync. Last writer wins: the
    /// incoming record replaces any local copy wholesale.
    pub fn upsert_remote(&mut self, annotation: Annotation) -> Result<(), EngineError> {
        validate_time(annotation.timestamp, "timestamp")?;
        if let Some(old) = self.records.remove(&annotation.id) {
            self.unindex(old.id, old.timestamp);
        }
        self.insert(annotation);
        Ok(())
    }

    /// Unchecked removal for inbound sync.
    pub fn remove_remote(&mut self, id: Uuid) -> Option<Annotation> {
        self.take(id)
    }

    /// Unchecked interaction append for inbound sync.
    pub fn interact_remote(
        &mut self,
        id: Uuid,
        interaction: Interaction,
    ) -> Result<(), EngineError> {
        let annotation = self
            .records
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("annotation", id))?;
        annotation.add_interaction(interaction);
        Ok(())
    }

    /// Remove every record whose `expires_at` has passed. Returns the
    /// removed records.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> Vec<Annotation> {
        let expired: Vec<Uuid> = self
            .records
            .values()
            .filter(|a| a.is_expired(now))
            .map(|a| a.id)
            .collect();
        expired.into_iter().filter_map(|id| self.take(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Timeline-ordered clone of every record, used for cache snapshots and
    /// exports.
    pub fn snapshot(&self) -> Vec<Annotation> {
        let mut all: Vec<&Annotation> = self.records.values().collect();
        sort_timeline(&mut all);
        all.into_iter().cloned().collect()
    }

    /// Replace the whole store from a snapshot, rebuilding the index.
    /// Records with invalid timestamps are dropped.
    pub fn load_records(&mut self, annotations: Vec<Annotation>) {
        self.records.clear();
        self.time_index.clear();
        self.max_duration_ms = 0;
        for annotation in annotations {
            if annotation.timestamp.is_finite() && annotation.timestamp >= 0.0 {
                self.insert(annotation);
            }
        }
    }

    fn insert(&mut self, annotation: Annotation) {
        self.track_duration(annotation.duration);
        self.time_index
            .entry(to_millis(annotation.timestamp))
            .or_default()
            .push(annotation.id);
        self.records.insert(annotation.id, annotation);
    }

    fn take(&mut self, id: Uuid) -> Option<Annotation> {
        let annotation = self.records.remove(&id)?;
        self.unindex(annotation.id, annotation.timestamp);
        Some(annotation)
    }

    fn unindex(&mut self, id: Uuid, timestamp: f64) {
        let key = to_millis(timestamp);
        if let Some(ids) = self.time_index.get_mut(&key) {
            ids.retain(|x| *x != id);
            if ids.is_empty() {
                self.time_index.remove(&key);
            }
        }
    }

    fn track_duration(&mut self, duration: Option<f64>) {
        if let Some(duration) = duration {
            if duration.is_finite() && duration >= 0.0 {
                self.max_duration_ms = self.max_duration_ms.max(to_millis(duration));
            }
        }
    }
}

/// Sort by timestamp ascending, ties by creation time, for stable output.
pub(crate) fn sort_timeline(annotations: &mut [&Annotation]) {
    annotations.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

fn to_millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

fn validate_content(content: &str) -> Result<(), EngineError> {
    if content.trim().is_empty() {
        return Err(EngineError::InvalidInput(
            "content must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_time(value: f64, what: &str) -> Result<(), EngineError> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "{what} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}
