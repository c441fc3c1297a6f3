//! Filtering and search over the store.
//!
//! Both entry points compose record visibility for the asking actor, so a
//! record the actor may not see never leaks into results no matter what the
//! filter says. Results are timeline ordered.

use chrono::{DateTime, Utc};

use crate::access;
use crate::model::{Annotation, AnnotationFilter};
use crate::store::{sort_timeline, AnnotationStore};

/// Records matching `spec` that `actor_id` may see. An empty spec returns
/// everything visible.
pub fn filter<'a>(
    store: &'a AnnotationStore,
    spec: &AnnotationFilter,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Vec<&'a Annotation> {
    let mut hits: Vec<&Annotation> = store
        .iter()
        .filter(|a| access::is_visible_to(a, actor_id, now) && spec.matches(a))
        .collect();
    sort_timeline(&mut hits);
    hits
}

/// Case-insensitive substring search over content, actor name, and tags,
/// optionally intersected with a filter spec.
pub fn search<'a>(
    store: &'a AnnotationStore,
    query: &str,
    spec: Option<&AnnotationFilter>,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Vec<&'a Annotation> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return match spec {
            Some(spec) => filter(store, spec, actor_id, now),
            None => filter(store, &AnnotationFilter::default(), actor_id, now),
        };
    }

    let mut hits: Vec<&Annotation> = store
        .iter()
        .filter(|a| access::is_visible_to(a, actor_id, now))
        .filter(|a| spec.map_or(true, |s| s.matches(a)))
        .filter(|a| matches_query(a, &needle))
        .collect();
    sort_timeline(&mut hits);
    hits
}

fn matches_query(annotation: &Annotation, needle: &str) -> bool {
    annotation.content.to_lowercase().contains(needle)
        || annotation.actor_name.to_lowercase().contains(needle)
        || annotation
            .metadata
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}
