//! Faceted annotation filters.
//!
//! A filter is a bag of optional facets combined by conjunction: a record
//! matches when every populated facet accepts it. Empty or `None` facets
//! constrain nothing, so the default filter matches everything.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::annotation::{Annotation, AnnotationKind, AnnotationStatus, Priority, Provenance};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationFilter {
    pub kinds: BTreeSet<AnnotationKind>,
    pub actor_ids: BTreeSet<String>,
    /// Inclusive `[start, end]` window in seconds; matches by interval
    /// overlap, so spans touching a boundary are in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<(f64, f64)>,
    /// Matches when the record carries any of these tags.
    pub tags: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub statuses: BTreeSet<AnnotationStatus>,
    pub priorities: BTreeSet<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_interactions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_attachments: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub sources: BTreeSet<Provenance>,
}

impl AnnotationFilter {
    /// Filter that only constrains the time window.
    pub fn in_window(start: f64, end: f64) -> Self {
        Self {
            window: Some((start, end)),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: AnnotationKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_ids.insert(actor_id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_status(mut self, status: AnnotationStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    /// True when no facet is populated.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
            && self.actor_ids.is_empty()
            && self.window.is_none()
            && self.tags.is_empty()
            && self.categories.is_empty()
            && self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.min_interactions.is_none()
            && self.has_attachments.is_none()
            && self.language.is_none()
            && self.sources.is_empty()
    }

    /// Conjunction of every populated facet.
    pub fn matches(&self, annotation: &Annotation) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&annotation.kind) {
            return false;
        }
        if !self.actor_ids.is_empty() && !self.actor_ids.contains(&annotation.actor_id) {
            return false;
        }
        if let Some((start, end)) = self.window {
            if !annotation.overlaps(start, end) {
                return false;
            }
        }
        if !self.tags.is_empty() && self.tags.is_disjoint(&annotation.metadata.tags) {
            return false;
        }
        if !self.categories.is_empty() {
            match &annotation.metadata.category {
                Some(category) if self.categories.contains(category) => {}
                _ => return false,
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&annotation.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&annotation.metadata.priority)
        {
            return false;
        }
        if let Some(min) = self.min_interactions {
            if annotation.interactions.len() < min {
                return false;
            }
        }
        if let Some(wants) = self.has_attachments {
            if annotation.metadata.attachments.is_empty() == wants {
                return false;
            }
        }
        if let Some(language) = &self.language {
            match &annotation.metadata.language {
                Some(have) if have == language => {}
                _ => return false,
            }
        }
        if !self.sources.is_empty() && !self.sources.contains(&annotation.metadata.source) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Annotation {
        let mut a = Annotation::new(
            "stream-1",
            "actor-1",
            "Alice",
            AnnotationKind::Highlight,
            "great save",
            42.0,
        );
        a.duration = Some(5.0);
        a.add_tag("goal");
        a.metadata.category = Some("sports".to_string());
        a
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = AnnotationFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&sample()));
    }

    #[test]
    fn test_facets_are_conjunctive() {
        let a = sample();

        let filter = AnnotationFilter::default()
            .with_kind(AnnotationKind::Highlight)
            .with_actor("actor-1")
            .with_tag("goal");
        assert!(filter.matches(&a));

        // Same filter with one failing facet no longer matches.
        let filter = filter.with_status(AnnotationStatus::Featured);
        assert!(!filter.matches(&a));
    }

    #[test]
    fn test_window_uses_inclusive_overlap() {
        let a = sample(); // covers [42, 47]

        assert!(AnnotationFilter::in_window(40.0, 42.0).matches(&a));
        assert!(AnnotationFilter::in_window(47.0, 50.0).matches(&a));
        assert!(AnnotationFilter::in_window(44.0, 45.0).matches(&a));
        assert!(!AnnotationFilter::in_window(47.1, 50.0).matches(&a));
    }

    #[test]
    fn test_tag_facet_matches_any_listed_tag() {
        let a = sample();

        let filter = AnnotationFilter::default()
            .with_tag("goal")
            .with_tag("missing");
        assert!(filter.matches(&a));

        let filter = AnnotationFilter::default().with_tag("missing");
        assert!(!filter.matches(&a));
    }

    #[test]
    fn test_interaction_and_attachment_facets() {
        let mut a = sample();

        let needs_two = AnnotationFilter {
            min_interactions: Some(2),
            ..AnnotationFilter::default()
        };
        assert!(!needs_two.matches(&a));

        a.add_interaction(crate::model::Interaction::new(
            "actor-2",
            crate::model::InteractionKind::Like,
            None,
        ));
        a.add_interaction(crate::model::Interaction::new(
            "actor-3",
            crate::model::InteractionKind::Like,
            None,
        ));
        assert!(needs_two.matches(&a));

        let wants_attachments = AnnotationFilter {
            has_attachments: Some(true),
            ..AnnotationFilter::default()
        };
        assert!(!wants_attachments.matches(&a));
    }

    #[test]
    fn test_category_and_language_facets() {
        let mut a = sample();
        a.metadata.language = Some("en".to_string());

        let mut filter = AnnotationFilter::default();
        filter.categories.insert("sports".to_string());
        filter.language = Some("en".to_string());
        assert!(filter.matches(&a));

        filter.language = Some("de".to_string());
        assert!(!filter.matches(&a));
    }
}
