//! Aggregate statistics over the annotation set.
//!
//! Everything here is a pure fold over the store: no incremental counters
//! are kept anywhere, so the same records always produce the same snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Annotation, AnnotationKind, AnnotationStatus, InteractionKind, Provenance};

/// Width of a timeline hotspot bucket, in seconds.
pub const HOTSPOT_BUCKET_SECS: u64 = 10;

/// How many contributors the leaderboard keeps.
const TOP_CONTRIBUTORS: usize = 5;

/// Derived quality figures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Mean accuracy over annotations carrying scores; 0 when none do.
    pub avg_accuracy: f64,
    /// Mean relevance over annotations carrying scores; 0 when none do.
    pub avg_relevance: f64,
    /// Share of annotations with at least one report interaction.
    pub report_rate: f64,
    /// Share of annotations featured or sourced from moderators/system.
    pub verification_rate: f64,
}

/// Snapshot of aggregate statistics, recomputable at any time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationAnalytics {
    pub total: usize,
    pub by_kind: BTreeMap<AnnotationKind, usize>,
    pub by_actor: BTreeMap<String, usize>,
    pub interactions_by_kind: BTreeMap<InteractionKind, usize>,
    /// Interactions per annotation; 0 when the store is empty.
    pub engagement_rate: f64,
    /// Annotation count per 10-second bucket, keyed by bucket start.
    pub hotspots: BTreeMap<u64, usize>,
    /// Busiest authors, descending, at most five.
    pub top_contributors: Vec<(String, usize)>,
    pub quality: QualityMetrics,
}

impl AnnotationAnalytics {
    /// Fold an annotation iterator into a snapshot.
    pub fn compute<'a>(annotations: impl Iterator<Item = &'a Annotation>) -> Self {
        let mut stats = Self::default();
        let mut interactions_total = 0usize;
        let mut scored = 0usize;
        let mut accuracy_sum = 0.0;
        let mut relevance_sum = 0.0;
        let mut reported = 0usize;
        let mut verified = 0usize;

        for annotation in annotations {
            stats.total += 1;
            *stats.by_kind.entry(annotation.kind).or_default() += 1;
            *stats
                .by_actor
                .entry(annotation.actor_id.clone())
                .or_default() += 1;

            interactions_total += annotation.interactions.len();
            for interaction in &annotation.interactions {
                *stats
                    .interactions_by_kind
                    .entry(interaction.kind)
                    .or_default() += 1;
            }

            *stats.hotspots.entry(bucket_of(annotation.timestamp)).or_default() += 1;

            if let Some(scores) = annotation.metadata.scores {
                scored += 1;
                accuracy_sum += scores.accuracy;
                relevance_sum += scores.relevance;
            }
            if annotation
                .interactions
                .iter()
                .any(|i| i.kind == InteractionKind::Report)
            {
                reported += 1;
            }
            if annotation.status == AnnotationStatus::Featured
                || matches!(
                    annotation.metadata.source,
                    Provenance::Moderator | Provenance::System
                )
            {
                verified += 1;
            }
        }

        if stats.total > 0 {
            stats.engagement_rate = interactions_total as f64 / stats.total as f64;
            stats.quality.report_rate = reported as f64 / stats.total as f64;
            stats.quality.verification_rate = verified as f64 / stats.total as f64;
        }
        if scored > 0 {
            stats.quality.avg_accuracy = accuracy_sum / scored as f64;
            stats.quality.avg_relevance = relevance_sum / scored as f64;
        }

        let mut contributors: Vec<(String, usize)> = stats
            .by_actor
            .iter()
            .map(|(actor, count)| (actor.clone(), *count))
            .collect();
        contributors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        contributors.truncate(TOP_CONTRIBUTORS);
        stats.top_contributors = contributors;

        stats
    }
}

fn bucket_of(timestamp: f64) -> u64 {
    let secs = timestamp.max(0.0) as u64;
    (secs / HOTSPOT_BUCKET_SECS) * HOTSPOT_BUCKET_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationDraft, Interaction, QualityScores};
    use crate::session::StreamSession;
    use crate::store::AnnotationStore;

    fn fixture_store() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        let alice = StreamSession::new("stream-1", "alice", "Alice");
        let bob = StreamSession::new("stream-1", "bob", "Bob");

        let a = store
            .create(AnnotationDraft::comment("first", 5.0), &alice)
            .unwrap();
        store
            .create(AnnotationDraft::comment("second", 9.9), &alice)
            .unwrap();
        store
            .create(AnnotationDraft::comment("third", 10.0), &bob)
            .unwrap();

        store
            .interact(
                a.id,
                Interaction::new("bob", InteractionKind::Like, None),
                "bob",
            )
            .unwrap();
        store
            .interact(
                a.id,
                Interaction::new("carol", InteractionKind::Report, None),
                "carol",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_counts_and_engagement() {
        let store = fixture_store();
        let stats = AnnotationAnalytics::compute(store.iter());

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_kind[&AnnotationKind::Comment], 3);
        assert_eq!(stats.by_actor["alice"], 2);
        assert_eq!(stats.by_actor["bob"], 1);
        assert_eq!(stats.interactions_by_kind[&InteractionKind::Like], 1);
        assert_eq!(stats.interactions_by_kind[&InteractionKind::Report], 1);
        assert!((stats.engagement_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_hotspot_bucket_boundaries() {
        let store = fixture_store();
        let stats = AnnotationAnalytics::compute(store.iter());

        // 5.0 and 9.9 land in bucket 0; 10.0 starts bucket 10
        assert_eq!(stats.hotspots[&0], 2);
        assert_eq!(stats.hotspots[&10], 1);
        assert_eq!(stats.hotspots.len(), 2);
    }

    #[test]
    fn test_top_contributors_capped_and_ordered() {
        let mut store = AnnotationStore::new();
        for actor in ["a", "b", "c", "d", "e", "f"] {
            let session = StreamSession::new("stream-1", actor, actor);
            let n = (actor.as_bytes()[0] - b'a') as usize + 1;
            for i in 0..n {
                store
                    .create(
                        AnnotationDraft::comment("x", i as f64),
                        &session,
                    )
                    .unwrap();
            }
        }

        let stats = AnnotationAnalytics::compute(store.iter());
        assert_eq!(stats.top_contributors.len(), 5);
        assert_eq!(stats.top_contributors[0], ("f".to_string(), 6));
        assert_eq!(stats.top_contributors[4], ("b".to_string(), 2));
    }

    #[test]
    fn test_quality_metrics() {
        let mut store = AnnotationStore::new();
        let ai = StreamSession::new("stream-1", "bot", "Bot");
        let draft = AnnotationDraft {
            scores: Some(QualityScores {
                accuracy: 0.8,
                relevance: 0.6,
            }),
            ..AnnotationDraft::comment("scored", 1.0)
        };
        store.create(draft, &ai).unwrap();
        let draft = AnnotationDraft {
            scores: Some(QualityScores {
                accuracy: 0.4,
                relevance: 1.0,
            }),
            source: Some(Provenance::System),
            ..AnnotationDraft::comment("also scored", 2.0)
        };
        store.create(draft, &ai).unwrap();
        store
            .create(AnnotationDraft::comment("unscored", 3.0), &ai)
            .unwrap();

        let stats = AnnotationAnalytics::compute(store.iter());
        assert!((stats.quality.avg_accuracy - 0.6).abs() < 1e-9);
        assert!((stats.quality.avg_relevance - 0.8).abs() < 1e-9);
        assert!((stats.quality.verification_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.quality.report_rate, 0.0);
    }

    #[test]
    fn test_empty_store_yields_zeroes() {
        let store = AnnotationStore::new();
        let stats = AnnotationAnalytics::compute(store.iter());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.engagement_rate, 0.0);
        assert!(stats.hotspots.is_empty());
        assert!(stats.top_contributors.is_empty());
        assert_eq!(stats.quality, QualityMetrics::default());
    }

    #[test]
    fn test_fold_is_deterministic() {
        let store = fixture_store();
        let first = AnnotationAnalytics::compute(store.iter());
        let second = AnnotationAnalytics::compute(store.iter());
        assert_eq!(first, second);
    }
}
