//! Reusable annotation templates.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::annotation::{AnnotationKind, Position, Style};

/// A stamp for producing annotations with preset kind, content, style, and
/// placement. `usage_count` is the only mutable state and is bumped on every
/// instantiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTemplate {
    pub id: Uuid,
    pub name: String,
    pub kind: AnnotationKind,
    pub content: String,
    pub style: Style,
    pub default_position: Position,
    pub tags: BTreeSet<String>,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

impl AnnotationTemplate {
    pub fn new(
        name: impl Into<String>,
        kind: AnnotationKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            content: content.into(),
            style: Style::default(),
            default_position: Position::default(),
            tags: BTreeSet::new(),
            usage_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}
