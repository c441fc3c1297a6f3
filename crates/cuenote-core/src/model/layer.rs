//! Annotation layers: named, toggleable views over the store.
//!
//! A layer never owns annotations. It carries a filter, and membership is
//! computed against the live store whenever somebody asks.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::filter::AnnotationFilter;

/// Presentation hints for rendering a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
    pub cluster: bool,
    /// Clustering radius in seconds, only meaningful when `cluster` is set.
    pub cluster_radius: f64,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            tint: None,
            cluster: false,
            cluster_radius: 5.0,
        }
    }
}

/// Per-layer access lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerAccess {
    pub can_view: BTreeSet<String>,
    pub can_edit: BTreeSet<String>,
    pub can_manage: BTreeSet<String>,
    pub is_public: bool,
}

impl Default for LayerAccess {
    fn default() -> Self {
        Self {
            can_view: BTreeSet::new(),
            can_edit: BTreeSet::new(),
            can_manage: BTreeSet::new(),
            is_public: true,
        }
    }
}

/// A named, ordered, toggleable view over the annotation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLayer {
    pub id: Uuid,
    pub name: String,
    pub is_visible: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Insertion order from a monotonic counter; never renumbered, so stays
    /// stable across deletions.
    pub z_index: u32,
    pub filter: AnnotationFilter,
    pub style: LayerStyle,
    pub access: LayerAccess,
    /// At most one layer is the default at a time.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl AnnotationLayer {
    pub fn new(name: impl Into<String>, filter: AnnotationFilter, z_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_visible: true,
            opacity: 1.0,
            z_index,
            filter,
            style: LayerStyle::default(),
            access: LayerAccess::default(),
            is_default: false,
            created_at: Utc::now(),
        }
    }

    /// Whether `actor_id` may see this layer at all.
    pub fn viewable_by(&self, actor_id: &str) -> bool {
        self.access.is_public
            || self.access.can_view.contains(actor_id)
            || self.access.can_edit.contains(actor_id)
            || self.access.can_manage.contains(actor_id)
    }

    /// Whether `actor_id` may change the layer definition.
    pub fn manageable_by(&self, actor_id: &str) -> bool {
        self.access.can_manage.is_empty() || self.access.can_manage.contains(actor_id)
    }
}
