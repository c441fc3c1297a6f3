//! Layer management.
//!
//! Layers are dynamic views: each carries a filter, and membership is
//! computed against the live store on every request. A layer never holds a
//! list of annotation ids, so records created after the layer automatically
//! show up in it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::access;
use crate::error::EngineError;
use crate::model::{Annotation, AnnotationFilter, AnnotationLayer, LayerAccess, LayerStyle};
use crate::store::{sort_timeline, AnnotationStore};

/// Ordered collection of layers with a derived visible-id set.
#[derive(Debug, Default)]
pub struct LayerSet {
    layers: HashMap<Uuid, AnnotationLayer>,
    visible: HashSet<Uuid>,
    /// Monotonic z-index source; never reused after deletion.
    next_z: u32,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layer. New layers start visible with the next z-index.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        filter: AnnotationFilter,
        style: Option<LayerStyle>,
        access: Option<LayerAccess>,
    ) -> Result<AnnotationLayer, EngineError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "layer name must not be empty".to_string(),
            ));
        }

        let mut layer = AnnotationLayer::new(name, filter, self.next_z);
        self.next_z += 1;
        if let Some(style) = style {
            layer.style = style;
        }
        if let Some(access) = access {
            layer.access = access;
        }

        self.visible.insert(layer.id);
        self.layers.insert(layer.id, layer.clone());
        Ok(layer)
    }

    /// Flip visibility; returns the new state.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool, EngineError> {
        let layer = self
            .layers
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("layer", id))?;
        layer.is_visible = !layer.is_visible;
        if layer.is_visible {
            self.visible.insert(id);
        } else {
            self.visible.remove(&id);
        }
        Ok(layer.is_visible)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<AnnotationLayer, EngineError> {
        self.visible.remove(&id);
        self.layers
            .remove(&id)
            .ok_or_else(|| EngineError::not_found("layer", id))
    }

    pub fn get(&self, id: Uuid) -> Option<&AnnotationLayer> {
        self.layers.get(&id)
    }

    /// Ids of the layers currently toggled visible.
    pub fn visible_ids(&self) -> &HashSet<Uuid> {
        &self.visible
    }

    /// All layers ordered by z-index.
    pub fn ordered(&self) -> Vec<&AnnotationLayer> {
        let mut layers: Vec<&AnnotationLayer> = self.layers.values().collect();
        layers.sort_by_key(|l| l.z_index);
        layers
    }

    /// Make `id` the single default layer.
    pub fn set_default(&mut self, id: Uuid) -> Result<(), EngineError> {
        if !self.layers.contains_key(&id) {
            return Err(EngineError::not_found("layer", id));
        }
        for layer in self.layers.values_mut() {
            layer.is_default = layer.id == id;
        }
        Ok(())
    }

    pub fn default_layer(&self) -> Option<&AnnotationLayer> {
        self.layers.values().find(|l| l.is_default)
    }

    /// Compute a layer's members against the live store: the layer filter
    /// composed with record visibility for `actor_id`. Timeline ordered.
    pub fn members<'a>(
        &self,
        id: Uuid,
        store: &'a AnnotationStore,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'a Annotation>, EngineError> {
        let layer = self
            .layers
            .get(&id)
            .ok_or_else(|| EngineError::not_found("layer", id))?;
        if !layer.viewable_by(actor_id) {
            return Err(EngineError::PermissionDenied {
                action: "view layer",
            });
        }

        let mut members: Vec<&Annotation> = store
            .iter()
            .filter(|a| layer.filter.matches(a) && access::is_visible_to(a, actor_id, now))
            .collect();
        sort_timeline(&mut members);
        Ok(members)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Replace all layers from a snapshot, restoring visibility and the
    /// z-index counter.
    pub fn load_layers(&mut self, layers: Vec<AnnotationLayer>) {
        self.layers.clear();
        self.visible.clear();
        self.next_z = 0;
        for layer in layers {
            self.next_z = self.next_z.max(layer.z_index.saturating_add(1));
            if layer.is_visible {
                self.visible.insert(layer.id);
            }
            self.layers.insert(layer.id, layer);
        }
    }

    pub fn snapshot(&self) -> Vec<AnnotationLayer> {
        self.ordered().into_iter().cloned().collect()
    }
}
