//! Template catalog and stamping.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{AnnotationDraft, AnnotationTemplate};

/// Catalog of reusable templates.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: HashMap<Uuid, AnnotationTemplate>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, template: AnnotationTemplate) -> Result<AnnotationTemplate, EngineError> {
        if template.name.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "template name must not be empty".to_string(),
            ));
        }
        if template.content.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "template content must not be empty".to_string(),
            ));
        }
        self.templates.insert(template.id, template.clone());
        Ok(template)
    }

    pub fn get(&self, id: Uuid) -> Option<&AnnotationTemplate> {
        self.templates.get(&id)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<AnnotationTemplate, EngineError> {
        self.templates
            .remove(&id)
            .ok_or_else(|| EngineError::not_found("template", id))
    }

    /// Stamp a draft from the template at `timestamp` and bump the usage
    /// counter.
    pub fn instantiate(
        &mut self,
        id: Uuid,
        timestamp: f64,
    ) -> Result<AnnotationDraft, EngineError> {
        let template = self
            .templates
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("template", id))?;
        template.usage_count += 1;

        Ok(AnnotationDraft {
            kind: Some(template.kind),
            content: template.content.clone(),
            timestamp,
            style: Some(template.style.clone()),
            position: Some(template.default_position),
            tags: template.tags.clone(),
            ..AnnotationDraft::default()
        })
    }

    /// Templates sorted by name for stable listings.
    pub fn ordered(&self) -> Vec<&AnnotationTemplate> {
        let mut all: Vec<&AnnotationTemplate> = self.templates.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn snapshot(&self) -> Vec<AnnotationTemplate> {
        self.ordered().into_iter().cloned().collect()
    }

    pub fn load_templates(&mut self, templates: Vec<AnnotationTemplate>) {
        self.templates.clear();
        for template in templates {
            self.templates.insert(template.id, template);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationKind;

    #[test]
    fn test_instantiate_bumps_usage() {
        let mut set = TemplateSet::new();
        let template = set
            .add(
                AnnotationTemplate::new("goal", AnnotationKind::Highlight, "GOAL!")
                    .with_tag("sports"),
            )
            .unwrap();

        let draft = set.instantiate(template.id, 93.5).unwrap();
        assert_eq!(draft.kind, Some(AnnotationKind::Highlight));
        assert_eq!(draft.content, "GOAL!");
        assert_eq!(draft.timestamp, 93.5);
        assert!(draft.tags.contains("sports"));

        set.instantiate(template.id, 95.0).unwrap();
        assert_eq!(set.get(template.id).unwrap().usage_count, 2);
    }

    #[test]
    fn test_add_validates() {
        let mut set = TemplateSet::new();
        let err = set
            .add(AnnotationTemplate::new("", AnnotationKind::Comment, "text"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let err = set
            .add(AnnotationTemplate::new("named", AnnotationKind::Comment, "  "))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_instantiate_missing_template() {
        let mut set = TemplateSet::new();
        assert!(matches!(
            set.instantiate(Uuid::new_v4(), 1.0),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_ordered_by_name() {
        let mut set = TemplateSet::new();
        set.add(AnnotationTemplate::new("zebra", AnnotationKind::Comment, "z"))
            .unwrap();
        set.add(AnnotationTemplate::new("alpha", AnnotationKind::Comment, "a"))
            .unwrap();

        let names: Vec<&str> = set.ordered().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }
}
