//! Data model for the annotation engine.

mod annotation;
mod filter;
mod layer;
mod template;
mod thread;

pub use annotation::{
    Anchor, Annotation, AnnotationDraft, AnnotationKind, AnnotationPatch, AnnotationStatus,
    Attachment, AttachmentKind, EditRecord, Interaction, InteractionData, InteractionKind,
    InvalidTransition, Metadata, ParseEnumError, Permissions, PixelOffset, Position, Priority,
    Provenance, QualityScores, Style, Visibility,
};
pub use filter::AnnotationFilter;
pub use layer::{AnnotationLayer, LayerAccess, LayerStyle};
pub use template::AnnotationTemplate;
pub use thread::{Thread, ThreadModeration};
