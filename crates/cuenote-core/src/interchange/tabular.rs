//! CSV export for spreadsheets.
//!
//! Deliberately lossy: one row per annotation with the columns people
//! actually scan, nothing more. There is no tabular import.

use crate::model::Annotation;

const HEADER: &str = "id,kind,content,timestamp,actor_name,created_at,status";

/// Render annotations as CSV. Content is always quoted with embedded quotes
/// doubled; other fields are quoted only when they need it.
pub fn export(annotations: &[&Annotation]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for annotation in annotations {
        out.push_str(&annotation.id.to_string());
        out.push(',');
        out.push_str(annotation.kind.as_str());
        out.push(',');
        out.push_str(&quote(&annotation.content));
        out.push(',');
        out.push_str(&annotation.timestamp.to_string());
        out.push(',');
        out.push_str(&field(&annotation.actor_name));
        out.push(',');
        out.push_str(&annotation.created_at.to_rfc3339());
        out.push(',');
        out.push_str(annotation.status.as_str());
        out.push('\n');
    }
    out
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        quote(value)
    } else {
        value.to_string()
    }
}
