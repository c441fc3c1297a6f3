//! Permission and visibility evaluation.
//!
//! Pure predicates over a record and an acting user. The store calls these
//! before every checked mutation; search and layers compose `is_visible_to`
//! into their result sets. Remote-apply paths skip them on purpose, since
//! inbound sync payloads were checked by their originating engine.

use chrono::{DateTime, Utc};

use crate::model::Annotation;

/// Whether `actor_id` may edit the record: the capability flag must be on,
/// and the actor must be the author or on the editable list.
pub fn can_edit(annotation: &Annotation, actor_id: &str) -> bool {
    annotation.permissions.can_edit
        && (actor_id == annotation.actor_id
            || annotation.permissions.editable_by.contains(actor_id))
}

/// Whether `actor_id` may delete the record: author or moderator, gated by
/// the capability flag.
pub fn can_delete(annotation: &Annotation, actor_id: &str) -> bool {
    annotation.permissions.can_delete
        && (actor_id == annotation.actor_id
            || annotation.permissions.moderatable_by.contains(actor_id))
}

/// Whether `actor_id` may add interactions.
pub fn can_interact(annotation: &Annotation, _actor_id: &str) -> bool {
    annotation.permissions.can_interact
}

/// Whether `actor_id` may reply.
pub fn can_reply(annotation: &Annotation, _actor_id: &str) -> bool {
    annotation.permissions.can_reply
}

/// Whether `actor_id` moderates this record.
pub fn can_moderate(annotation: &Annotation, actor_id: &str) -> bool {
    annotation.permissions.can_moderate
        && annotation.permissions.moderatable_by.contains(actor_id)
}

/// Whether `actor_id` may change the record's status: its author may, and so
/// may a moderator.
pub fn can_set_status(annotation: &Annotation, actor_id: &str) -> bool {
    actor_id == annotation.actor_id || can_moderate(annotation, actor_id)
}

/// Visibility of a record to `actor_id` at instant `now`.
///
/// Order matters:
/// 1. The restricted list always wins, including over the author.
/// 2. A non-public record requires membership of a non-empty allowed list.
/// 3. An active `hide_until` hides from everyone except moderators.
pub fn is_visible_to(annotation: &Annotation, actor_id: &str, now: DateTime<Utc>) -> bool {
    let visibility = &annotation.visibility;

    if visibility.restricted_actors.contains(actor_id) {
        return false;
    }

    if !visibility.is_public {
        let allowed = &visibility.allowed_actors;
        let is_author = actor_id == annotation.actor_id;
        if !is_author && !allowed.contains(actor_id) {
            return false;
        }
    }

    if let Some(hide_until) = visibility.hide_until {
        if now < hide_until && !annotation.permissions.moderatable_by.contains(actor_id) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationKind;
    use chrono::Duration;

    fn sample() -> Annotation {
        Annotation::new(
            "stream-1",
            "author-1",
            "Author",
            AnnotationKind::Comment,
            "hello",
            10.0,
        )
    }

    #[test]
    fn test_author_can_edit_and_delete() {
        let a = sample();
        assert!(can_edit(&a, "author-1"));
        assert!(can_delete(&a, "author-1"));
        assert!(!can_edit(&a, "stranger"));
        assert!(!can_delete(&a, "stranger"));
    }

    #[test]
    fn test_capability_flag_gates_even_the_author() {
        let mut a = sample();
        a.permissions.can_edit = false;
        assert!(!can_edit(&a, "author-1"));
    }

    #[test]
    fn test_listed_editor_can_edit() {
        let mut a = sample();
        a.permissions.editable_by.insert("editor-2".to_string());
        assert!(can_edit(&a, "editor-2"));
    }

    #[test]
    fn test_moderator_requires_flag_and_listing() {
        let mut a = sample();
        assert!(!can_moderate(&a, "mod-1"));

        a.permissions.moderatable_by.insert("mod-1".to_string());
        assert!(!can_moderate(&a, "mod-1")); // flag still off

        a.permissions.can_moderate = true;
        assert!(can_moderate(&a, "mod-1"));
        assert!(!can_moderate(&a, "other"));
    }

    #[test]
    fn test_status_changes_for_author_or_moderator() {
        let mut a = sample();
        a.permissions.can_moderate = true;
        a.permissions.moderatable_by.insert("mod-1".to_string());

        assert!(can_set_status(&a, "author-1"));
        assert!(can_set_status(&a, "mod-1"));
        assert!(!can_set_status(&a, "stranger"));
    }

    #[test]
    fn test_restricted_list_always_wins() {
        let mut a = sample();
        a.visibility.restricted_actors.insert("author-1".to_string());
        assert!(!is_visible_to(&a, "author-1", Utc::now()));
    }

    #[test]
    fn test_private_record_requires_allow_list() {
        let mut a = sample();
        a.visibility.is_public = false;
        a.visibility.allowed_actors.insert("friend-1".to_string());

        let now = Utc::now();
        assert!(is_visible_to(&a, "friend-1", now));
        assert!(is_visible_to(&a, "author-1", now)); // author still sees it
        assert!(!is_visible_to(&a, "stranger", now));
    }

    #[test]
    fn test_hide_until_hides_from_everyone_but_moderators() {
        let mut a = sample();
        let now = Utc::now();
        a.visibility.hide_until = Some(now + Duration::minutes(5));
        a.permissions.moderatable_by.insert("mod-1".to_string());

        assert!(!is_visible_to(&a, "author-1", now));
        assert!(!is_visible_to(&a, "viewer-2", now));
        assert!(is_visible_to(&a, "mod-1", now));

        // Window passed: visible again
        let later = now + Duration::minutes(6);
        assert!(is_visible_to(&a, "viewer-2", later));
    }
}
