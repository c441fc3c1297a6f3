//! The annotation record and its component types.
//!
//! An annotation is a time-anchored, positioned note attached to a media
//! timeline. Everything the engine stores, queries, syncs, and exports is
//! built from the types in this module.

use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of annotation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Comment,
    Highlight,
    Marker,
    Timestamp,
    Question,
    Explanation,
    Warning,
    Spoiler,
    Bookmark,
    ReactionZone,
    PollTrigger,
    ChapterMarker,
    Trivia,
    TechnicalNote,
    Custom,
}

impl AnnotationKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Highlight => "highlight",
            Self::Marker => "marker",
            Self::Timestamp => "timestamp",
            Self::Question => "question",
            Self::Explanation => "explanation",
            Self::Warning => "warning",
            Self::Spoiler => "spoiler",
            Self::Bookmark => "bookmark",
            Self::ReactionZone => "reaction_zone",
            Self::PollTrigger => "poll_trigger",
            Self::ChapterMarker => "chapter_marker",
            Self::Trivia => "trivia",
            Self::TechnicalNote => "technical_note",
            Self::Custom => "custom",
        }
    }
}

/// Lifecycle states for an annotation.
///
/// `Deleted` is terminal and is realized as physical removal from the store;
/// it never appears on a record that can still be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    Active,
    Hidden,
    Moderated,
    Reported,
    Pending,
    Featured,
    Deleted,
}

impl AnnotationStatus {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Hidden => "hidden",
            Self::Moderated => "moderated",
            Self::Reported => "reported",
            Self::Pending => "pending",
            Self::Featured => "featured",
            Self::Deleted => "deleted",
        }
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `active -> hidden | moderated | reported | pending | featured | deleted`
    /// - `hidden -> active | deleted`
    /// - `moderated -> active | deleted`
    /// - `reported -> active | moderated | deleted`
    /// - `pending -> active | deleted`
    /// - `featured -> active | deleted`
    ///
    /// `deleted` is terminal; nothing transitions out of it, and a no-op
    /// transition onto the current status is rejected as well.
    pub fn can_transition_to(self, target: AnnotationStatus) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
            });
        }

        let allowed = matches!(
            (self, target),
            (Self::Active, Self::Hidden)
                | (Self::Active, Self::Moderated)
                | (Self::Active, Self::Reported)
                | (Self::Active, Self::Pending)
                | (Self::Active, Self::Featured)
                | (Self::Active, Self::Deleted)
                | (Self::Hidden, Self::Active)
                | (Self::Hidden, Self::Deleted)
                | (Self::Moderated, Self::Active)
                | (Self::Moderated, Self::Deleted)
                | (Self::Reported, Self::Active)
                | (Self::Reported, Self::Moderated)
                | (Self::Reported, Self::Deleted)
                | (Self::Pending, Self::Active)
                | (Self::Pending, Self::Deleted)
                | (Self::Featured, Self::Active)
                | (Self::Featured, Self::Deleted)
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

/// Error returned when a status transition is not in the lifecycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: AnnotationStatus,
    pub to: AnnotationStatus,
}

/// Annotation priority, carried in metadata and filterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Originator class of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    User,
    Ai,
    Moderator,
    System,
    Import,
}

impl Default for Provenance {
    fn default() -> Self {
        Self::User
    }
}

impl Provenance {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
            Self::Moderator => "moderator",
            Self::System => "system",
            Self::Import => "import",
        }
    }
}

/// Corner (or center) an on-screen position is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Extra pixel nudge applied after anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Normalized on-screen placement. Irrelevant to timing logic; carried for
/// the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate, 0-100.
    pub x: f64,
    /// Vertical coordinate, 0-100.
    pub y: f64,
    pub anchor: Anchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<PixelOffset>,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 50.0,
            anchor: Anchor::Center,
            offset: None,
        }
    }
}

impl Position {
    /// Placement used for subtitle-style imports.
    pub fn bottom_center() -> Self {
        Self {
            x: 50.0,
            y: 90.0,
            anchor: Anchor::BottomCenter,
            offset: None,
        }
    }
}

/// Presentation-only styling. Carried through, never interpreted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: None,
            text_color: None,
            font_size: None,
            opacity: 1.0,
            animation: None,
        }
    }
}

/// One prior-content snapshot, appended on every content edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub edited_at: DateTime<Utc>,
    pub previous_content: String,
    pub changed_fields: Vec<String>,
}

/// Kind of attachment referenced by an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Link,
    Clip,
}

/// External resource attached to an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub kind: AttachmentKind,
    pub url: String,
}

/// Optional machine-assigned quality scores (AI-sourced annotations carry
/// them; everything else leaves them unset).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub accuracy: f64,
    pub relevance: f64,
}

/// Tags, priority, provenance, and the edit/link bookkeeping for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Metadata {
    pub tags: BTreeSet<String>,
    pub priority: Priority,
    pub source: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub edits: Vec<EditRecord>,
    pub linked: Vec<Uuid>,
    pub attachments: Vec<Attachment>,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<QualityScores>,
}

/// Actor reaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Dislike,
    Reaction,
    Report,
    Bookmark,
    Share,
    PollVote,
}

impl InteractionKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Reaction => "reaction",
            Self::Report => "report",
            Self::Bookmark => "bookmark",
            Self::Share => "share",
            Self::PollVote => "poll_vote",
        }
    }
}

/// Structured payload carried by an interaction, one variant per known kind
/// plus an opaque extension variant for forward-compatible custom payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionData {
    Reaction { emoji: String },
    Report { reason: String },
    PollVote { choice: String },
    Opaque { value: serde_json::Value },
}

/// A single actor reaction on an annotation. The interaction list is
/// append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub actor_id: String,
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(actor_id: impl Into<String>, kind: InteractionKind, data: Option<InteractionData>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id: actor_id.into(),
            kind,
            data,
            created_at: Utc::now(),
        }
    }
}

/// Who may see a record, and under what conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub is_public: bool,
    pub audiences: BTreeSet<String>,
    pub allowed_actors: BTreeSet<String>,
    pub restricted_actors: BTreeSet<String>,
    pub show_to_moderators: bool,
    pub show_to_subscribers: bool,
    /// Temporary-hide window: while `now < hide_until`, only moderators see
    /// the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_until: Option<DateTime<Utc>>,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            is_public: true,
            audiences: BTreeSet::new(),
            allowed_actors: BTreeSet::new(),
            restricted_actors: BTreeSet::new(),
            show_to_moderators: true,
            show_to_subscribers: true,
            hide_until: None,
        }
    }
}

/// Capability flags plus explicit editor/moderator lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_interact: bool,
    pub can_reply: bool,
    pub can_moderate: bool,
    pub can_feature: bool,
    pub can_pin: bool,
    pub editable_by: BTreeSet<String>,
    pub moderatable_by: BTreeSet<String>,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_edit: true,
            can_delete: true,
            can_interact: true,
            can_reply: true,
            can_moderate: false,
            can_feature: false,
            can_pin: false,
            editable_by: BTreeSet::new(),
            moderatable_by: BTreeSet::new(),
        }
    }
}

impl Permissions {
    /// Default capability set for a freshly created record: the author can
    /// do everything to their own annotation, nobody else is granted
    /// moderation.
    pub fn for_author(actor_id: &str) -> Self {
        let mut perms = Self::default();
        perms.editable_by.insert(actor_id.to_string());
        perms
    }
}

/// A time-anchored, positioned note attached to a media timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier, assigned at creation, immutable.
    pub id: Uuid,
    /// Stream this annotation belongs to.
    pub stream_id: String,
    /// Creating actor, immutable.
    pub actor_id: String,
    /// Display name of the creating actor (mutable).
    pub actor_name: String,
    pub kind: AnnotationKind,
    /// Free text body.
    pub content: String,
    /// Anchor offset into the media timeline, in seconds. Never negative.
    pub timestamp: f64,
    /// Optional span; absent means a point-in-time marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub position: Position,
    pub style: Style,
    pub metadata: Metadata,
    pub interactions: Vec<Interaction>,
    pub visibility: Visibility,
    pub permissions: Permissions,
    pub status: AnnotationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Annotation {
    /// Create a new annotation with engine defaults.
    pub fn new(
        stream_id: impl Into<String>,
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
        kind: AnnotationKind,
        content: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        let actor_id = actor_id.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stream_id: stream_id.into(),
            permissions: Permissions::for_author(&actor_id),
            actor_id,
            actor_name: actor_name.into(),
            kind,
            content: content.into(),
            timestamp,
            duration: None,
            position: Position::default(),
            style: Style::default(),
            metadata: Metadata::default(),
            interactions: Vec::new(),
            visibility: Visibility::default(),
            status: AnnotationStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    /// End of the covered interval; equals `timestamp` for point markers.
    pub fn end_time(&self) -> f64 {
        self.timestamp + self.duration.unwrap_or(0.0)
    }

    /// Whether `t` falls inside `[timestamp, end_time]`, bounds inclusive.
    pub fn covers(&self, t: f64) -> bool {
        t >= self.timestamp && t <= self.end_time()
    }

    /// Inclusive-bounds interval overlap with `[start, end]`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.timestamp <= end && self.end_time() >= start
    }

    /// Update the content without history bookkeeping; the store records the
    /// edit-history entry since it knows the full changed-field set.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    /// Add a tag if not already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        if self.metadata.tags.insert(tag.into()) {
            self.touch();
        }
    }

    /// Remove a tag if present.
    pub fn remove_tag(&mut self, tag: &str) {
        if self.metadata.tags.remove(tag) {
            self.touch();
        }
    }

    /// Append an interaction. The list is append-only; nothing removes
    /// entries.
    pub fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
        self.touch();
    }

    /// Append an edit-history entry capturing the previous content.
    pub fn record_edit(&mut self, previous_content: String, changed_fields: Vec<String>) {
        self.metadata.edits.push(EditRecord {
            edited_at: Utc::now(),
            previous_content,
            changed_fields,
        });
    }

    /// Whether the record has expired relative to `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Caller-supplied fields for creating an annotation. Absent fields take
/// engine defaults; present fields win on conflicts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationDraft {
    pub kind: Option<AnnotationKind>,
    pub content: String,
    pub timestamp: f64,
    pub duration: Option<f64>,
    pub position: Option<Position>,
    pub style: Option<Style>,
    pub tags: BTreeSet<String>,
    pub priority: Option<Priority>,
    pub source: Option<Provenance>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub scores: Option<QualityScores>,
    pub visibility: Option<Visibility>,
    pub permissions: Option<Permissions>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Ids of annotations this one links to (replies link their parent).
    pub linked: Vec<Uuid>,
}

impl AnnotationDraft {
    /// Minimal draft: a comment at `timestamp`.
    pub fn comment(content: impl Into<String>, timestamp: f64) -> Self {
        Self {
            kind: Some(AnnotationKind::Comment),
            content: content.into(),
            timestamp,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: AnnotationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Partial update applied through `update`. Every populated field is
/// validated and written; `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPatch {
    pub content: Option<String>,
    pub timestamp: Option<f64>,
    pub duration: Option<f64>,
    pub position: Option<Position>,
    pub style: Option<Style>,
    pub tags: Option<BTreeSet<String>>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub status: Option<AnnotationStatus>,
    pub visibility: Option<Visibility>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl AnnotationPatch {
    /// Names of the fields this patch touches, recorded in edit history.
    pub fn changed_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.content.is_some() {
            fields.push("content".to_string());
        }
        if self.timestamp.is_some() {
            fields.push("timestamp".to_string());
        }
        if self.duration.is_some() {
            fields.push("duration".to_string());
        }
        if self.position.is_some() {
            fields.push("position".to_string());
        }
        if self.style.is_some() {
            fields.push("style".to_string());
        }
        if self.tags.is_some() {
            fields.push("tags".to_string());
        }
        if self.priority.is_some() {
            fields.push("priority".to_string());
        }
        if self.category.is_some() {
            fields.push("category".to_string());
        }
        if self.language.is_some() {
            fields.push("language".to_string());
        }
        if self.status.is_some() {
            fields.push("status".to_string());
        }
        if self.visibility.is_some() {
            fields.push("visibility".to_string());
        }
        if self.expires_at.is_some() {
            fields.push("expires_at".to_string());
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AnnotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}

impl FromStr for AnnotationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "comment" => Ok(Self::Comment),
            "highlight" => Ok(Self::Highlight),
            "marker" => Ok(Self::Marker),
            "timestamp" => Ok(Self::Timestamp),
            "question" => Ok(Self::Question),
            "explanation" => Ok(Self::Explanation),
            "warning" => Ok(Self::Warning),
            "spoiler" => Ok(Self::Spoiler),
            "bookmark" => Ok(Self::Bookmark),
            "reaction_zone" => Ok(Self::ReactionZone),
            "poll_trigger" => Ok(Self::PollTrigger),
            "chapter_marker" => Ok(Self::ChapterMarker),
            "trivia" => Ok(Self::Trivia),
            "technical_note" => Ok(Self::TechnicalNote),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseEnumError {
                expected: "annotation kind",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for AnnotationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "active" => Ok(Self::Active),
            "hidden" => Ok(Self::Hidden),
            "moderated" => Ok(Self::Moderated),
            "reported" => Ok(Self::Reported),
            "pending" => Ok(Self::Pending),
            "featured" => Ok(Self::Featured),
            "deleted" => Ok(Self::Deleted),
            _ => Err(ParseEnumError {
                expected: "annotation status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Provenance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            "moderator" => Ok(Self::Moderator),
            "system" => Ok(Self::System),
            "import" => Ok(Self::Import),
            _ => Err(ParseEnumError {
                expected: "provenance source",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for InteractionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "reaction" => Ok(Self::Reaction),
            "report" => Ok(Self::Report),
            "bookmark" => Ok(Self::Bookmark),
            "share" => Ok(Self::Share),
            "poll_vote" => Ok(Self::PollVote),
            _ => Err(ParseEnumError {
                expected: "interaction kind",
                got: s.to_string(),
            }),
        }
    }
}
