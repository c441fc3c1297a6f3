//! Reply threads, created lazily on the first reply to an annotation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Moderation state of a whole thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadModeration {
    Clean,
    Flagged,
    Locked,
}

impl Default for ThreadModeration {
    fn default() -> Self {
        Self::Clean
    }
}

/// Conversation attached to a parent annotation. No thread record exists
/// until the first reply arrives; the record is destroyed when the parent
/// is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// The annotation this thread hangs off.
    pub parent_id: Uuid,
    /// Reply annotation ids, in arrival order.
    pub replies: Vec<Uuid>,
    /// Always equal to `replies.len()`; maintained by the mutators here.
    pub total_replies: usize,
    /// Actors who have replied, including the parent author once they reply.
    pub participants: BTreeSet<String>,
    pub last_activity: DateTime<Utc>,
    pub moderation: ThreadModeration,
}

impl Thread {
    pub fn new(parent_id: Uuid) -> Self {
        Self {
            parent_id,
            replies: Vec::new(),
            total_replies: 0,
            participants: BTreeSet::new(),
            last_activity: Utc::now(),
            moderation: ThreadModeration::default(),
        }
    }

    /// Record a reply: appends the id, bumps the count, tracks the actor,
    /// and refreshes the activity time.
    pub fn add_reply(&mut self, reply_id: Uuid, actor_id: impl Into<String>) {
        self.replies.push(reply_id);
        self.total_replies = self.replies.len();
        self.participants.insert(actor_id.into());
        self.last_activity = Utc::now();
    }

    /// Drop a reply id (used when a reply annotation is deleted). The count
    /// stays in lockstep with the list.
    pub fn remove_reply(&mut self, reply_id: Uuid) {
        self.replies.retain(|id| *id != reply_id);
        self.total_replies = self.replies.len();
    }

    pub fn is_locked(&self) -> bool {
        self.moderation == ThreadModeration::Locked
    }
}
