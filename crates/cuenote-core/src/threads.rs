//! Thread bookkeeping for annotation replies.
//!
//! Threads are created lazily: no record exists until the first reply
//! arrives. Deleting a parent destroys its thread; the reply annotations
//! stay in the store with a dangling link.

use std::collections::HashMap;

use uuid::Uuid;

use crate::model::{Thread, ThreadModeration};

/// All threads for one stream, keyed by parent annotation id.
#[derive(Debug, Default)]
pub struct ThreadSet {
    threads: HashMap<Uuid, Thread>,
}

impl ThreadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reply under `parent_id`, creating the thread on first use.
    /// The parent author is seeded as a participant so a fresh thread
    /// already names both sides of the conversation.
    pub fn record_reply(
        &mut self,
        parent_id: Uuid,
        parent_author: &str,
        reply_id: Uuid,
        reply_actor: &str,
    ) -> &Thread {
        let thread = self.threads.entry(parent_id).or_insert_with(|| {
            let mut t = Thread::new(parent_id);
            t.participants.insert(parent_author.to_string());
            t
        });
        thread.add_reply(reply_id, reply_actor);
        thread
    }

    pub fn get(&self, parent_id: Uuid) -> Option<&Thread> {
        self.threads.get(&parent_id)
    }

    /// Destroy the thread under a deleted parent. Returns the reply ids so
    /// the caller can detach them; the replies themselves are not deleted.
    pub fn remove_parent(&mut self, parent_id: Uuid) -> Vec<Uuid> {
        self.threads
            .remove(&parent_id)
            .map(|t| t.replies)
            .unwrap_or_default()
    }

    /// Drop a reply id from whichever thread holds it (the reply annotation
    /// was deleted on its own).
    pub fn remove_reply(&mut self, reply_id: Uuid) {
        for thread in self.threads.values_mut() {
            thread.remove_reply(reply_id);
        }
        self.threads.retain(|_, t| !t.replies.is_empty());
    }

    pub fn set_moderation(&mut self, parent_id: Uuid, moderation: ThreadModeration) -> bool {
        match self.threads.get_mut(&parent_id) {
            Some(thread) => {
                thread.moderation = moderation;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    /// Every thread's reply count must equal its reply list length. Used by
    /// tests and debug assertions.
    pub fn check_invariants(&self) -> bool {
        self.threads
            .values()
            .all(|t| t.total_replies == t.replies.len())
    }
}
