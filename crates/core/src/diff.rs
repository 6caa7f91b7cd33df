//! Generation-to-generation classification.

use crate::thread::{Generation, Thread};

/// How a current thread relates to the previous generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Updated,
    Unchanged,
}

/// Transient instruction to notify; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationIntent {
    NewThread {
        id: u64,
        link: String,
        subject: String,
        content: String,
    },
    UpdatedThread {
        id: u64,
        link: String,
        subject: String,
        reply_count: u32,
        last_reply_author: String,
        last_reply_content: String,
    },
}

impl NotificationIntent {
    pub fn id(&self) -> u64 {
        match self {
            Self::NewThread { id, .. } | Self::UpdatedThread { id, .. } => *id,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            Self::NewThread { link, .. } | Self::UpdatedThread { link, .. } => link,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::NewThread { .. })
    }
}

/// Identity-only comparison against the previous generation.
///
/// Only a strict advance of `last_modified` counts as an update; equal or
/// older timestamps (stale or rolled-back input) are unchanged.  Text is not
/// compared, so an edit that only moved the timestamp still classifies as
/// updated.
pub fn classify_thread(previous: &Generation, thread: &Thread) -> Classification {
    match previous.get(thread.id) {
        None => Classification::New,
        Some(prior) if thread.last_modified > prior.last_modified => Classification::Updated,
        Some(_) => Classification::Unchanged,
    }
}

/// Builds board links for threads and replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    thread_base: String,
    board: String,
}

impl LinkBuilder {
    pub fn new(thread_base: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            thread_base: thread_base.into().trim_end_matches('/').to_string(),
            board: board.into().trim_matches('/').to_string(),
        }
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn thread(&self, id: u64) -> String {
        format!("{}/{}/thread/{id}", self.thread_base, self.board)
    }

    /// Anchored at `reply_id`; a zero reply id links the thread itself.
    pub fn reply(&self, id: u64, reply_id: u64) -> String {
        if reply_id == 0 {
            self.thread(id)
        } else {
            format!("{}#pc{reply_id}", self.thread(id))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiffEngine {
    links: LinkBuilder,
}

impl DiffEngine {
    pub fn new(links: LinkBuilder) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Classifies every thread of `current` against `previous`.
    ///
    /// All new-thread intents come first, then all update intents; each group
    /// keeps the order of `current`.
    pub fn classify(&self, previous: &Generation, current: &Generation) -> Vec<NotificationIntent> {
        let mut fresh = Vec::new();
        let mut updated = Vec::new();

        for thread in current {
            match classify_thread(previous, thread) {
                Classification::New => fresh.push(self.new_thread_intent(thread)),
                Classification::Updated => updated.push(self.updated_thread_intent(thread)),
                Classification::Unchanged => {}
            }
        }

        fresh.extend(updated);
        fresh
    }

    fn new_thread_intent(&self, thread: &Thread) -> NotificationIntent {
        NotificationIntent::NewThread {
            id: thread.id,
            link: self.links.thread(thread.id),
            subject: thread.subject.clone(),
            content: thread.content.clone(),
        }
    }

    fn updated_thread_intent(&self, thread: &Thread) -> NotificationIntent {
        NotificationIntent::UpdatedThread {
            id: thread.id,
            link: self.links.reply(thread.id, thread.last_reply_id()),
            subject: thread.subject.clone(),
            reply_count: thread.reply_count,
            last_reply_author: thread.last_reply_author().to_string(),
            last_reply_content: thread.last_reply_content().to_string(),
        }
    }
}
