use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical, sanitized thread record used for comparison and persistence.
///
/// `id` and `last_modified` are mandatory when decoding; every other field
/// falls back to its zero value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: u64,
    pub last_modified: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reply: Option<LastReply>,
}

/// The most recent reply known when the catalog was fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastReply {
    pub id: u64,
    pub timestamp: i64,
    pub author: String,
    pub content: String,
}

impl Thread {
    pub fn new(id: u64, last_modified: i64) -> Self {
        Self {
            id,
            last_modified,
            subject: String::new(),
            author: String::new(),
            content: String::new(),
            reply_count: 0,
            image_count: 0,
            last_reply: None,
        }
    }

    pub fn last_reply_id(&self) -> u64 {
        self.last_reply.as_ref().map(|r| r.id).unwrap_or_default()
    }

    pub fn last_reply_timestamp(&self) -> i64 {
        self.last_reply.as_ref().map(|r| r.timestamp).unwrap_or_default()
    }

    pub fn last_reply_author(&self) -> &str {
        self.last_reply
            .as_ref()
            .map(|r| r.author.as_str())
            .unwrap_or_default()
    }

    pub fn last_reply_content(&self) -> &str {
        self.last_reply
            .as_ref()
            .map(|r| r.content.as_str())
            .unwrap_or_default()
    }
}

/// Ordered set of threads from one poll cycle, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    threads: Vec<Thread>,
    positions: HashMap<u64, usize>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `thread` unless its id is already present; the first
    /// occurrence wins.  Returns whether the thread was added.
    pub fn insert(&mut self, thread: Thread) -> bool {
        if self.positions.contains_key(&thread.id) {
            return false;
        }
        self.positions.insert(thread.id, self.threads.len());
        self.threads.push(thread);
        true
    }

    pub fn get(&self, id: u64) -> Option<&Thread> {
        self.positions.get(&id).map(|&idx| &self.threads[idx])
    }

    pub fn contains(&self, id: u64) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Thread> {
        self.threads.iter()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn into_threads(self) -> Vec<Thread> {
        self.threads
    }
}

impl FromIterator<Thread> for Generation {
    fn from_iter<I: IntoIterator<Item = Thread>>(iter: I) -> Self {
        let mut generation = Generation::new();
        for thread in iter {
            generation.insert(thread);
        }
        generation
    }
}

impl<'a> IntoIterator for &'a Generation {
    type Item = &'a Thread;
    type IntoIter = std::slice::Iter<'a, Thread>;

    fn into_iter(self) -> Self::IntoIter {
        self.threads.iter()
    }
}
