use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, info, warn};

use threadwatch_core::{Keywords, NotificationIntent};

use crate::notice::Notice;
use crate::sink::NotificationSink;

pub const DEFAULT_DEDUPE_CAPACITY: usize = 4096;

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent={} duplicates={} filtered={} failed={}",
            self.sent, self.duplicates, self.filtered, self.failed
        )
    }
}

/// Forwards intents to a [`NotificationSink`].
///
/// New-thread ids enter the de-duplication cache only after a successful
/// send, so a failed announcement is retried by the next cycle that still
/// sees the thread as new.  When the cache is full the least recently
/// announced id is evicted.  Update intents pass only when the last reply
/// mentions a keyword.
pub struct Dispatcher<S> {
    sink: S,
    board: String,
    keywords: Keywords,
    delivered: LruCache<u64, ()>,
}

impl<S: NotificationSink> Dispatcher<S> {
    pub fn new(
        sink: S,
        board: impl Into<String>,
        keywords: Keywords,
        capacity: NonZeroUsize,
    ) -> Self {
        Self {
            sink,
            board: board.into(),
            keywords,
            delivered: LruCache::new(capacity),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn already_delivered(&self, id: u64) -> bool {
        self.delivered.contains(&id)
    }

    pub fn delivered_len(&self) -> usize {
        self.delivered.len()
    }

    /// Sends every admissible intent in order.  Failures are logged and
    /// counted; nothing is retried within the pass.
    pub async fn dispatch(&mut self, intents: &[NotificationIntent]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for intent in intents {
            let id = intent.id();
            match intent {
                NotificationIntent::NewThread { .. } if self.already_delivered(id) => {
                    debug!(id, "new thread already announced, skipping");
                    report.duplicates += 1;
                    continue;
                }
                NotificationIntent::UpdatedThread {
                    last_reply_content, ..
                } if !self.keywords.matches(last_reply_content) => {
                    debug!(id, "last reply has no keyword, update dropped");
                    report.filtered += 1;
                    continue;
                }
                _ => {}
            }

            let (channel, notice) = Notice::render(&self.board, intent);
            match self.sink.send(channel, &notice).await {
                Ok(()) => {
                    info!(id, %channel, link = intent.link(), "notification sent");
                    report.sent += 1;
                    if intent.is_new() {
                        self.delivered.put(id, ());
                    }
                }
                Err(err) => {
                    warn!(id, %channel, error = %err, "notification failed");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
