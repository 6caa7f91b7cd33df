use tracing::debug;

use crate::catalog::{CatalogPage, RawThread};
use crate::relevance::Keywords;
use crate::sanitize::Sanitizer;
use crate::thread::{Generation, LastReply, Thread};

/// Maps raw catalog entries onto [`Thread`]s and assembles a [`Generation`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    sanitizer: Sanitizer,
    keywords: Keywords,
}

impl Normalizer {
    pub fn new(sanitizer: Sanitizer, keywords: Keywords) -> Self {
        Self {
            sanitizer,
            keywords,
        }
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    /// Thread-level relevance: a keyword in the raw subject or body.
    pub fn is_relevant(&self, raw: &RawThread) -> bool {
        self.keywords.matches_any(&[raw.subject(), raw.body()])
    }

    pub fn normalize(&self, raw: &RawThread) -> Thread {
        let last_reply = raw.latest_reply().map(|reply| LastReply {
            id: reply.no,
            timestamp: reply.time,
            author: self.sanitizer.sanitize(reply.author()),
            content: self.sanitizer.sanitize(reply.body()),
        });

        Thread {
            id: raw.no,
            last_modified: raw.last_modified,
            subject: self.sanitizer.sanitize(raw.subject()),
            author: self.sanitizer.sanitize(raw.author()),
            content: self.sanitizer.sanitize(raw.body()),
            reply_count: raw.replies,
            image_count: raw.images,
            last_reply,
        }
    }

    /// Scans pages in order and keeps every relevant thread once.
    ///
    /// A thread listed on several pages is taken from its first listing.
    /// Entries without a thread number are skipped.
    pub fn build_generation(&self, pages: &[CatalogPage]) -> Generation {
        let mut generation = Generation::new();
        for page in pages {
            for raw in &page.threads {
                if raw.no == 0 {
                    debug!(page = page.page, "catalog entry without thread number skipped");
                    continue;
                }
                if !self.is_relevant(raw) {
                    continue;
                }
                if generation.contains(raw.no) {
                    debug!(id = raw.no, page = page.page, "duplicate catalog listing ignored");
                    continue;
                }
                generation.insert(self.normalize(raw));
            }
        }
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RawReply;

    fn normalizer(keywords: &[&str]) -> Normalizer {
        Normalizer::new(Sanitizer::default(), Keywords::new(keywords))
    }

    fn raw(no: u64, sub: &str, com: &str) -> RawThread {
        RawThread {
            no,
            sub: Some(sub.to_string()),
            com: Some(com.to_string()),
            name: Some("Anonymous".to_string()),
            last_modified: 1_000 + no as i64,
            ..Default::default()
        }
    }

    fn page(page: u32, threads: Vec<RawThread>) -> CatalogPage {
        CatalogPage { page, threads }
    }

    #[test]
    fn text_fields_are_sanitized() {
        let mut entry = raw(1, "ABC &amp; friends", "line one<br>line two\n<b>bold</b>");
        entry.replies = 4;
        entry.images = 2;
        let thread = normalizer(&["abc"]).normalize(&entry);
        assert_eq!(thread.id, 1);
        assert_eq!(thread.last_modified, 1_001);
        assert_eq!(thread.subject, "ABC & friends");
        assert_eq!(thread.author, "Anonymous");
        assert_eq!(thread.content, "line one line two bold");
        assert_eq!(thread.reply_count, 4);
        assert_eq!(thread.image_count, 2);
        assert!(thread.last_reply.is_none());
    }

    #[test]
    fn last_listed_reply_becomes_last_reply() {
        let mut entry = raw(2, "ABC", "");
        entry.last_replies = vec![
            RawReply {
                no: 10,
                name: Some("early".to_string()),
                com: Some("older".to_string()),
                time: 50,
            },
            RawReply {
                no: 11,
                name: Some("late".to_string()),
                com: Some("newer &gt;&gt;10".to_string()),
                time: 60,
            },
        ];
        let thread = normalizer(&["abc"]).normalize(&entry);
        let reply = thread.last_reply.unwrap();
        assert_eq!(reply.id, 11);
        assert_eq!(reply.timestamp, 60);
        assert_eq!(reply.author, "late");
        assert_eq!(reply.content, "newer >>10");
    }

    #[test]
    fn reply_without_optional_fields_is_tolerated() {
        let mut entry = raw(3, "ABC", "");
        entry.last_replies = vec![RawReply {
            no: 12,
            ..Default::default()
        }];
        let thread = normalizer(&["abc"]).normalize(&entry);
        assert_eq!(thread.last_reply_id(), 12);
        assert_eq!(thread.last_reply_content(), "");
    }

    #[test]
    fn irrelevant_threads_are_dropped() {
        let pages = vec![page(
            1,
            vec![
                raw(1, "ABC coin", ""),
                raw(2, "weather", "nice day"),
                raw(3, "", "I bought some abc"),
            ],
        )];
        let generation = normalizer(&["ABC"]).build_generation(&pages);
        let ids: Vec<u64> = generation.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn no_keywords_admits_nothing() {
        let pages = vec![page(1, vec![raw(1, "ABC coin", "")])];
        assert!(normalizer(&[]).build_generation(&pages).is_empty());
    }

    #[test]
    fn cross_listed_thread_is_kept_once() {
        let mut relisted = raw(5, "ABC again", "");
        relisted.last_modified = 9_999;
        let pages = vec![
            page(1, vec![raw(5, "ABC", ""), raw(6, "ABC", "")]),
            page(2, vec![relisted, raw(7, "ABC", "")]),
        ];
        let generation = normalizer(&["abc"]).build_generation(&pages);
        assert_eq!(generation.len(), 3);
        assert_eq!(generation.get(5).unwrap().subject, "ABC");
        assert_eq!(generation.get(5).unwrap().last_modified, 1_005);
    }

    #[test]
    fn entries_without_number_are_skipped() {
        let pages = vec![page(1, vec![raw(0, "ABC", ""), raw(8, "ABC", "")])];
        let generation = normalizer(&["abc"]).build_generation(&pages);
        assert_eq!(generation.len(), 1);
        assert!(generation.contains(8));
    }
}
