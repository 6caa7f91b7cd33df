use std::fmt;

use anyhow::{Context, Result};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use threadwatch_config::AppConfig;
use threadwatch_core::{
    DiffEngine, Generation, Keywords, LinkBuilder, Normalizer, NotificationIntent, Sanitizer,
};
use threadwatch_dispatch::{DispatchReport, Dispatcher, NotificationSink};
use threadwatch_snapshot::SnapshotStore;

use crate::catalog::CatalogSource;

/// What one cycle saw and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Threads in the generation loaded from the store.
    pub previous: usize,
    /// Catalog entries across all pages, before filtering.
    pub fetched: usize,
    /// Threads in the new generation.
    pub relevant: usize,
    pub new: usize,
    pub updated: usize,
    pub dispatch: DispatchReport,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "previous={} fetched={} relevant={} new={} updated={} {}",
            self.previous, self.fetched, self.relevant, self.new, self.updated, self.dispatch
        )
    }
}

/// Runs poll cycles against one board.
pub struct Watcher<C, T, S> {
    catalog: C,
    store: T,
    normalizer: Normalizer,
    engine: DiffEngine,
    dispatcher: Dispatcher<S>,
}

impl<C, T, S> Watcher<C, T, S>
where
    C: CatalogSource,
    T: SnapshotStore,
    S: NotificationSink,
{
    pub fn new(
        catalog: C,
        store: T,
        normalizer: Normalizer,
        engine: DiffEngine,
        dispatcher: Dispatcher<S>,
    ) -> Self {
        Self {
            catalog,
            store,
            normalizer,
            engine,
            dispatcher,
        }
    }

    pub fn from_config(config: &AppConfig, catalog: C, store: T, sink: S) -> Result<Self> {
        config.validate()?;
        let keywords = Keywords::new(&config.watch.keywords);
        if keywords.is_empty() {
            warn!("no keywords configured, every catalog entry will be ignored");
        }

        let sanitizer = Sanitizer::new(config.watch.max_text_len);
        let normalizer = Normalizer::new(sanitizer, keywords.clone());
        let engine = DiffEngine::new(LinkBuilder::new(
            config.watch.thread_base.as_str(),
            config.watch.board.as_str(),
        ));
        let dispatcher = Dispatcher::new(
            sink,
            config.watch.board.as_str(),
            keywords,
            config.dedupe_capacity()?,
        );
        Ok(Self::new(catalog, store, normalizer, engine, dispatcher))
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// One full cycle, persisted before returning.
    ///
    /// A failed catalog fetch or an unreadable store ends the cycle with an
    /// error and leaves the snapshot untouched.  Send failures do not: the
    /// new generation is saved regardless.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let span = info_span!("cycle", cycle_id = %Uuid::new_v4());
        self.cycle().instrument(span).await
    }

    async fn cycle(&mut self) -> Result<CycleReport> {
        self.sanitize_store("before");

        let previous = self.store.load().context("failed to load previous snapshot")?;
        let pages = self.catalog.fetch().await.context("catalog fetch failed")?;
        let fetched = pages.iter().map(|page| page.threads.len()).sum();

        let current = self.normalizer.build_generation(&pages);
        let intents = self.engine.classify(&previous, &current);
        log_intents(&current, &intents);

        let dispatch = self.dispatcher.dispatch(&intents).await;

        self.store
            .save(&current)
            .context("failed to persist snapshot")?;
        self.sanitize_store("after");

        let new = intents.iter().filter(|intent| intent.is_new()).count();
        let report = CycleReport {
            previous: previous.len(),
            fetched,
            relevant: current.len(),
            new,
            updated: intents.len() - new,
            dispatch,
        };
        info!(%report, "cycle complete");
        Ok(report)
    }

    fn sanitize_store(&self, stage: &'static str) {
        match self.store.sanitize() {
            Ok(report) if report.dropped > 0 || report.header_restored => {
                warn!(
                    stage,
                    dropped = report.dropped,
                    kept = report.kept,
                    header_restored = report.header_restored,
                    "snapshot sanitized"
                );
            }
            Ok(_) => {}
            Err(err) => {
                let err = anyhow::Error::new(err);
                warn!(stage, error = %format!("{err:#}"), "snapshot sanitization failed");
            }
        }
    }
}

fn log_intents(current: &Generation, intents: &[NotificationIntent]) {
    for intent in intents {
        let Some(thread) = current.get(intent.id()) else {
            continue;
        };
        if intent.is_new() {
            info!(
                id = thread.id,
                subject = %thread.subject,
                author = %thread.author,
                link = intent.link(),
                replies = thread.reply_count,
                images = thread.image_count,
                "new thread"
            );
        } else {
            info!(
                id = thread.id,
                subject = %thread.subject,
                link = intent.link(),
                replies = thread.reply_count,
                images = thread.image_count,
                last_reply_id = thread.last_reply_id(),
                last_reply_at = thread.last_reply_timestamp(),
                last_reply_author = %thread.last_reply_author(),
                last_reply = %thread.last_reply_content(),
                "thread updated"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use threadwatch_core::{CatalogPage, RawReply, RawThread, Thread};
    use threadwatch_dispatch::Channel;
    use threadwatch_snapshot::JsonlSnapshotStore;

    use super::*;
    use crate::testing::{FakeCatalog, RecordingSink};

    type TestWatcher = Watcher<FakeCatalog, JsonlSnapshotStore, RecordingSink>;

    fn config(keywords: &[&str]) -> AppConfig {
        let mut config = AppConfig::default();
        config.watch.keywords = keywords.iter().map(|k| k.to_string()).collect();
        config.watch.thread_base = "https://boards.example.org".to_string();
        config
    }

    fn watcher(dir: &TempDir, catalog: FakeCatalog, sink: RecordingSink) -> TestWatcher {
        let store = JsonlSnapshotStore::new(dir.path().join("threads.jsonl"));
        Watcher::from_config(&config(&["ABC"]), catalog, store, sink).unwrap()
    }

    fn entry(no: u64, sub: &str, last_modified: i64) -> RawThread {
        RawThread {
            no,
            sub: Some(sub.to_string()),
            last_modified,
            ..Default::default()
        }
    }

    fn pages(threads: Vec<RawThread>) -> Vec<CatalogPage> {
        vec![CatalogPage { page: 1, threads }]
    }

    #[tokio::test]
    async fn first_sighting_is_announced_and_persisted() {
        let dir = TempDir::new().unwrap();
        let catalog = FakeCatalog::new(vec![pages(vec![entry(1, "ABC coin", 10)])]);
        let sink = RecordingSink::default();
        let mut watcher = watcher(&dir, catalog, sink.clone());

        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.new, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.dispatch.sent, 1);

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Channel::NewThreads);
        assert_eq!(sent[0].1.url, "https://boards.example.org/biz/thread/1");

        let stored = watcher.store().load().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored.contains(1));
    }

    #[tokio::test]
    async fn update_without_keyword_in_reply_reaches_no_sink() {
        let dir = TempDir::new().unwrap();
        let store = JsonlSnapshotStore::new(dir.path().join("threads.jsonl"));
        let mut prior = Thread::new(1, 100);
        prior.subject = "ABC".to_string();
        store.save(&Generation::from_iter([prior])).unwrap();

        let mut updated = entry(1, "ABC", 105);
        updated.last_replies = vec![RawReply {
            no: 2,
            com: Some("no keyword here".to_string()),
            ..Default::default()
        }];
        let catalog = FakeCatalog::new(vec![pages(vec![updated])]);
        let sink = RecordingSink::default();
        let mut watcher = watcher(&dir, catalog, sink.clone());

        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.new, 0);
        assert_eq!(report.updated, 1);
        assert_eq!(report.dispatch.filtered, 1);
        assert!(sink.sent().is_empty());
        assert_eq!(watcher.store().load().unwrap().get(1).unwrap().last_modified, 105);
    }

    #[tokio::test]
    async fn unchanged_catalog_is_quiet_on_second_cycle() {
        let dir = TempDir::new().unwrap();
        let listing = pages(vec![entry(1, "ABC", 10), entry(2, "weather", 10)]);
        let catalog = FakeCatalog::new(vec![listing.clone(), listing]);
        let sink = RecordingSink::default();
        let mut watcher = watcher(&dir, catalog, sink.clone());

        let first = watcher.run_cycle().await.unwrap();
        let second = watcher.run_cycle().await.unwrap();
        assert_eq!(first.fetched, 2);
        assert_eq!(first.relevant, 1);
        assert_eq!(second.previous, 1);
        assert_eq!(second.new + second.updated, 0);
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_announcement_is_retried_next_cycle_only_if_still_new() {
        let dir = TempDir::new().unwrap();
        let listing = pages(vec![entry(1, "ABC", 10)]);
        let catalog = FakeCatalog::new(vec![listing.clone(), listing]);
        let sink = RecordingSink::default();
        sink.set_failing(true);
        let mut watcher = watcher(&dir, catalog, sink.clone());

        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.dispatch.failed, 1);
        // Persisted even though the send failed.
        assert!(watcher.store().load().unwrap().contains(1));

        sink.set_failing(false);
        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.new, 0);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = JsonlSnapshotStore::new(dir.path().join("threads.jsonl"));
        store
            .save(&Generation::from_iter([Thread::new(1, 100)]))
            .unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let catalog = FakeCatalog::new(Vec::new());
        let sink = RecordingSink::default();
        let mut watcher = watcher(&dir, catalog, sink.clone());

        let err = watcher.run_cycle().await.unwrap_err();
        assert!(err.to_string().contains("catalog fetch failed"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn malformed_snapshot_lines_are_dropped_before_loading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("threads.jsonl");
        let good = serde_json::to_string(&Thread::new(1, 100)).unwrap();
        fs::write(&path, format!("header\n{good}\n{{broken\n")).unwrap();

        let catalog = FakeCatalog::new(vec![pages(vec![entry(1, "ABC", 100)])]);
        let sink = RecordingSink::default();
        let mut watcher = watcher(&dir, catalog, sink.clone());

        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.previous, 1);
        assert_eq!(report.new + report.updated, 0);
        assert!(!fs::read_to_string(&path).unwrap().contains("{broken"));
    }

    #[tokio::test]
    async fn snapshot_line_that_is_not_utf8_does_not_stall_cycles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("threads.jsonl");
        let good = serde_json::to_string(&Thread::new(1, 100)).unwrap();
        let mut raw = format!("header\n{good}\n").into_bytes();
        raw.extend_from_slice(b"{\"id\":2,\"last_mo\xff\xfe\n");
        fs::write(&path, raw).unwrap();

        let listing = pages(vec![entry(1, "ABC", 100)]);
        let catalog = FakeCatalog::new(vec![listing.clone(), listing]);
        let mut watcher = watcher(&dir, catalog, RecordingSink::default());

        let first = watcher.run_cycle().await.unwrap();
        assert_eq!(first.previous, 1);
        assert_eq!(first.new + first.updated, 0);
        let second = watcher.run_cycle().await.unwrap();
        assert_eq!(second.previous, 1);
        assert!(fs::read_to_string(&path).is_ok());
    }

    #[test]
    fn zero_interval_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&["ABC"]);
        config.watch.poll_interval_secs = 0;
        let store = JsonlSnapshotStore::new(dir.path().join("threads.jsonl"));
        let result = Watcher::from_config(
            &config,
            FakeCatalog::new(Vec::new()),
            store,
            RecordingSink::default(),
        );
        assert!(result.is_err());
    }
}
