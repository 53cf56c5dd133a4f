use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use newsdash::types::{DashboardError, FeedConfig, ProcessingStatus, RawEntry, Result};
use newsdash::{
    item_id, AppConfig, FeedSource, MockEnricher, NewsPipeline, NotificationPermission, Notifier,
    RefreshOutcome, RefreshScheduler, SnapshotStore,
};
use uuid::Uuid;

/// Feed source whose entries, failure mode and latency are scripted by the
/// test.
struct ScriptedSource {
    config: FeedConfig,
    entries: Mutex<Vec<RawEntry>>,
    fail: AtomicBool,
    delay_ms: u64,
}

impl ScriptedSource {
    fn new(id: &str, entries: Vec<RawEntry>) -> Arc<Self> {
        Self::slow(id, entries, 0)
    }

    fn slow(id: &str, entries: Vec<RawEntry>, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            config: FeedConfig {
                id: id.to_string(),
                name: format!("Scripted {}", id),
                url: format!("https://feeds.test/{}", id),
                color: String::new(),
            },
            entries: Mutex::new(entries),
            fail: AtomicBool::new(false),
            delay_ms,
        })
    }

    fn set_entries(&self, entries: Vec<RawEntry>) {
        *self.entries.lock().unwrap() = entries;
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    fn config(&self) -> &FeedConfig {
        &self.config
    }

    async fn fetch(&self) -> Result<Vec<RawEntry>> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DashboardError::General("scripted outage".to_string()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }
}

/// Notifier that records deliveries instead of performing them.
struct RecordingNotifier {
    permission: NotificationPermission,
    deliveries: AtomicUsize,
}

impl RecordingNotifier {
    fn granted() -> Arc<Self> {
        Arc::new(Self {
            permission: NotificationPermission::Granted,
            deliveries: AtomicUsize::new(0),
        })
    }

    fn denied() -> Arc<Self> {
        Arc::new(Self {
            permission: NotificationPermission::Denied,
            deliveries: AtomicUsize::new(0),
        })
    }

    fn delivery_count(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn permission(&self) -> NotificationPermission {
        self.permission
    }

    async fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn entry(link: &str, minutes_ago: i64) -> RawEntry {
    RawEntry {
        title: format!("Article {}", link),
        content: format!("Body of article {}", link),
        link: format!("https://example.com/{}", link),
        published_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
    }
}

fn test_config(concurrency: usize) -> AppConfig {
    AppConfig {
        feeds: Vec::new(),
        refresh_interval_secs: 900,
        source_timeout_secs: 5,
        enrich_concurrency: concurrency,
        max_items: 30,
        target_language: "Korean".to_string(),
    }
}

fn build_pipeline(
    sources: Vec<Arc<ScriptedSource>>,
    enricher: Arc<MockEnricher>,
    notifier: Arc<RecordingNotifier>,
    concurrency: usize,
) -> NewsPipeline {
    let sources: Vec<Arc<dyn FeedSource>> = sources
        .into_iter()
        .map(|s| s as Arc<dyn FeedSource>)
        .collect();
    NewsPipeline::new(sources, enricher, notifier, &test_config(concurrency))
}

async fn wait_for<F>(store: &Arc<SnapshotStore>, predicate: F) -> bool
where
    F: Fn(&[newsdash::NewsItem]) -> bool,
{
    for _ in 0..300 {
        let snapshot = store.snapshot().await;
        if predicate(&snapshot) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn wait_for_drain(pipeline: &NewsPipeline) -> bool {
    for _ in 0..300 {
        if pipeline.dispatcher().in_flight_count().await == 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

#[tokio::test]
async fn refresh_populates_enriches_and_notifies() {
    init_tracing();

    let sources = vec![
        ScriptedSource::new("alpha", vec![entry("a", 1)]),
        ScriptedSource::new("beta", vec![entry("b", 2)]),
        ScriptedSource::new("gamma", vec![entry("c", 3)]),
    ];
    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(sources, enricher.clone(), notifier.clone(), 3);

    let outcome = pipeline.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Merged { has_new: true });
    assert_eq!(notifier.delivery_count(), 1);

    let store = pipeline.store().clone();
    assert!(store.last_updated().await.is_some());
    assert!(store.next_update().await.is_some());
    assert!(!store.is_loading().await);

    let all_completed = wait_for(&store, |items| {
        items.len() == 3
            && items
                .iter()
                .all(|i| i.status == ProcessingStatus::Completed)
    })
    .await;
    assert!(all_completed, "all three items should reach COMPLETED");
    assert_eq!(enricher.call_count(), 3);

    let snapshot = store.snapshot().await;
    for item in snapshot.iter() {
        assert!(item.translated_title.as_deref().unwrap().starts_with("[translated]"));
    }

    // A refresh with nothing new does not notify again.
    let outcome = pipeline.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Merged { has_new: false });
    assert_eq!(notifier.delivery_count(), 1);
}

#[tokio::test]
async fn completed_work_survives_later_refreshes() {
    init_tracing();

    let source = ScriptedSource::new("alpha", vec![entry("a", 1)]);
    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(vec![source.clone()], enricher.clone(), notifier, 2);

    pipeline.refresh().await;
    let store = pipeline.store().clone();
    assert!(
        wait_for(&store, |items| {
            items.iter().all(|i| i.status == ProcessingStatus::Completed)
        })
        .await
    );
    let first_title = store.snapshot().await[0].translated_title.clone();

    source.set_entries(vec![entry("a", 1), entry("d", 0)]);
    let outcome = pipeline.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Merged { has_new: true });

    let store = pipeline.store().clone();
    let a_id = item_id("alpha", "https://example.com/a");
    let snapshot = store.snapshot().await;
    let a = snapshot.iter().find(|i| i.id == a_id).unwrap();
    assert_eq!(a.status, ProcessingStatus::Completed);
    assert_eq!(a.translated_title, first_title);
    assert!(!a.is_new);

    assert!(
        wait_for(&store, |items| {
            items.len() == 2 && items.iter().all(|i| i.status == ProcessingStatus::Completed)
        })
        .await
    );
    // Only the genuinely new item was enriched again.
    assert_eq!(enricher.call_count(), 2);
}

#[tokio::test]
async fn processing_items_are_not_enriched_twice() {
    init_tracing();

    let source = ScriptedSource::new("alpha", vec![entry("a", 1)]);
    let enricher = MockEnricher::new().with_delay(300).into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(vec![source], enricher.clone(), notifier, 2);

    pipeline.refresh().await;

    // Rescan while the first attempt is still running.
    pipeline.dispatcher().scan().await;
    pipeline.dispatcher().scan().await;

    assert!(wait_for_drain(&pipeline).await);
    assert_eq!(enricher.call_count(), 1);
}

#[tokio::test]
async fn failed_items_stay_failed_until_retried() {
    init_tracing();

    let source = ScriptedSource::new("alpha", vec![entry("doomed", 1)]);
    let enricher = MockEnricher::new().failing_on("doomed").into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(vec![source], enricher.clone(), notifier, 2);

    pipeline.refresh().await;
    let store = pipeline.store().clone();
    assert!(
        wait_for(&store, |items| {
            items.iter().any(|i| i.status == ProcessingStatus::Failed)
        })
        .await
    );
    assert_eq!(enricher.call_count(), 1);

    // The automatic scan never picks the failed item up again.
    pipeline.dispatcher().scan().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(enricher.call_count(), 1);

    // An explicit retry does.
    let id = item_id("alpha", "https://example.com/doomed");
    assert!(pipeline.retry_item(id).await);
    assert!(wait_for_drain(&pipeline).await);
    assert_eq!(enricher.call_count(), 2);
    assert_eq!(
        store.snapshot().await[0].status,
        ProcessingStatus::Failed
    );

    // Retrying something that is not failed is refused.
    assert!(!pipeline.retry_item(Uuid::nil()).await);
}

#[tokio::test]
async fn enrichment_concurrency_is_bounded() {
    init_tracing();

    let entries: Vec<RawEntry> = (0..8).map(|n| entry(&format!("p{}", n), n)).collect();
    let source = ScriptedSource::new("alpha", entries);
    let enricher = MockEnricher::new().with_delay(100).into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(vec![source], enricher.clone(), notifier, 2);

    pipeline.refresh().await;
    let store = pipeline.store().clone();
    assert!(
        wait_for(&store, |items| {
            items.len() == 8 && items.iter().all(|i| i.status == ProcessingStatus::Completed)
        })
        .await
    );

    assert_eq!(enricher.call_count(), 8);
    assert!(
        enricher.peak_concurrency() <= 2,
        "worker pool exceeded its bound: {}",
        enricher.peak_concurrency()
    );
}

#[tokio::test]
async fn overlapping_refreshes_are_rejected() {
    init_tracing();

    let source = ScriptedSource::slow("alpha", vec![entry("a", 1)], 300);
    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = Arc::new(build_pipeline(vec![source], enricher, notifier, 2));

    let background = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(pipeline.refresh().await, RefreshOutcome::AlreadyRunning);
    assert_eq!(
        background.await.unwrap(),
        RefreshOutcome::Merged { has_new: true }
    );
}

#[tokio::test]
async fn one_failing_source_does_not_abort_the_cycle() {
    init_tracing();

    let healthy = ScriptedSource::new("alpha", vec![entry("a", 1)]);
    let broken = ScriptedSource::new("beta", vec![entry("b", 2)]);
    broken.set_failing(true);

    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(vec![healthy, broken], enricher, notifier, 2);

    let outcome = pipeline.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Merged { has_new: true });

    let snapshot = pipeline.store().snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].source_id, "alpha");
}

#[tokio::test]
async fn all_sources_failing_keeps_the_previous_snapshot() {
    init_tracing();

    let alpha = ScriptedSource::new("alpha", vec![entry("a", 1)]);
    let beta = ScriptedSource::new("beta", vec![entry("b", 2)]);
    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(
        vec![alpha.clone(), beta.clone()],
        enricher,
        notifier,
        2,
    );

    pipeline.refresh().await;
    let store = pipeline.store().clone();
    let before: Vec<Uuid> = store.snapshot().await.iter().map(|i| i.id).collect();
    assert_eq!(before.len(), 2);

    alpha.set_failing(true);
    beta.set_failing(true);
    let outcome = pipeline.refresh().await;
    assert_eq!(outcome, RefreshOutcome::AllSourcesFailed);

    let after: Vec<Uuid> = store.snapshot().await.iter().map(|i| i.id).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn in_flight_enrichment_for_a_dropped_item_completes_harmlessly() {
    init_tracing();

    let source = ScriptedSource::new("alpha", vec![entry("old", 500)]);
    let enricher = MockEnricher::new().with_delay(200).into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = build_pipeline(vec![source.clone()], enricher.clone(), notifier, 4);

    pipeline.refresh().await;
    let old_id = item_id("alpha", "https://example.com/old");

    // While "old" is being enriched, the feed moves on without it.
    let replacement: Vec<RawEntry> = (0..5).map(|n| entry(&format!("new{}", n), n)).collect();
    source.set_entries(replacement);
    pipeline.refresh().await;

    let store = pipeline.store().clone();
    assert!(wait_for_drain(&pipeline).await);

    let snapshot = store.snapshot().await;
    assert!(snapshot.iter().all(|i| i.id != old_id));
    assert!(
        wait_for(&store, |items| {
            items.iter().all(|i| i.status == ProcessingStatus::Completed)
        })
        .await
    );
}

#[tokio::test]
async fn scheduler_fires_periodically_and_stops_cleanly() {
    init_tracing();

    let source = ScriptedSource::new("alpha", vec![entry("a", 1)]);
    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::granted();
    let pipeline = Arc::new(build_pipeline(vec![source], enricher, notifier, 2));

    let scheduler = RefreshScheduler::new(pipeline.clone(), Duration::from_millis(100));
    scheduler.start().await.unwrap();
    assert!(scheduler.start().await.is_err(), "double start is rejected");

    // The first tick fires immediately; give a couple of periods.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let store = pipeline.store().clone();
    assert!(store.last_updated().await.is_some());

    scheduler.stop().await;
    let stamp = store.last_updated().await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(store.last_updated().await, stamp, "no refreshes after stop");
}

#[tokio::test]
async fn denied_notification_permission_suppresses_delivery() {
    init_tracing();

    let source = ScriptedSource::new("alpha", vec![entry("a", 1)]);
    let enricher = MockEnricher::new().into_shared();
    let notifier = RecordingNotifier::denied();
    let pipeline = build_pipeline(vec![source], enricher, notifier.clone(), 2);

    let outcome = pipeline.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Merged { has_new: true });
    assert_eq!(notifier.delivery_count(), 0);
}
