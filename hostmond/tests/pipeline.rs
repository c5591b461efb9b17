use chrono::NaiveDate;
use hostmond::alerts::{AlertEngine, LogNotifier};
use hostmond::api::{self, AppState};
use hostmond::collectors::MetricsSource;
use hostmond::error::Result;
use hostmond::{HistoryBuffer, Metrics, MetricsStore, SamplingLoop, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Deterministic source: one snapshot per call, five seconds apart.
struct SteppingSource {
    next: i64,
}

impl MetricsSource for SteppingSource {
    fn collect(&mut self) -> Result<Metrics> {
        let base = NaiveDate::from_ymd_opt(2025, 3, 30)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let n = self.next;
        self.next += 1;
        Ok(Metrics {
            timestamp: base + chrono::Duration::seconds(n * 5),
            cpu_usage: 20.0,
            memory_usage: 30.0,
            disk_read: n as f64,
            disk_write: n as f64,
            network_sent: 0.5,
            network_received: 0.5,
        })
    }
}

fn sampling(
    start: i64,
    history: Arc<HistoryBuffer>,
    store: Arc<MetricsStore>,
) -> SamplingLoop<SteppingSource> {
    SamplingLoop::new(
        SteppingSource { next: start },
        history,
        AlertEngine::default(),
        Arc::new(LogNotifier),
        Duration::from_millis(5),
    )
    .with_store(store)
}

#[tokio::test]
async fn store_survives_restart_while_history_does_not() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("metrics.db");

    // first process lifetime
    {
        let store = Arc::new(MetricsStore::new(&db).await.unwrap());
        let history = Arc::new(HistoryBuffer::new(3));
        let mut sampling = sampling(0, Arc::clone(&history), Arc::clone(&store));
        for _ in 0..7 {
            assert!(sampling.tick().await.persisted);
        }
        assert_eq!(history.len(), 3);
        store.close().await;
    }

    // second process lifetime
    let store = Arc::new(MetricsStore::new(&db).await.unwrap());
    let history = Arc::new(HistoryBuffer::new(3));
    assert!(history.is_empty());
    assert_eq!(store.count().await.unwrap(), 7);

    let mut sampling = sampling(7, Arc::clone(&history), Arc::clone(&store));
    sampling.tick().await;
    assert_eq!(store.count().await.unwrap(), 8);

    let rows = store.recent(100).await.unwrap();
    let reads: Vec<f64> = rows.iter().map(|m| m.disk_read).collect();
    assert_eq!(reads, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    assert_eq!(history.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_endpoint_serves_what_sampler_appends() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MetricsStore::new(dir.path().join("metrics.db"))
            .await
            .unwrap(),
    );
    let history = Arc::new(HistoryBuffer::new(50));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::router(AppState {
        history: Arc::clone(&history),
        chart_path: dir.path().join("metrics_plot.svg"),
        thresholds: Default::default(),
    });

    let mut scheduler = Scheduler::new();
    scheduler.spawn_sampling(sampling(0, Arc::clone(&history), Arc::clone(&store)));
    scheduler.spawn_serving(listener, app);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let samples: Vec<Metrics> = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!samples.is_empty());
    for pair in samples.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }

    scheduler.shutdown().await;
    // every appended snapshot was persisted first
    let rows = store.count().await.unwrap() as usize;
    assert!(rows >= history.len());
}
