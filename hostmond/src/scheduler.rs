//! The three long-running activities and their shared shutdown signal.
//!
//! Sampling, rendering and serving each run as their own tokio task and share
//! nothing but the `HistoryBuffer`. A failure inside one tick is logged where
//! it happens; only the shutdown signal ends a loop.

use crate::alerts::{AlertEngine, AlertJournal, AlertMessage, AlertSink};
use crate::chart::ChartSink;
use crate::collectors::MetricsSource;
use crate::error::MonitorError;
use crate::history::HistoryBuffer;
use crate::store::MetricsStore;
use crate::types::Metrics;
use axum::Router;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Outcome of one sampling tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// `None` when the source failed and the tick was skipped.
    pub snapshot: Option<Metrics>,
    pub persisted: bool,
    pub alert: Option<AlertMessage>,
    /// `Some(ok)` when an alert was dispatched this tick.
    pub delivered: Option<bool>,
}

pub struct SamplingLoop<S: MetricsSource> {
    source: Arc<Mutex<S>>,
    store: Option<Arc<MetricsStore>>,
    history: Arc<HistoryBuffer>,
    engine: AlertEngine,
    sink: Arc<dyn AlertSink>,
    journal: Option<Arc<AlertJournal>>,
    interval: Duration,
}

impl<S: MetricsSource> SamplingLoop<S> {
    pub fn new(
        source: S,
        history: Arc<HistoryBuffer>,
        engine: AlertEngine,
        sink: Arc<dyn AlertSink>,
        interval: Duration,
    ) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            store: None,
            history,
            engine,
            sink,
            journal: None,
            interval,
        }
    }

    pub fn with_store(mut self, store: Arc<MetricsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_journal(mut self, journal: Arc<AlertJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// collect -> persist -> append -> evaluate -> dispatch, strictly in order.
    pub async fn tick(&mut self) -> TickReport {
        let source = Arc::clone(&self.source);
        let snapshot = match tokio::task::spawn_blocking(move || source.lock().collect()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                warn!("[sampler] skipping tick: {err}");
                return TickReport::default();
            }
            Err(err) => {
                error!("[sampler] sampling task failed: {err}");
                return TickReport::default();
            }
        };
        debug!("[sampler] {}", snapshot.summary());

        let persisted = match &self.store {
            Some(store) => match store.save(&snapshot).await {
                Ok(()) => true,
                Err(err) => {
                    warn!("[sampler] {}", MonitorError::from(err));
                    false
                }
            },
            None => false,
        };

        self.history.append(snapshot.clone());

        let alert = self.engine.evaluate(&snapshot, Instant::now());
        let delivered = match &alert {
            Some(alert) => Some(self.dispatch(alert).await),
            None => None,
        };

        TickReport {
            snapshot: Some(snapshot),
            persisted,
            alert,
            delivered,
        }
    }

    /// One attempt, no retry. The cooldown already counts this alert.
    async fn dispatch(&self, alert: &AlertMessage) -> bool {
        let text = alert.text();
        let outcome = self.sink.send(&text).await;
        match &outcome {
            Ok(()) => info!(
                "[alerts] alert sent via {}: {}",
                self.sink.name(),
                text.replace('\n', " |")
            ),
            Err(err) => error!("[alerts] {} sink: {err}", self.sink.name()),
        }

        if let Some(journal) = &self.journal {
            let result = outcome.as_ref().map(|_| ()).map_err(|e| e.to_string());
            journal.record(self.sink.name(), &text, result);
        }
        outcome.is_ok()
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("[sampler] starting, interval={:?}", self.interval);
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.tick().await;

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("[sampler] stopped");
    }
}

pub struct RenderLoop {
    history: Arc<HistoryBuffer>,
    chart: Arc<dyn ChartSink>,
    interval: Duration,
}

impl RenderLoop {
    pub fn new(history: Arc<HistoryBuffer>, chart: Arc<dyn ChartSink>, interval: Duration) -> Self {
        Self {
            history,
            chart,
            interval,
        }
    }

    /// Returns true when a chart was produced.
    pub async fn render_once(&self) -> bool {
        let snapshot = self.history.snapshot_list();
        if snapshot.is_empty() {
            return false;
        }

        let chart = Arc::clone(&self.chart);
        let samples = snapshot.len();
        match tokio::task::spawn_blocking(move || chart.render(&snapshot)).await {
            Ok(Ok(())) => {
                debug!("[chart] rendered {samples} samples");
                true
            }
            Ok(Err(err)) => {
                warn!("[chart] {err}");
                false
            }
            Err(err) => {
                error!("[chart] render task failed: {err}");
                false
            }
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("[chart] starting, interval={:?}", self.interval);
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.render_once().await;

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("[chart] stopped");
    }
}

/// External stop request: SIGINT or SIGTERM (Ctrl-C on Windows).
///
/// Handlers are registered by `install`, so a signal delivered any time
/// afterwards is caught instead of killing the process.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignal {
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the first signal and return its name.
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(windows)]
    pub async fn recv(mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl-C"
    }
}

/// Owns the shutdown signal and the handles of every spawned activity.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn spawn_sampling<S: MetricsSource>(&mut self, sampling: SamplingLoop<S>) {
        let rx = self.subscribe();
        self.tasks.push(("sampling", tokio::spawn(sampling.run(rx))));
    }

    pub fn spawn_rendering(&mut self, rendering: RenderLoop) {
        let rx = self.subscribe();
        self.tasks.push(("rendering", tokio::spawn(rendering.run(rx))));
    }

    pub fn spawn_serving(&mut self, listener: TcpListener, app: Router) {
        let mut rx = self.subscribe();
        let handle = tokio::spawn(async move {
            if let Ok(addr) = listener.local_addr() {
                info!("[api] listening on http://{addr}");
            }
            let served = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    while !*rx.borrow_and_update() {
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                })
                .await;
            if let Err(err) = served {
                error!("[api] server error: {err}");
            }
            info!("[api] stopped");
        });
        self.tasks.push(("serving", handle));
    }

    /// Signal every activity and wait for each to finish its current cycle.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for (name, handle) in self.tasks {
            if let Err(err) = handle.await {
                error!("[scheduler] {name} task ended abnormally: {err}");
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
