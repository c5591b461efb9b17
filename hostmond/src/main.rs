use anyhow::{Context, Result};
use clap::Parser;
use hostmond::alerts::{AlertEngine, AlertJournal, AlertSink, LogNotifier, SlackNotifier};
use hostmond::api::{self, AppState};
use hostmond::chart::SvgChart;
use hostmond::collectors::SystemSampler;
use hostmond::{
    Config, HistoryBuffer, MetricsStore, RenderLoop, SamplingLoop, Scheduler, ShutdownSignal,
};
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(clap::Parser, Debug)]
#[command(version, about = "Host resource sampler with history, persistence and alerts")]
struct Args {
    /// Path to a TOML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address (e.g. 127.0.0.1:5000)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Override the SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        cfg.api.listen_addr = listen;
    }
    if let Some(db) = args.db {
        cfg.storage.db_path = db;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cfg.logging.level.as_str()),
    )
    .init();

    let history = Arc::new(HistoryBuffer::new(cfg.sampling.history_size));

    let store = match MetricsStore::new(&cfg.storage.db_path).await {
        Ok(store) => {
            match store.count().await {
                Ok(rows) => info!("[storage] {rows} samples already recorded"),
                Err(err) => warn!("[storage] failed to count rows: {err}"),
            }
            Some(Arc::new(store))
        }
        Err(err) => {
            warn!(
                "[storage] {} unavailable, running without persistence: {err}",
                cfg.storage.db_path.display()
            );
            None
        }
    };

    let sink: Arc<dyn AlertSink> = match cfg.alerts.webhook() {
        Some(url) => Arc::new(
            SlackNotifier::new(url, cfg.alerts.timeout()).context("invalid alert webhook")?,
        ),
        None => {
            info!("[alerts] no slack_webhook_url configured; alerts go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let sampler = SystemSampler::new(cfg.sampling.cpu_window());
    let mut sampling = SamplingLoop::new(
        sampler,
        Arc::clone(&history),
        AlertEngine::from_config(&cfg.alerts),
        sink,
        cfg.sampling.interval(),
    );
    if let Some(store) = store {
        sampling = sampling.with_store(store);
    }
    if let Some(path) = cfg.alerts.journal() {
        sampling = sampling.with_journal(Arc::new(AlertJournal::new(path.to_path_buf())));
    }

    let chart = Arc::new(SvgChart::new(cfg.chart.path.clone()));
    let rendering = RenderLoop::new(Arc::clone(&history), chart, cfg.chart.interval());

    let listener = tokio::net::TcpListener::bind(cfg.api.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.api.listen_addr))?;
    let app = api::router(AppState {
        history: Arc::clone(&history),
        chart_path: cfg.chart.path.clone(),
        thresholds: cfg.alerts.thresholds(),
    });

    let signal = ShutdownSignal::install().context("failed to install signal handlers")?;

    let mut scheduler = Scheduler::new();
    scheduler.spawn_sampling(sampling);
    scheduler.spawn_rendering(rendering);
    scheduler.spawn_serving(listener, app);
    info!("hostmond started");

    let received = signal.recv().await;
    info!("{received} received; finishing current cycle");
    scheduler.shutdown().await;
    info!("hostmond stopped");
    Ok(())
}
