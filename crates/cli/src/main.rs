use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factor_pulse_binance::BinanceAdapter;
use factor_pulse_core::{AppConfig, ConfigLoader, NotificationSink};
use factor_pulse_data::{
    Database, FactorRepository, RetentionSweeper, SnapshotRepository, SummaryRepository,
    UniverseRepository,
};
use factor_pulse_notify::{DedupGate, LogSink, TelegramNotifier};
use factor_pulse_pipeline::{PipelineCycle, PipelineScheduler};
use factor_pulse_web_api::{ApiServer, AppState};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "factor-pulse")]
#[command(about = "Hourly crypto factor pipeline with outlier notifications", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline daemon with the web API
    Run,
    /// Run a single pipeline cycle and exit
    RunOnce,
    /// Start the web API server only
    Serve,
    /// Rebuild the tracked universe and print it
    Universe,
    /// Run the retention sweep once
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Commands::Run => run_daemon(config).await,
        Commands::RunOnce => run_once(config).await,
        Commands::Serve => serve(config).await,
        Commands::Universe => refresh_universe(config).await,
        Commands::Sweep => sweep(config).await,
    }
}

struct App {
    config: AppConfig,
    adapter: Arc<BinanceAdapter>,
    snapshots: SnapshotRepository,
    factors: FactorRepository,
    universe: UniverseRepository,
    summaries: SummaryRepository,
    sweeper: RetentionSweeper,
}

impl App {
    async fn init(config: AppConfig) -> Result<Self> {
        let database = Database::connect(&config.database.url)
            .await
            .context("connecting to database")?;
        database.init_schema().await.context("preparing schema")?;
        let pool = database.pool().clone();

        let adapter = Arc::new(BinanceAdapter::new(
            config.binance.spot_api_url.clone(),
            config.binance.futures_api_url.clone(),
            config.binance.rate_limit_per_minute,
        )?);

        Ok(Self {
            adapter,
            snapshots: SnapshotRepository::new(pool.clone()),
            factors: FactorRepository::new(pool.clone()),
            universe: UniverseRepository::new(pool.clone()),
            summaries: SummaryRepository::new(pool.clone()),
            sweeper: RetentionSweeper::new(pool, config.thresholds.retention_days),
            config,
        })
    }

    fn sink(&self) -> Arc<dyn NotificationSink> {
        if self.config.telegram.enabled {
            match TelegramNotifier::new(
                self.config.telegram.bot_token.clone(),
                self.config.telegram.chat_id.clone(),
            ) {
                Ok(notifier) => return Arc::new(notifier),
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram unavailable, logging digests instead");
                }
            }
        }
        Arc::new(LogSink)
    }

    fn cycle(&self) -> PipelineCycle {
        let gate = DedupGate::new(self.summaries.clone(), self.config.dedup.clone());
        PipelineCycle::new(
            self.config.clone(),
            Arc::clone(&self.adapter),
            self.snapshots.clone(),
            self.factors.clone(),
            self.universe.clone(),
            self.sweeper.clone(),
            gate,
            self.sink(),
        )
    }

    fn api_server(&self) -> ApiServer {
        ApiServer::new(Arc::new(AppState {
            factors: self.factors.clone(),
            universe: self.universe.clone(),
            summaries: self.summaries.clone(),
        }))
    }

    fn listen_addr(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let app = App::init(config).await?;

    let scheduler = PipelineScheduler::new(
        Arc::new(app.cycle()),
        app.config.pipeline.cron_schedule.clone(),
    );
    let mut scheduler_handle = scheduler.start().await?;

    let addr = app.listen_addr();
    let server = app.api_server();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.serve(&addr).await {
            tracing::error!(error = %e, "Web API exited");
        }
    });

    shutdown_signal().await;

    scheduler_handle.shutdown().await.ok();
    server_task.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_once(config: AppConfig) -> Result<()> {
    let app = App::init(config).await?;
    let report = app.cycle().run().await?;
    println!(
        "cycle at {}: fetched {}, failed {}, records {}, outliers {}, gate {:?}",
        report.timestamp,
        report.symbols_fetched,
        report.symbols_failed,
        report.records_computed,
        report.outliers_marked,
        report.gate_outcome,
    );
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    let app = App::init(config).await?;
    let addr = app.listen_addr();
    app.api_server().serve(&addr).await
}

async fn refresh_universe(config: AppConfig) -> Result<()> {
    use factor_pulse_binance::adapter::DEFAULT_FUNDING_CADENCE_HOURS;
    use factor_pulse_core::MarketDataAdapter;

    let app = App::init(config).await?;
    let futures_tickers = app.adapter.fetch_all_tickers().await?;
    let spot_tickers = app.adapter.fetch_spot_tickers().await.unwrap_or_default();
    let cadences = app.adapter.fetch_funding_cadences().await.unwrap_or_default();
    let today = chrono::Utc::now().date_naive();

    let entries = factor_pulse_binance::build_universe(
        &futures_tickers,
        &spot_tickers,
        &cadences,
        DEFAULT_FUNDING_CADENCE_HOURS,
        app.config.universe.top_n,
        today,
    );
    app.universe.replace_for_date(today, &entries).await?;

    for entry in &entries {
        println!(
            "{:<14} {:<10} quote_volume={}",
            entry.symbol, entry.contract_type, entry.quote_volume
        );
    }
    println!("{} symbols as of {today}", entries.len());
    Ok(())
}

async fn sweep(config: AppConfig) -> Result<()> {
    let app = App::init(config).await?;
    let report = app.sweeper.sweep().await?;
    println!(
        "deleted {} snapshots, {} factor records, {} summaries",
        report.snapshots_deleted, report.factor_records_deleted, report.summaries_deleted
    );
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(signal) => signal,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down");
        }
        result = tokio::signal::ctrl_c() => {
            if result.is_ok() {
                tracing::info!("Received SIGINT, shutting down");
            }
        }
    }
}
