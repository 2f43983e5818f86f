//! Drives RFQ negotiations through the persistent FSM engine.
//!
//! Runs the firm-quote, subject-quote, rejection and crash/recovery
//! scenarios against an in-memory journal, or against PostgreSQL when
//! `--database-url` (or `DATABASE_URL`) is set.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rfq_fsm::application::error::EngineError;
use rfq_fsm::application::services::{RfqProtocol, RfqRegistry};
use rfq_fsm::domain::events::RequestEvent;
use rfq_fsm::domain::value_objects::{BidOffer, PersistenceId};
use rfq_fsm::infrastructure::config::EngineConfig;
use rfq_fsm::infrastructure::persistence::EventLog;
use rfq_fsm::infrastructure::persistence::in_memory::InMemoryEventLog;
use rfq_fsm::infrastructure::persistence::postgres::PostgresEventLog;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Negotiation scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Client accepts a firm quote before the wiretime expires.
    Firm,
    /// Wiretime expires; client accepts the subject quote; dealer counters.
    Subject,
    /// Dealer rejects the order.
    Rejected,
    /// Instance crashes in a firm quote and is recovered from the journal.
    Crash,
    /// Every scenario in turn.
    All,
}

/// RFQ negotiation demo.
#[derive(Parser, Debug)]
#[command(name = "rfq_demo")]
#[command(about = "Run RFQ negotiation scenarios on the persistent FSM engine", long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Instrument to negotiate
    #[arg(long, default_value = "XS12345")]
    isin: String,

    /// Firm quote validity in seconds
    #[arg(long, default_value_t = 3)]
    wiretime: u32,

    /// Engine configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PostgreSQL connection string; in-memory journal when absent
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rfq_fsm=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

async fn open_log(database_url: Option<&str>) -> anyhow::Result<Arc<dyn EventLog>> {
    let Some(url) = database_url else {
        info!("using in-memory journal");
        return Ok(Arc::new(InMemoryEventLog::new()));
    };

    let pool = sqlx::PgPool::connect(url)
        .await
        .context("connecting to PostgreSQL")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("running journal migrations")?;
    info!("using PostgreSQL journal");
    Ok(Arc::new(PostgresEventLog::new(pool)))
}

async fn firm(registry: &RfqRegistry, args: &Args) -> anyhow::Result<()> {
    let id = PersistenceId::generate();
    registry
        .handle(&id, RequestEvent::submit_request(&args.isin, BidOffer::Bid))
        .await?;
    registry
        .handle(&id, RequestEvent::dealer_accept(101.20, args.wiretime))
        .await?;
    let done = registry.handle(&id, RequestEvent::CustomerAccept).await?;
    info!(persistence_id = %id, state = %done.to(), data = %done.data(), "firm scenario finished");
    Ok(())
}

async fn subject(registry: &RfqRegistry, args: &Args) -> anyhow::Result<()> {
    let id = PersistenceId::generate();
    registry
        .handle(&id, RequestEvent::submit_request(&args.isin, BidOffer::Offer))
        .await?;
    registry
        .handle(&id, RequestEvent::dealer_accept(101.20, args.wiretime))
        .await?;

    let wait = Duration::from_secs(u64::from(args.wiretime)) + Duration::from_millis(500);
    info!(persistence_id = %id, wait_ms = wait.as_millis() as u64, "letting the firm quote expire");
    tokio::time::sleep(wait).await;
    info!(
        persistence_id = %id,
        state = %registry.current_state(&id).await?,
        "after wiretime"
    );

    registry.handle(&id, RequestEvent::CustomerAccept).await?;
    let countered = registry
        .handle(&id, RequestEvent::dealer_counter(99.20))
        .await?;
    info!(
        persistence_id = %id,
        state = %countered.to(),
        data = %countered.data(),
        "subject scenario finished"
    );
    Ok(())
}

async fn rejected(registry: &RfqRegistry, args: &Args) -> anyhow::Result<()> {
    let id = PersistenceId::generate();
    registry
        .handle(&id, RequestEvent::submit_request(&args.isin, BidOffer::Bid))
        .await?;
    let cancelled = registry.handle(&id, RequestEvent::DealerReject).await?;
    info!(persistence_id = %id, state = %cancelled.to(), "dealer rejected");

    match registry.handle(&id, RequestEvent::CustomerAccept).await {
        Err(EngineError::UnhandledEvent { .. }) => info!(persistence_id = %id, "cancelled request ignores further events"),
        other => warn!(persistence_id = %id, result = ?other, "unexpected result after cancellation"),
    }
    Ok(())
}

async fn crash(registry: &RfqRegistry, args: &Args) -> anyhow::Result<()> {
    let id = PersistenceId::generate();
    registry
        .handle(&id, RequestEvent::submit_request(&args.isin, BidOffer::Bid))
        .await?;
    registry
        .handle(&id, RequestEvent::dealer_accept(100.75, 60))
        .await?;

    match registry.handle(&id, RequestEvent::Crash).await {
        Err(err @ EngineError::FaultInjected { .. }) => info!(persistence_id = %id, error = %err, "instance crashed"),
        other => warn!(persistence_id = %id, result = ?other, "crash was not reported"),
    }
    if let Err(err) = registry.handle(&id, RequestEvent::CustomerAccept).await {
        info!(persistence_id = %id, error = %err, "crashed instance rejects events");
    }

    let handle = registry.start(&id).await?;
    let status = handle.status().await?;
    info!(
        persistence_id = %id,
        state = %status.state,
        data = %status.data,
        sequence_nr = status.sequence_nr,
        "instance recovered from journal"
    );
    handle.handle(RequestEvent::CustomerAccept).await?;
    info!(persistence_id = %id, state = %handle.current_state().await?, "crash scenario finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = EngineConfig::load(args.config.as_deref()).context("loading engine configuration")?;
    let log = open_log(args.database_url.as_deref()).await?;
    let registry = RfqProtocol::registry(log, config)?;

    let scenarios = match args.scenario {
        Scenario::All => vec![Scenario::Firm, Scenario::Subject, Scenario::Rejected, Scenario::Crash],
        one => vec![one],
    };

    for scenario in scenarios {
        info!(?scenario, "running scenario");
        match scenario {
            Scenario::Firm => firm(&registry, &args).await?,
            Scenario::Subject => subject(&registry, &args).await?,
            Scenario::Rejected => rejected(&registry, &args).await?,
            Scenario::Crash => crash(&registry, &args).await?,
            Scenario::All => {}
        }
    }

    registry.stop_all().await;
    Ok(())
}
