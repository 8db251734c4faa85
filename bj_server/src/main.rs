//! Blackjack HTTP server.
//!
//! Rounds live in memory; balances go through the cache-aside ledger
//! (PostgreSQL + Redis, or in-memory stand-ins for local runs).

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use bj_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use blackjack::{
    BlackjackService, SessionRegistry,
    db::Database,
    wallet::{
        BalanceCache, BalanceStore, InMemoryBalanceCache, InMemoryBalanceStore, LedgerStore,
        PgBalanceStore, RedisBalanceCache,
    },
};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the blackjack server

USAGE:
  bj_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         PostgreSQL connection string [default: env DATABASE_URL]
  --redis-url  URL         Redis connection string      [default: env REDIS_URL]

FLAGS:
  --in-memory              Ignore DATABASE_URL and REDIS_URL, keep balances in memory
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  DATABASE_URL             PostgreSQL connection string
  REDIS_URL                Redis connection string
  STARTING_BALANCE         Grant credited on account open [default: 1000]
  PAYOUT_WIN / STAKE_LOSE  Settlement amounts [default: 100 / 100]
  RUST_LOG                 Log filter
  (BALANCE_CACHE_*, SESSION_* and REQUEST_TIMEOUT_MS tune the ledger and sessions)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    redis_url: Option<String>,
    in_memory: bool,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        redis_url: pargs.opt_value_from_str("--redis-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        warn!("Ignoring unknown arguments: {remaining:?}");
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    logging::init();

    let args = parse_args().context("Invalid command line")?;

    let mut config = ServerConfig::from_env(args.bind, args.database_url, args.redis_url)?;
    if args.in_memory {
        config.database = None;
        config.cache.redis_url = None;
    }
    config.validate()?;

    info!("Starting blackjack server at {}", config.bind);

    // Durable store
    let (database, store): (Option<Database>, Arc<dyn BalanceStore>) = match &config.database {
        Some(db_config) => {
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");
            let store: Arc<dyn BalanceStore> =
                Arc::new(PgBalanceStore::new(Arc::new(db.pool().clone())));
            (Some(db), store)
        }
        None => {
            warn!("DATABASE_URL not set, balances are kept in memory and lost on exit");
            let store: Arc<dyn BalanceStore> = Arc::new(InMemoryBalanceStore::new());
            (None, store)
        }
    };

    // Balance cache
    let cache: Arc<dyn BalanceCache> = match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisBalanceCache::new(url, config.cache.prefix.clone())
                .context("Invalid REDIS_URL")?;
            info!("Balance cache: Redis (ttl {:?})", config.cache.ttl);
            Arc::new(cache)
        }
        None => {
            info!("Balance cache: in-memory (ttl {:?})", config.cache.ttl);
            Arc::new(InMemoryBalanceCache::new())
        }
    };

    let ledger = LedgerStore::new(store, cache)
        .with_cache_ttl(config.cache.ttl)
        .with_starting_balance(config.starting_balance);

    let registry = Arc::new(SessionRegistry::new(config.session));
    let service = Arc::new(BlackjackService::new(
        registry.clone(),
        Arc::new(ledger),
        config.payouts,
    ));

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind)
            .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {e}"))?;
        info!("Prometheus metrics exposed at http://{metrics_bind}/metrics");
    }

    let sweeper = registry.clone().spawn_sweeper({
        let registry = registry.clone();
        move |evicted| {
            metrics::sessions_evicted_total(evicted);
            metrics::active_sessions(registry.len());
        }
    });

    let state = AppState::new(service, database.clone(), config.request_timeout);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("HTTP API listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    sweeper.abort();
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
