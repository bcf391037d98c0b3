//! Finance bot front end.

use std::sync::Arc;

use chat_client::{BotClient, BotConfig};
use finance_bot::rates::{init_rates, FixerClient, FixerConfig, RatePuller};
use finance_bot::{
    CacheBackend, CacheFreshness, Config, FinanceBot, ReportInbox, TelegramSender, UpdateListener,
};
use ledger::SqliteLedger;
use report_cache::{MemoryReportCache, ReportCache, SqliteReportCache};
use report_queue::SqliteQueue;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Starting finance bot");

    let ledger = Arc::new(SqliteLedger::connect(&config.database_url).await?);
    ledger.migrate().await?;
    init_rates(ledger.as_ref(), &config.base_currency).await?;

    let cache: Arc<dyn ReportCache> = match config.cache_backend {
        CacheBackend::Memory => Arc::new(MemoryReportCache::new()),
        CacheBackend::Sqlite => Arc::new(SqliteReportCache::new(ledger.pool().clone()).await?),
    };

    let queue = SqliteQueue::connect(&config.queue_url, config.queue_partitions).await?;

    let mut bot_config = BotConfig::new(&config.bot_token);
    if let Some(url) = &config.api_url {
        bot_config = bot_config.with_api_url(url);
    }
    let client = BotClient::connect(bot_config).await?;
    let sender = Arc::new(TelegramSender::new(client.clone()));
    let freshness = Arc::new(CacheFreshness::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Rates
    let puller = match &config.fixer_api_key {
        Some(key) => {
            let provider = Arc::new(FixerClient::new(FixerConfig::new(key))?);
            let puller = RatePuller::new(
                ledger.clone(),
                provider,
                &config.base_currency,
                config.rate_pull_interval,
            );
            Some(tokio::spawn(puller.run(shutdown_rx.clone())))
        }
        None => {
            warn!("FIXER_API_KEY not set, only {} is usable", config.base_currency);
            None
        }
    };

    // Result channel acceptor
    let inbox = Arc::new(ReportInbox::new(cache.clone(), sender.clone(), freshness.clone()));
    let listener = tokio::net::TcpListener::bind(config.acceptor_addr).await?;
    let mut acceptor_shutdown = shutdown_rx.clone();
    let app = report_delivery::router(inbox).merge(finance_bot::metrics::routes());
    let acceptor = tokio::spawn(report_delivery::serve_router(listener, app, async move {
        let _ = acceptor_shutdown.changed().await;
    }));

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = ctrl_c_tx.send(true);
    });

    let bot = Arc::new(FinanceBot::new(
        ledger.clone(),
        cache,
        Arc::new(queue.producer()),
        sender,
        freshness,
        &config.base_currency,
    ));
    let updates = chat_client::subscribe(&client);
    let result = UpdateListener::new(bot).run(updates, shutdown_rx).await;
    // The listener may also stop on its own
    let _ = shutdown_tx.send(true);

    match acceptor.await {
        Ok(Err(e)) => error!("Report acceptor failed: {}", e),
        Err(e) => error!("Report acceptor task failed: {}", e),
        Ok(Ok(())) => {}
    }
    if let Some(puller) = puller {
        let _ = puller.await;
    }

    queue.close().await;
    ledger.close().await;
    info!("Finance bot stopped");

    result.map_err(Into::into)
}
