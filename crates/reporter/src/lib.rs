//! Report worker.
//!
//! Each [`ReportWorker`] owns one member slot of a consumer group, builds
//! the requested reports and posts them back to the front end.

pub mod config;
pub mod error;
pub mod worker;

pub use config::{Config, ConfigError};
pub use error::{ReporterError, Result};
pub use worker::{ReportWorker, WorkerConfig, WorkerStats};

use std::sync::Arc;

use ledger::SqliteLedger;
use report_core::ReportBuilder;
use report_delivery::{DeliveryClient, DeliveryConfig};
use report_queue::SqliteQueue;
use tokio::sync::watch;
use tracing::{info, warn};

/// Connect to the ledger and the request channel and run `config.consumers`
/// workers until shutdown.
pub async fn run(config: &Config, shutdown: watch::Receiver<bool>) -> Result<Vec<WorkerStats>> {
    let ledger = Arc::new(SqliteLedger::connect(&config.database_url).await?);
    ledger.migrate().await?;
    let queue = SqliteQueue::connect(&config.queue_url, config.queue_partitions).await?;

    let delivery = DeliveryClient::new(
        DeliveryConfig::new(&config.acceptor_url).with_timeout(config.delivery_timeout),
    )?;
    match delivery.health_check().await {
        Ok(true) => info!("Report acceptor is up at {}", config.acceptor_url),
        Ok(false) => warn!("Report acceptor at {} is unhealthy", config.acceptor_url),
        Err(e) => warn!("Report acceptor at {} is unreachable: {}", config.acceptor_url, e),
    }

    let builder = ReportBuilder::new(ledger.clone(), &config.base_currency);
    let worker_config = WorkerConfig {
        batch_size: config.batch_size,
        poll_interval: config.poll_interval,
    };

    let mut workers = Vec::new();
    for member in 0..config.consumers {
        let consumer = queue.consumer(&config.consumer_group, member, config.consumers)?;
        if consumer.assigned().is_empty() {
            warn!(member, "No partitions left for consumer, not starting it");
            continue;
        }
        let worker = ReportWorker::new(
            format!("{}-{}", config.consumer_group, member),
            consumer,
            delivery.clone(),
            builder.clone(),
            worker_config.clone(),
        );
        workers.push(tokio::spawn(worker.run(shutdown.clone())));
    }
    info!(count = workers.len(), "Report workers running");

    let mut stats = Vec::with_capacity(workers.len());
    for worker in workers {
        stats.push(worker.await?);
    }

    queue.close().await;
    ledger.close().await;
    Ok(stats)
}
