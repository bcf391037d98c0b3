use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledger::{is_supported_currency, Ledger, Rate, RateTable, SUPPORTED_CURRENCIES};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use super::{RatesError, RatesProvider};

/// Register every supported currency and fix the base at 1.
///
/// Non-base currencies stay unpopulated until the first successful pull.
pub async fn init_rates(ledger: &dyn Ledger, base_currency: &str) -> Result<(), RatesError> {
    if !is_supported_currency(base_currency) {
        return Err(RatesError::UnknownBase(base_currency.to_string()));
    }
    for code in SUPPORTED_CURRENCIES {
        ledger.new_rate(code).await?;
    }
    ledger.set_rate(base_currency, 1.0).await?;
    Ok(())
}

/// Periodically refreshes rates from a [`RatesProvider`].
pub struct RatePuller {
    ledger: Arc<dyn Ledger>,
    provider: Arc<dyn RatesProvider>,
    base_currency: String,
    every: Duration,
}

impl RatePuller {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        provider: Arc<dyn RatesProvider>,
        base_currency: impl Into<String>,
        every: Duration,
    ) -> Self {
        Self {
            ledger,
            provider,
            base_currency: base_currency.into(),
            every,
        }
    }

    /// Pull once and publish the result as a new snapshot.
    ///
    /// Returns the number of rates published, base included.
    pub async fn pull_once(&self) -> Result<usize, RatesError> {
        let symbols: Vec<&str> = SUPPORTED_CURRENCIES
            .iter()
            .copied()
            .filter(|code| *code != self.base_currency)
            .collect();
        let pulled = self.provider.latest(&self.base_currency, &symbols).await?;

        let now = Utc::now();
        let mut table = RateTable::new().with_rate(Rate::populated(&self.base_currency, 1.0, now));
        for (code, value) in pulled {
            if !is_supported_currency(&code) {
                warn!("Ignoring unsupported currency {} from provider", code);
                continue;
            }
            if !value.is_finite() || value <= 0.0 {
                warn!("Ignoring invalid rate {} for {}", value, code);
                continue;
            }
            table = table.with_rate(Rate::populated(code, value, now));
        }

        let published = table.len();
        self.ledger.publish_rates(table).await?;
        Ok(published)
    }

    /// Pull immediately, then every interval, until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Start pulling rates every {:?}", self.every);
        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    info!("Stop pulling rates");
                    break;
                }

                // The first tick completes immediately
                _ = ticker.tick() => {
                    match self.pull_once().await {
                        Ok(count) => info!("Pulled {} rates", count),
                        Err(e) => error!("Cannot pull rates: {}", e),
                    }
                }
            }
        }
    }
}
