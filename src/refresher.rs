//! Periodic catalog refresh: fetch the full snapshot, swap it in atomically.

use crate::db::{self, Pool, RefreshStats};
use crate::feed::{CatalogSource, FeedError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("failed to store catalog: {0}")]
    Store(#[from] anyhow::Error),
}

/// One refresh cycle: fetch the snapshot, then replace the catalog. Any
/// failure leaves the previous generation live and queryable.
#[instrument(skip_all)]
pub async fn refresh_once(
    pool: &Pool,
    source: &dyn CatalogSource,
) -> Result<RefreshStats, RefreshError> {
    let shops = source.fetch_catalog().await?;
    let stats = db::replace_catalog(pool, &shops).await?;
    Ok(stats)
}

/// Refresh loop. The first tick fires immediately; later ticks come every
/// `interval`. An overrunning cycle delays the next tick instead of stacking,
/// so at most one fetch+replace is in flight. Failures are logged and the
/// next tick is the retry.
pub async fn run(pool: Pool, source: impl CatalogSource, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match refresh_once(&pool, &source).await {
            Ok(stats) => {
                info!(
                    generation = stats.generation,
                    shops = stats.shops,
                    offers = stats.offers,
                    "catalog refreshed"
                );
            }
            Err(RefreshError::Feed(FeedError::Parse(err))) => {
                warn!(%err, "catalog feed returned malformed body; keeping previous catalog");
            }
            Err(RefreshError::Feed(err)) => {
                warn!(%err, "catalog fetch failed; keeping previous catalog");
            }
            Err(RefreshError::Store(err)) => {
                warn!(?err, "catalog replace failed; previous generation stays live");
            }
        }
    }
}
