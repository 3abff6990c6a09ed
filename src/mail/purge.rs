//! Background purge of mails deleted by both parties.

use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::repository::MailRepository;
use crate::db::Database;
use crate::Result;

/// Default purge interval in seconds (1 hour).
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;

/// Periodically removes mails whose sender and recipient have both deleted them.
pub struct PurgeTask {
    db: Arc<Database>,
    interval: Duration,
}

impl PurgeTask {
    /// Create a new PurgeTask with the default interval.
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_interval(db, DEFAULT_PURGE_INTERVAL_SECS)
    }

    /// Create a new PurgeTask with a custom interval.
    pub fn with_interval(db: Arc<Database>, interval_secs: u64) -> Self {
        Self {
            db,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run the purge loop.
    ///
    /// This method runs indefinitely. The first purge happens immediately.
    pub async fn run(&self) {
        info!(
            "Mail purge task started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            if let Err(e) = self.purge_once().await {
                error!("Mail purge failed: {}", e);
            }
        }
    }

    /// Run a single purge pass.
    pub async fn purge_once(&self) -> Result<u64> {
        let purged = MailRepository::new(self.db.pool()).purge_deleted().await?;
        if purged > 0 {
            info!("Purged {} mail(s) deleted by both parties", purged);
        } else {
            debug!("No mails to purge");
        }
        Ok(purged)
    }
}
