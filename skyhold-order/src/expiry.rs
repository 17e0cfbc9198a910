use chrono::{DateTime, Utc};
use skyhold_core::CoreResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::booking::BookingLifecycle;

/// Cancels Pending bookings whose payment was never settled within the TTL.
///
/// Expiry goes through the same check-and-set as a payment cancellation, so a
/// booking confirmed or cancelled concurrently is simply skipped.
pub struct ExpirySweeper {
    bookings: Arc<BookingLifecycle>,
    ttl: chrono::Duration,
}

impl ExpirySweeper {
    pub fn new(bookings: Arc<BookingLifecycle>, ttl: Duration) -> Self {
        Self {
            bookings,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Expire everything older than the TTL as of `now`; returns how many expired.
    ///
    /// A booking that fails to expire is logged and left Pending with its
    /// seats for the next sweep; the rest are still expired.
    pub async fn sweep(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return Ok(0);
        };

        let stale = self.bookings.repository().pending_created_before(cutoff).await?;
        let mut expired = 0;
        for booking in stale {
            match self.bookings.expire(booking.id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => warn!("Could not expire booking {}: {}", booking.id, e),
            }
        }

        if expired > 0 {
            info!("Expired {} pending bookings created before {}", expired, cutoff);
        }
        Ok(expired)
    }

    /// Sweep on a fixed interval until the task is dropped
    pub async fn run(self, every: Duration) {
        info!("Expiry sweeper started: ttl {}s, every {:?}", self.ttl.num_seconds(), every);
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep(Utc::now()).await {
                error!("Expiry sweep failed: {}", e);
            }
        }
    }
}
