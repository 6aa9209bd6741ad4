//! Bounty Scheduler
//!
//! Fires a publish callback after a random delay, then re-arms with a
//! freshly sampled delay. Publication times drift apart instead of landing
//! on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const TICKS_PER_SECOND: i64 = 20;
pub const SECONDS_PER_MINUTE: i64 = 60;
/// 20 Hz
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Invoked on every firing
pub type PublishCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub fn minutes_to_ticks(minutes: i64) -> i64 {
    minutes
        .saturating_mul(SECONDS_PER_MINUTE)
        .saturating_mul(TICKS_PER_SECOND)
}

/// Both bounds positive and ordered
pub fn is_valid_interval(min_ticks: i64, max_ticks: i64) -> bool {
    min_ticks > 0 && max_ticks > 0 && min_ticks <= max_ticks
}

pub struct BountyScheduler {
    tick: Duration,
    /// Live timer task, if any
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BountyScheduler {
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    /// Scheduler with a custom tick length
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick,
            handle: Mutex::new(None),
        }
    }

    /// Start publishing every `[interval_min, interval_max]` minutes.
    ///
    /// Any running timer is cancelled first. Returns `false` (and stays
    /// stopped) when the interval is invalid.
    pub async fn start(
        &self,
        interval_min: i64,
        interval_max: i64,
        on_publish: PublishCallback,
    ) -> bool {
        let mut handle = self.handle.lock().await;
        if let Some(previous) = handle.take() {
            previous.abort();
        }

        let min_ticks = minutes_to_ticks(interval_min);
        let max_ticks = minutes_to_ticks(interval_max);

        if !is_valid_interval(min_ticks, max_ticks) {
            warn!(
                "Invalid bounty interval {}..{} minutes, bounty publication disabled",
                interval_min, interval_max
            );
            return false;
        }

        let tick = self.tick;
        *handle = Some(tokio::spawn(async move {
            loop {
                let delay_ticks = rand::thread_rng().gen_range(min_ticks..=max_ticks);
                let delay = tick.saturating_mul(u32::try_from(delay_ticks).unwrap_or(u32::MAX));
                debug!("Next bounty in {} ticks ({:?})", delay_ticks, delay);

                tokio::time::sleep(delay).await;
                on_publish().await;
            }
        }));

        info!(
            "Bounty scheduler started ({}-{} minutes)",
            interval_min, interval_max
        );
        true
    }

    /// Cancel the pending timer. Safe to call when not running.
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
            info!("Bounty scheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Default for BountyScheduler {
    fn default() -> Self {
        Self::new()
    }
}
