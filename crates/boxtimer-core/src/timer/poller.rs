//! Background expiry loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::completion::CompletionHooks;
use super::controller::TimerController;

/// Check the shared slot every `period` until `shutdown` flips to `true`.
///
/// Each tick picks up changes made by other instances and, when the
/// countdown has run out, claims and runs the completion. Side effects run
/// on the blocking pool without being awaited, so ticks and shutdown are
/// never held up by a slow task store or notifier.
pub async fn run_expiry_loop(
    controller: Arc<TimerController>,
    hooks: Arc<CompletionHooks>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(period_ms = period.as_millis() as u64, "starting expiry loop");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = controller.sync() {
                    error!("failed to read timer slot: {e}");
                    continue;
                }
                let claimed = match controller.claim_expired() {
                    Ok(Some(claimed)) => claimed,
                    Ok(None) => continue,
                    Err(e) => {
                        error!("failed to claim timer completion: {e}");
                        continue;
                    }
                };
                let controller = Arc::clone(&controller);
                let hooks = Arc::clone(&hooks);
                let completion = tokio::task::spawn_blocking(move || {
                    controller.finish_completion(&claimed, &hooks)
                });
                tokio::spawn(async move {
                    if let Err(e) = completion.await {
                        error!("completion task panicked: {e}");
                    }
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("expiry loop shutting down");
                    break;
                }
            }
        }
    }
}
