//! Cancellable repeating task with a single owner.

use crate::error::{PanelError, Result};
use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Runs a tick body every `period`, starting immediately.
///
/// Ticks never overlap: the body is synchronous and the next tick is only
/// awaited after it returns. Late ticks are delayed rather than bunched.
/// Cancellation is checked right before every tick, so a tick that was
/// already due when [`ScheduledTask::cancel`] ran never executes. On a
/// multi-threaded runtime a cancel issued from another worker while a tick
/// body has already been entered lets that one tick finish.
pub struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn the tick loop on the current tokio runtime.
    ///
    /// A zero period is rejected.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(PanelError::InvalidConfig(format!(
                "{} period must be non-zero",
                name
            )));
        }

        let token = CancellationToken::new();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut count = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if loop_token.is_cancelled() {
                    break;
                }
                tick();
                count += 1;
            }
            debug!("[Sync] {} stopped after {} tick(s)", name, count);
        });

        Ok(Self { token, handle })
    }

    /// Stop the loop. Calling it again has no effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the loop has exited, either by cancellation or because a
    /// tick body panicked.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
