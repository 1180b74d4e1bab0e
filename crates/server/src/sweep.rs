// SPDX-License-Identifier: MIT

//! Background timeout sweep.
//!
//! Worst-case late detection of a timed-out execution equals the sweep
//! interval. Sweep failures are logged and the loop keeps ticking; a broken
//! store turns up in `server_status`, not as a dead task.

use std::time::Duration;

use cue_core::Clock;
use cue_engine::Engine;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the sweep every `interval` until cancelled.
pub async fn run<C>(engine: Engine<C>, interval: Duration, cancel: CancellationToken)
where
    C: Clock + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("sweep stopped");
                return;
            }
            _ = ticker.tick() => {}
        }
        let engine = engine.clone();
        let result = tokio::task::spawn_blocking(move || engine.check_timeouts()).await;
        match result {
            Ok(Ok(transitioned)) if !transitioned.is_empty() => {
                info!(count = transitioned.len(), "sweep timed out executions");
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "sweep pass failed"),
            Err(e) => warn!(error = %e, "sweep task failed"),
        }
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
