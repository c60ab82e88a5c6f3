//! Poller: keeps the StatusModel fresh without user interaction.
//!
//! One fetch cycle is `get_status` followed by `get_now_playing`; both
//! results land in the model together or not at all.  Failed cycles are
//! swallowed and the previous snapshot stays authoritative.
//!
//! Stopping cancels the token captured by the loop.  An in-flight cycle is
//! dropped at its next await, and a cycle that already has both results
//! re-checks the token under the model's write lock before committing, so
//! nothing is written once `stop` has returned.

use std::sync::Arc;
use std::time::Duration;

use remote_proto::protocol::{Method, NowPlaying, Status};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::gateway::{invoke, no_args, RpcError, RpcGateway};
use crate::model::StatusModel;

/// Reference cadence between fetch cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Committed,
    /// Both calls succeeded but the poller was stopped meanwhile.
    Discarded,
}

/// Run one fetch cycle against `model`.
pub async fn fetch_cycle(
    gateway: &dyn RpcGateway,
    model: &StatusModel,
    token: &CancellationToken,
) -> Result<CycleOutcome, RpcError> {
    let status: Status = invoke(gateway, Method::GetStatus, no_args()).await?;
    let now_playing: NowPlaying = invoke(gateway, Method::GetNowPlaying, no_args()).await?;

    if model.commit_cycle(status, now_playing, token).await {
        Ok(CycleOutcome::Committed)
    } else {
        Ok(CycleOutcome::Discarded)
    }
}

pub struct Poller {
    token: CancellationToken,
    model: StatusModel,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the polling loop.  The first cycle starts immediately.
    pub fn start(gateway: Arc<dyn RpcGateway>, model: StatusModel, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(gateway, model.clone(), interval, token.clone()));
        Self {
            token,
            model,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop scheduling cycles and discard any result still in flight.
    /// Idempotent.
    pub async fn stop(&mut self) {
        self.token.cancel();
        // A commit that grabbed the lock before the cancel finishes here; any
        // later one sees the cancelled token.
        self.model.barrier().await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    gateway: Arc<dyn RpcGateway>,
    model: StatusModel,
    period: Duration,
    token: CancellationToken,
) {
    info!("poller: started, interval {:?}", period);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                trace!("poller: cycle abandoned by stop");
                break;
            }
            res = fetch_cycle(gateway.as_ref(), &model, &token) => match res {
                Ok(CycleOutcome::Committed) => trace!("poller: cycle committed"),
                Ok(CycleOutcome::Discarded) => trace!("poller: cycle discarded"),
                Err(e) => debug!("poller: cycle failed: {}", e),
            }
        }
    }

    info!("poller: stopped");
}
