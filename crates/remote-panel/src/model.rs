//! StatusModel: the panel's single owned copy of backend state.
//!
//! Two writers touch it: the poller (full replace of status + now-playing
//! per fetch cycle) and the dispatcher (optimistic merges and full status
//! replaces).  Every write is one short critical section that never spans an
//! await on the backend, so readers always see a whole snapshot.
//!
//! After `unmount` every write is refused; late results arriving from
//! in-flight calls are dropped on the floor.

use std::sync::Arc;

use remote_proto::protocol::{NowPlaying, Status};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub status: Status,
    pub now_playing: NowPlaying,
    /// Incremented on every applied write.
    pub rev: u64,
}

struct Inner {
    snapshot: Snapshot,
    mounted: bool,
}

#[derive(Clone)]
pub struct StatusModel {
    inner: Arc<RwLock<Inner>>,
    changed: Arc<watch::Sender<u64>>,
}

impl StatusModel {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                snapshot: Snapshot::default(),
                mounted: true,
            })),
            changed: Arc::new(changed),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn status(&self) -> Status {
        self.inner.read().await.snapshot.status.clone()
    }

    pub async fn now_playing(&self) -> NowPlaying {
        self.inner.read().await.snapshot.now_playing.clone()
    }

    pub async fn is_mounted(&self) -> bool {
        self.inner.read().await.mounted
    }

    /// Receiver that yields the new revision after each applied write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    /// Replace the whole status with an authoritative backend response.
    pub async fn replace_status(&self, status: Status) -> bool {
        self.write(|snap| snap.status = status).await
    }

    /// Apply a pure transform to the status as it is *now*.
    pub async fn update_status(&self, merge: impl FnOnce(&mut Status)) -> bool {
        self.write(|snap| merge(&mut snap.status)).await
    }

    /// Commit one poll cycle: both entities or neither.  Refused once
    /// `token` is cancelled; the check happens under the write lock so it
    /// cannot interleave with a concurrent stop.
    pub async fn commit_cycle(
        &self,
        status: Status,
        now_playing: NowPlaying,
        token: &CancellationToken,
    ) -> bool {
        let mut inner = self.inner.write().await;
        if token.is_cancelled() {
            trace!("model: discarding cycle result after cancellation");
            return false;
        }
        Self::apply(&mut inner, &self.changed, |snap| {
            snap.status = status;
            snap.now_playing = now_playing;
        })
    }

    /// Wait until no write is in progress.
    pub async fn barrier(&self) {
        drop(self.inner.write().await);
    }

    /// Tear the model down.  Subsequent writes are no-ops.
    pub async fn unmount(&self) {
        self.inner.write().await.mounted = false;
    }

    async fn write(&self, f: impl FnOnce(&mut Snapshot)) -> bool {
        let mut inner = self.inner.write().await;
        Self::apply(&mut inner, &self.changed, f)
    }

    fn apply(inner: &mut Inner, changed: &watch::Sender<u64>, f: impl FnOnce(&mut Snapshot)) -> bool {
        if !inner.mounted {
            trace!("model: write after unmount ignored");
            return false;
        }
        f(&mut inner.snapshot);
        inner.snapshot.rev += 1;
        changed.send_replace(inner.snapshot.rev);
        true
    }
}

impl Default for StatusModel {
    fn default() -> Self {
        Self::new()
    }
}
