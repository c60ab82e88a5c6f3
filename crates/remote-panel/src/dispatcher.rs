//! Command dispatcher: user intents → backend calls.
//!
//! Each operation runs notify-intent → call → reconcile → notify-result, but
//! the reconciliation policy differs per operation:
//!
//! | operation         | before the call             | after the call            |
//! |-------------------|-----------------------------|---------------------------|
//! | `play`            | nothing                     | replace status            |
//! | `stop`            | `playing=false, channel=∅`  | nothing                   |
//! | `set_volume`      | `volume=v`                  | nothing                   |
//! | `set_autoconnect` | nothing                     | replace status            |
//!
//! Optimistic writes are merged into the model's current status, never a
//! copy captured earlier.  Errors propagate to the caller untouched: no
//! retry, no rollback.  Concurrent operations are not ordered against each
//! other; whichever reconciles last wins.

use std::sync::Arc;

use remote_proto::protocol::{Channel, Method, Status, MAX_VOLUME};
use serde_json::json;
use tracing::{debug, info};

use crate::gateway::{invoke, no_args, RpcError, RpcGateway};
use crate::model::StatusModel;
use crate::notify::Notifier;
use crate::presentation::Intent;

#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn RpcGateway>,
    model: StatusModel,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn RpcGateway>, model: StatusModel, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            model,
            notifier,
        }
    }

    /// Run the operation matching a presentation intent.
    pub async fn dispatch(&self, intent: Intent) -> Result<(), RpcError> {
        debug!("dispatch: {:?}", intent);
        match intent {
            Intent::Play(ch) => self.play(ch).await.map(|_| ()),
            Intent::Stop => self.stop().await,
            Intent::SetVolume(v) => self.set_volume(v).await,
            Intent::SetAutoconnect(on) => self.set_autoconnect(on).await.map(|_| ()),
        }
    }

    /// Start `channel`.  The UI keeps showing the old state until the backend
    /// answers with the status it actually reached.
    pub async fn play(&self, channel: Channel) -> Result<Status, RpcError> {
        self.notify(&format!("Starting channel {channel}"), None);

        let status: Status = invoke(
            self.gateway.as_ref(),
            Method::Play,
            json!({ "channel": channel }),
        )
        .await?;
        if !self.model.replace_status(status.clone()).await {
            debug!("dispatch: play result arrived after unmount");
            return Ok(status);
        }

        match status.channel {
            Some(now) => {
                info!("dispatch: playing channel {}", now);
                self.notify(&format!("Now playing channel {now}"), status.player.as_deref());
            }
            None => self.notify("Playback did not start", None),
        }
        Ok(status)
    }

    pub async fn stop(&self) -> Result<(), RpcError> {
        self.model.update_status(Status::mark_stopped).await;
        self.gateway.call(Method::Stop, no_args()).await?;
        self.notify("Stopped", None);
        Ok(())
    }

    /// Values above 100 are clamped.
    pub async fn set_volume(&self, volume: u8) -> Result<(), RpcError> {
        let volume = volume.min(MAX_VOLUME);
        self.model.update_status(|s| s.volume = volume).await;
        self.gateway
            .call(Method::SetVolume, json!({ "volume": volume }))
            .await?;
        Ok(())
    }

    pub async fn set_autoconnect(&self, enabled: bool) -> Result<Status, RpcError> {
        let status: Status = invoke(
            self.gateway.as_ref(),
            Method::SetAutoconnect,
            json!({ "enabled": enabled }),
        )
        .await?;
        self.model.replace_status(status.clone()).await;
        Ok(status)
    }

    fn notify(&self, title: &str, body: Option<&str>) {
        if let Err(e) = self.notifier.notify(title, body) {
            debug!("dispatch: notification dropped: {}", e);
        }
    }
}
