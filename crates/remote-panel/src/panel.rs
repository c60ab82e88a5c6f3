//! A mounted panel: one model, one poller, one dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::dispatcher::Dispatcher;
use crate::gateway::RpcGateway;
use crate::model::StatusModel;
use crate::notify::Notifier;
use crate::poller::Poller;

pub struct Panel {
    model: StatusModel,
    poller: Poller,
    dispatcher: Dispatcher,
}

impl Panel {
    /// Create a fresh model and start polling right away.
    pub fn mount(
        gateway: Arc<dyn RpcGateway>,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
    ) -> Self {
        info!("panel: mount");
        let model = StatusModel::new();
        let poller = Poller::start(gateway.clone(), model.clone(), poll_interval);
        let dispatcher = Dispatcher::new(gateway, model.clone(), notifier);
        Self {
            model,
            poller,
            dispatcher,
        }
    }

    pub fn model(&self) -> &StatusModel {
        &self.model
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Stop polling and freeze the model.  Operations still in flight finish
    /// against the backend but can no longer write locally.
    pub async fn unmount(mut self) {
        self.poller.stop().await;
        self.model.unmount().await;
        info!("panel: unmounted");
    }
}
