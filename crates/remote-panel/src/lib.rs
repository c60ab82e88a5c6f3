//! Client side of the NTS remote: keeps a local view of the playback
//! backend in sync and turns user intents into RPC calls.

pub mod dispatcher;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod panel;
pub mod poller;
pub mod presentation;

pub use dispatcher::Dispatcher;
pub use gateway::{HttpGateway, RpcError, RpcGateway};
pub use model::{Snapshot, StatusModel};
pub use notify::{Notification, NotificationError, Notifier};
pub use panel::Panel;
pub use poller::Poller;
pub use presentation::{ControlState, Intent};
