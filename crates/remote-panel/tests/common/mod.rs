//! Shared test doubles: a gateway whose calls stay pending until the test
//! answers them, and a notifier that records what it was asked to show.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use remote_panel::gateway::{RpcError, RpcGateway};
use remote_panel::notify::{Notification, NotificationError, Notifier};
use remote_proto::protocol::{Channel, Method, NowPlaying, ShowInfo, Status};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// A call the gateway has received but not yet answered.
pub struct PendingCall {
    pub method: Method,
    pub args: Value,
    reply: oneshot::Sender<Result<Value, RpcError>>,
}

impl PendingCall {
    pub fn respond(self, value: Value) {
        // The caller may be gone (cancelled poll cycle); that is fine.
        let _ = self.reply.send(Ok(value));
    }

    pub fn respond_status(self, status: &Status) {
        self.respond(serde_json::to_value(status).unwrap());
    }

    pub fn respond_now_playing(self, np: &NowPlaying) {
        self.respond(serde_json::to_value(np).unwrap());
    }

    pub fn fail(self, message: &str) {
        let method = self.method;
        let _ = self.reply.send(Err(RpcError::Backend {
            method,
            message: message.to_string(),
        }));
    }
}

pub struct ScriptedGateway {
    tx: mpsc::UnboundedSender<PendingCall>,
}

#[async_trait]
impl RpcGateway for ScriptedGateway {
    async fn call(&self, method: Method, args: Value) -> Result<Value, RpcError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PendingCall {
                method,
                args,
                reply,
            })
            .map_err(|_| RpcError::Transport("script closed".into()))?;
        rx.await
            .map_err(|_| RpcError::Transport("call abandoned by test".into()))?
    }
}

pub struct CallQueue {
    rx: mpsc::UnboundedReceiver<PendingCall>,
}

impl CallQueue {
    /// Next call the gateway received; panics after five seconds.
    pub async fn next(&mut self) -> PendingCall {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("no gateway call arrived")
            .expect("gateway dropped")
    }

    pub async fn expect(&mut self, method: Method) -> PendingCall {
        let call = self.next().await;
        assert_eq!(call.method, method, "unexpected call {:?}", call.method);
        call
    }

    pub fn try_next(&mut self) -> Option<PendingCall> {
        self.rx.try_recv().ok()
    }
}

pub fn scripted_gateway() -> (Arc<ScriptedGateway>, CallQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ScriptedGateway { tx }), CallQueue { rx })
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: Option<&str>) -> Result<(), NotificationError> {
        self.seen.lock().unwrap().push(Notification {
            title: title.to_string(),
            body: body.map(str::to_string),
        });
        Ok(())
    }
}

/// Notifier whose delivery always fails.
pub struct BrokenNotifier;

impl Notifier for BrokenNotifier {
    fn notify(&self, _title: &str, _body: Option<&str>) -> Result<(), NotificationError> {
        Err(NotificationError::Delivery("toast service down".into()))
    }
}

// ── fixtures ──────────────────────────────────────────────────────────────────

pub fn idle_status() -> Status {
    Status {
        available: true,
        playing: false,
        channel: None,
        player: Some("mpv".into()),
        volume: 70,
        autoconnect: true,
    }
}

pub fn playing_status(ch: Channel) -> Status {
    Status {
        playing: true,
        channel: Some(ch),
        ..idle_status()
    }
}

pub fn now_playing(title: &str) -> NowPlaying {
    NowPlaying {
        ch1: Some(ShowInfo {
            now_title: Some(title.to_string()),
            ..Default::default()
        }),
        ch2: None,
        // whole seconds: the wire format drops sub-second precision
        fetched_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
    }
}

/// Let spawned tasks run until they block on the gateway.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
