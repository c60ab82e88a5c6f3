//! Fire-and-forget user notifications.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification sink closed")]
    Closed,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// A toast-style message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: Option<String>,
}

pub trait Notifier: Send + Sync {
    /// Deliver a notification.  Callers ignore the error.
    fn notify(&self, title: &str, body: Option<&str>) -> Result<(), NotificationError>;
}

/// Writes notifications to the log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: Option<&str>) -> Result<(), NotificationError> {
        match body {
            Some(body) => info!("notify: {}: {}", title, body),
            None => info!("notify: {}", title),
        }
        Ok(())
    }
}

/// Forwards notifications to the host UI over a channel.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, title: &str, body: Option<&str>) -> Result<(), NotificationError> {
        self.tx
            .send(Notification {
                title: title.to_string(),
                body: body.map(str::to_string),
            })
            .map_err(|_| NotificationError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers_then_reports_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let n = ChannelNotifier::new(tx);
        n.notify("Starting channel 1", None).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification {
                title: "Starting channel 1".into(),
                body: None
            }
        );
        drop(rx);
        assert!(matches!(n.notify("x", Some("y")), Err(NotificationError::Closed)));
    }
}
