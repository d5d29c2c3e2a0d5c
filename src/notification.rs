use std::{net::Ipv4Addr, time::Duration};

use tokio::sync::{mpsc, Mutex};

/// Emitted once per live host, as soon as its probe resolves.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct HostUp {
    pub target_ip: Ipv4Addr,
    /// Time since the sweep started.
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub(super) struct NotificationHandler {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<HostUp>>>,
}

impl NotificationHandler {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) async fn register_subscriber(&self) -> mpsc::UnboundedReceiver<HostUp> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().await.push(sender);
        receiver
    }

    pub(super) async fn notify(&self, event: HostUp) {
        self.subscribers
            .lock()
            .await
            .retain(|subscriber| subscriber.send(event).is_ok());
    }
}
