//! In-process message transport between host panel and viewer
//!
//! Two unbounded channels, one per direction. Posting never blocks and never
//! fails from the caller's point of view: a closed peer is only logged.

use flume::{Receiver, Sender};
use log::warn;

use crate::message::WebviewMessage;

#[derive(Debug)]
struct Endpoint {
    tx: Sender<WebviewMessage>,
    rx: Receiver<WebviewMessage>,
}

impl Endpoint {
    fn post(&self, side: &str, message: WebviewMessage) {
        if let Err(e) = self.tx.send(message) {
            warn!("{side} dropped message, peer is gone: {:?}", e.into_inner());
        }
    }

    fn drain(&self) -> Vec<WebviewMessage> {
        self.rx.try_iter().collect()
    }
}

/// Host (editor) side of the transport
#[derive(Debug)]
pub struct HostEndpoint(Endpoint);

/// Viewer side of the transport
#[derive(Debug)]
pub struct ViewerEndpoint(Endpoint);

pub fn channel() -> (HostEndpoint, ViewerEndpoint) {
    let (to_viewer, from_host) = flume::unbounded();
    let (to_host, from_viewer) = flume::unbounded();
    (
        HostEndpoint(Endpoint {
            tx: to_viewer,
            rx: from_viewer,
        }),
        ViewerEndpoint(Endpoint {
            tx: to_host,
            rx: from_host,
        }),
    )
}

impl HostEndpoint {
    pub fn post(&self, message: WebviewMessage) {
        self.0.post("host", message);
    }

    /// Everything the viewer has sent so far, oldest first
    pub fn drain(&self) -> Vec<WebviewMessage> {
        self.0.drain()
    }
}

impl ViewerEndpoint {
    pub fn post(&self, message: WebviewMessage) {
        self.0.post("viewer", message);
    }

    /// Everything the host has sent so far, oldest first
    pub fn drain(&self) -> Vec<WebviewMessage> {
        self.0.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationLevel;

    #[test]
    fn messages_flow_both_ways_in_order() {
        let (host, viewer) = channel();

        viewer.post(WebviewMessage::notification("one", NotificationLevel::Info));
        viewer.post(WebviewMessage::notification("two", NotificationLevel::Warning));

        let received = host.drain();
        assert_eq!(
            received,
            vec![
                WebviewMessage::notification("one", NotificationLevel::Info),
                WebviewMessage::notification("two", NotificationLevel::Warning),
            ]
        );
        assert!(host.drain().is_empty());
        assert!(viewer.drain().is_empty());
    }

    #[test]
    fn posting_to_closed_peer_is_silent() {
        let (host, viewer) = channel();
        drop(viewer);
        host.post(WebviewMessage::notification("lost", NotificationLevel::Info));
        assert!(host.drain().is_empty());
    }
}
