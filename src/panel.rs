use std::time::Instant;

use log::{debug, error, info, warn};

use crate::block::BlockDescriptor;
use crate::message::WebviewMessage;
use crate::notification::{NotificationLevel, NotificationManager};
use crate::transport::HostEndpoint;

/// Host side of the viewer: tracks which block the viewer shows and
/// forwards edits of that block only.
#[derive(Debug)]
pub struct ViewerPanel {
    endpoint: HostEndpoint,
    active: Option<BlockDescriptor>,
    notifications: NotificationManager,
}

impl ViewerPanel {
    pub fn new(endpoint: HostEndpoint) -> Self {
        Self {
            endpoint,
            active: None,
            notifications: NotificationManager::new(),
        }
    }

    pub fn active_block(&self) -> Option<&BlockDescriptor> {
        self.active.as_ref()
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationManager {
        &mut self.notifications
    }

    pub fn is_active_block(&self, block: &BlockDescriptor) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.is_same_block(Some(block)))
    }

    /// Make `block` the one on display
    pub fn show(&mut self, block: BlockDescriptor) {
        info!(
            "Showing block #{} of {}",
            block.sequence, block.document_uri
        );
        self.update_content(block);
    }

    /// Forward a freshly scanned block if it is the one on display and its
    /// text changed. Returns true if it was forwarded.
    pub fn process_block(&mut self, block: &BlockDescriptor) -> bool {
        let changed = self
            .active
            .as_ref()
            .is_some_and(|active| active.is_same_block(Some(block)) && active.content != block.content);
        if changed {
            self.update_content(block.clone());
        }
        changed
    }

    pub fn update_content(&mut self, block: BlockDescriptor) {
        self.active = Some(block.clone());
        self.endpoint.post(WebviewMessage::update(block));
    }

    /// Move viewer notifications into the toast list and drop expired ones
    pub fn pump_notifications_at(&mut self, now: Instant) -> usize {
        let mut received = 0;
        for message in self.endpoint.drain() {
            match message {
                WebviewMessage::ShowNotification {
                    message,
                    notification_type,
                } => {
                    match notification_type {
                        NotificationLevel::Info => info!("{message}"),
                        NotificationLevel::Warning => warn!("{message}"),
                        NotificationLevel::Error => error!("{message}"),
                    }
                    self.notifications.notify_at(message, notification_type, now);
                    received += 1;
                }
                WebviewMessage::UpdateMermaidGraph { block_info } => {
                    warn!(
                        "Host ignored block update from viewer: #{}",
                        block_info.sequence
                    );
                }
            }
        }
        self.notifications.update_at(now);
        received
    }

    pub fn dispose(&mut self) {
        debug!("Viewer panel disposed");
        self.active = None;
    }
}
