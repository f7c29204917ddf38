use serde::{Deserialize, Serialize};

use crate::block::BlockDescriptor;
use crate::notification::NotificationLevel;

/// Messages exchanged between the host panel and the viewer.
/// Fire-and-forget: nothing is acknowledged or correlated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebviewMessage {
    /// Host to viewer: a new or changed block to display
    #[serde(rename_all = "camelCase")]
    UpdateMermaidGraph { block_info: BlockDescriptor },

    /// Viewer to host: surface a toast
    #[serde(rename_all = "camelCase")]
    ShowNotification {
        message: String,
        notification_type: NotificationLevel,
    },
}

impl WebviewMessage {
    pub fn update(block_info: BlockDescriptor) -> Self {
        Self::UpdateMermaidGraph { block_info }
    }

    pub fn notification(message: impl Into<String>, level: NotificationLevel) -> Self {
        Self::ShowNotification {
            message: message.into(),
            notification_type: level,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
