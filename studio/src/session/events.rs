//! Session events for observers (render layer, shell).

use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::catalog::GpuIndicator;

const CHANNEL_CAPACITY: usize = 64;

/// Session state change event - single stream for every visible change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionStateChanged {
    /// A generation request was sent
    Generating,
    /// A new image is displayed
    #[serde(rename_all = "camelCase")]
    ImageReady { url: String, seed_label: String },
    /// An upscale request was sent
    Upscaling,
    /// The upscaled image replaced the previous one
    #[serde(rename_all = "camelCase")]
    Upscaled { url: String, seed_label: String },
    /// A generation or upscale request failed
    #[serde(rename_all = "camelCase")]
    Failed {
        operation: String,
        error_message: String,
        user_message: String,
    },
    /// An action was rejected before any request
    #[serde(rename_all = "camelCase")]
    ValidationRejected { user_message: String },
    #[serde(rename_all = "camelCase")]
    PromptRandomized {
        prompt: String,
        negative_prompt: String,
    },
    GpuStatus { indicator: GpuIndicator },
}

/// Sending side of the session event stream. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionStateChanged>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionStateChanged> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SessionStateChanged) {
        if self.sender.send(event).is_err() {
            debug!("No session event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_json_shape() {
        let event = SessionStateChanged::ImageReady {
            url: "blob:goblin/1".to_string(),
            seed_label: "42".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"state": "imageReady", "url": "blob:goblin/1", "seedLabel": "42"})
        );

        let event = SessionStateChanged::GpuStatus {
            indicator: GpuIndicator::Cpu,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"state": "gpuStatus", "indicator": {"state": "cpu"}})
        );
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.emit(SessionStateChanged::Generating);

        let mut rx = bus.subscribe();
        bus.emit(SessionStateChanged::Upscaling);
        assert_eq!(rx.recv().await.unwrap(), SessionStateChanged::Upscaling);
    }
}
