use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::InstallStage;

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Progress notification for one install request.
#[derive(Debug, Clone, Serialize)]
pub struct InstallEvent {
    pub request_id: Uuid,
    pub stage: InstallStage,
    /// Percent of the current stage, 0..=100.
    pub percent: u8,
    pub message: String,
}

/// Emits events for one request; sending never fails when nobody listens.
#[derive(Clone)]
pub(crate) struct EventSink {
    request_id: Uuid,
    sender: broadcast::Sender<InstallEvent>,
}

impl EventSink {
    pub(crate) fn new(request_id: Uuid, sender: broadcast::Sender<InstallEvent>) -> Self {
        Self { request_id, sender }
    }

    pub(crate) fn emit(&self, stage: InstallStage, percent: u8, message: impl Into<String>) {
        let _ = self.sender.send(InstallEvent {
            request_id: self.request_id,
            stage,
            percent: percent.min(100),
            message: message.into(),
        });
    }
}
