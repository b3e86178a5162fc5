// The single live dashboard message per destination.
//
// NoMessage --publish--> create --ok--> HasMessage(id)
// HasMessage(id) --publish--> edit(id)
//   ok         -> HasMessage(id)
//   NotFound   -> NoMessage, then create in the same call
//   other err  -> HasMessage(id), error surfaced
//
// Recreation only ever follows a definitive NotFound, never a transient failure.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::models::Snapshot;
use crate::render::{MessageBody, Renderer};

pub type MessageId = u64;
pub type DestinationId = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("message not found")]
    NotFound,
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transport error: {0}")]
    Transport(String),
}

/// Chat platform seam. `edit_message` must report `NotFound` only when the platform
/// positively identifies the message as deleted. A 404 without that signal (no error
/// code, foreign body) is `Transport`, and everything else is `RateLimited`/`Transport`.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn create_message(
        &self,
        destination: DestinationId,
        body: &MessageBody,
    ) -> Result<MessageId, PublishError>;

    async fn edit_message(
        &self,
        destination: DestinationId,
        message_id: MessageId,
        body: &MessageBody,
    ) -> Result<(), PublishError>;
}

/// Durable destination -> message id record, so a restart resumes editing.
#[async_trait]
pub trait MessageIdStore: Send + Sync {
    async fn load(&self, destination: DestinationId) -> anyhow::Result<Option<MessageId>>;
    async fn save(&self, destination: DestinationId, message_id: MessageId) -> anyhow::Result<()>;
    async fn clear(&self, destination: DestinationId) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub destination_id: DestinationId,
    pub current_message_id: Option<MessageId>,
}

impl DashboardState {
    pub fn new(destination_id: DestinationId) -> Self {
        Self {
            destination_id,
            current_message_id: None,
        }
    }

    pub fn with_message(destination_id: DestinationId, message_id: MessageId) -> Self {
        Self {
            destination_id,
            current_message_id: Some(message_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Edited(MessageId),
    Created(MessageId),
    /// The stored message was gone; a replacement was sent in the same publish.
    Recreated { lost: MessageId, created: MessageId },
}

impl PublishOutcome {
    pub fn message_id(&self) -> MessageId {
        match *self {
            Self::Edited(id) | Self::Created(id) => id,
            Self::Recreated { created, .. } => created,
        }
    }
}

pub struct DashboardMessage {
    transport: Arc<dyn ChatTransport>,
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn MessageIdStore>,
}

impl DashboardMessage {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn MessageIdStore>,
    ) -> Self {
        Self {
            transport,
            renderer,
            store,
        }
    }

    /// Loads the persisted message id; an unreadable record starts from NoMessage.
    pub async fn restore(&self, destination: DestinationId) -> DashboardState {
        match self.store.load(destination).await {
            Ok(Some(id)) => {
                info!(destination, message_id = id, "resuming dashboard message");
                DashboardState::with_message(destination, id)
            }
            Ok(None) => DashboardState::new(destination),
            Err(e) => {
                warn!(error = %e, operation = "load_message_id", "could not read message id record");
                DashboardState::new(destination)
            }
        }
    }

    #[instrument(skip_all, fields(operation = "publish", destination = state.destination_id))]
    pub async fn publish(
        &self,
        state: &mut DashboardState,
        snapshot: &Snapshot,
    ) -> Result<PublishOutcome, PublishError> {
        let body = self.renderer.render(snapshot);

        let Some(id) = state.current_message_id else {
            let created = self.create(state, &body).await?;
            info!(message_id = created, "dashboard message created");
            return Ok(PublishOutcome::Created(created));
        };

        match self
            .transport
            .edit_message(state.destination_id, id, &body)
            .await
        {
            Ok(()) => {
                debug!(message_id = id, "dashboard message edited");
                Ok(PublishOutcome::Edited(id))
            }
            Err(PublishError::NotFound) => {
                info!(message_id = id, "dashboard message gone; recreating");
                state.current_message_id = None;
                self.forget(state.destination_id).await;
                let created = self.create(state, &body).await?;
                Ok(PublishOutcome::Recreated { lost: id, created })
            }
            Err(e) => Err(e),
        }
    }

    /// Administrative override: forget the current message so the next publish creates one.
    #[instrument(skip_all, fields(operation = "reset", destination = state.destination_id))]
    pub async fn reset(&self, state: &mut DashboardState) {
        state.current_message_id = None;
        self.forget(state.destination_id).await;
        info!("dashboard reset");
    }

    async fn create(
        &self,
        state: &mut DashboardState,
        body: &MessageBody,
    ) -> Result<MessageId, PublishError> {
        let id = self
            .transport
            .create_message(state.destination_id, body)
            .await?;
        state.current_message_id = Some(id);
        if let Err(e) = self.store.save(state.destination_id, id).await {
            warn!(error = %e, operation = "save_message_id", message_id = id, "could not persist message id");
        }
        Ok(id)
    }

    async fn forget(&self, destination: DestinationId) {
        if let Err(e) = self.store.clear(destination).await {
            warn!(error = %e, operation = "clear_message_id", "could not clear message id record");
        }
    }
}
