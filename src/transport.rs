// Discord REST transport: create and edit one channel message.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::dashboard::{ChatTransport, DestinationId, MessageId, PublishError};
use crate::render::MessageBody;
use crate::version::{NAME, VERSION};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord JSON error code for "Unknown Message".
const UNKNOWN_MESSAGE: u64 = 10008;

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordError {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    retry_after: Option<f64>,
}

pub struct DiscordTransport {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordTransport {
    pub fn new(api_base: &str, token: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(format!("DiscordBot ({}, {})", NAME, VERSION))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn messages_url(&self, destination: DestinationId) -> String {
        format!("{}/channels/{}/messages", self.api_base, destination)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    #[instrument(skip(self, body), fields(transport = "discord", operation = "create_message"))]
    async fn create_message(
        &self,
        destination: DestinationId,
        body: &MessageBody,
    ) -> Result<MessageId, PublishError> {
        let response = self
            .client
            .post(self.messages_url(destination))
            .header(AUTHORIZATION, self.auth())
            .json(body)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from(response).await);
        }
        let created: CreatedMessage = response
            .json()
            .await
            .map_err(|e| PublishError::Transport(format!("create response: {}", e)))?;
        created
            .id
            .parse::<MessageId>()
            .map_err(|e| PublishError::Transport(format!("message id {:?}: {}", created.id, e)))
    }

    #[instrument(skip(self, body), fields(transport = "discord", operation = "edit_message"))]
    async fn edit_message(
        &self,
        destination: DestinationId,
        message_id: MessageId,
        body: &MessageBody,
    ) -> Result<(), PublishError> {
        let response = self
            .client
            .patch(format!("{}/{}", self.messages_url(destination), message_id))
            .header(AUTHORIZATION, self.auth())
            .json(body)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(failure_from(response).await)
        }
    }
}

/// Maps a non-2xx response onto the publish error taxonomy.
/// Only a 404 carrying Discord's unknown-message code counts as NotFound; a 404
/// without a code (proxy, wrong api_base) or with any other code is a transport error.
async fn failure_from(response: Response) -> PublishError {
    let status = response.status();
    let header_retry = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());
    let error: DiscordError = response.json().await.unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => match error.code {
            Some(UNKNOWN_MESSAGE) => PublishError::NotFound,
            Some(code) => PublishError::Transport(format!("http_404 (code {})", code)),
            None => PublishError::Transport("http_404".into()),
        },
        StatusCode::TOO_MANY_REQUESTS => PublishError::RateLimited {
            retry_after: error
                .retry_after
                .or(header_retry)
                .and_then(|s| Duration::try_from_secs_f64(s).ok()),
        },
        other => PublishError::Transport(format!("http_{}", other.as_u16())),
    }
}
