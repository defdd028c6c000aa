/// Model protocol: transcript encoding, the chat round trip and reply parsing.
///
/// The chat transport is abstracted by [`ChatChannel`]; everything else in
/// this module is pure text processing around it.
pub mod http;
pub mod mock;
pub mod parser;
pub mod prompt;
pub mod session;
pub mod transcript;

pub use session::{Copilot, CopilotError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors raised by a chat transport.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("unexpected response: {0}")]
    BadResponse(String),

    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text chunks of one reply, in arrival order.
pub type ChunkStream = mpsc::Receiver<Result<String, ChannelError>>;

/// Opaque request/response chat transport.
///
/// Implementations must be `Send + Sync` so one channel can serve many
/// concurrent inspections behind `Arc`.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Send the full conversation and stream back the reply.
    ///
    /// `cancel` is best-effort: implementations should stop producing chunks
    /// once it is triggered.
    async fn send(
        &self,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ChannelError>;
}
