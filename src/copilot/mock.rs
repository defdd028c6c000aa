/// Scripted chat channel for testing purposes.
///
/// Replays canned replies in order (repeating the last one when exhausted)
/// and records every conversation it receives, so tests can run the full
/// protocol without a model.
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ChannelError, ChatChannel, ChatMessage, ChunkStream};

#[derive(Default)]
pub struct MockChannel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    chunk_size: usize,
}

impl MockChannel {
    /// Channel answering with `replies`, one per request.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            chunk_size: 16,
            ..Self::default()
        }
    }

    /// Channel whose every request fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.into())])),
            chunk_size: 16,
            ..Self::default()
        }
    }

    /// Conversations received so far.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_reply(&self) -> Result<String, String> {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match replies.pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().unwrap_or_else(|| Ok(String::new())),
        }
    }
}

#[async_trait]
impl ChatChannel for MockChannel {
    async fn send(
        &self,
        messages: &[ChatMessage],
        _cancel: CancellationToken,
    ) -> Result<ChunkStream, ChannelError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());

        let reply = self.next_reply().map_err(ChannelError::RequestFailed)?;

        // split into small chunks to exercise reassembly
        let chars: Vec<char> = reply.chars().collect();
        let chunks: Vec<String> = chars
            .chunks(self.chunk_size.max(1))
            .map(|c| c.iter().collect())
            .collect();
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            let _ = tx.try_send(Ok(chunk));
        }
        Ok(rx)
    }
}
