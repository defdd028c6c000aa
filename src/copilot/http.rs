/// Chat channel over an OpenAI-compatible `/chat/completions` endpoint.
///
/// Requests are sent with `stream: true`; the server-sent event body is read
/// incrementally and every `delta.content` is forwarded as one chunk.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ChannelError, ChatChannel, ChatMessage, ChunkStream};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

/// One decoded SSE line.
#[derive(Debug, PartialEq, Eq)]
enum Event {
    Content(String),
    Done,
}

fn parse_event(line: &str) -> Result<Option<Event>, ChannelError> {
    let Some(payload) = line.trim_end_matches('\r').strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(Some(Event::Done));
    }
    if payload.is_empty() {
        return Ok(None);
    }
    let chunk: CompletionChunk = serde_json::from_str(payload)
        .map_err(|e| ChannelError::BadResponse(format!("{e}: {payload}")))?;
    let content: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();
    Ok((!content.is_empty()).then_some(Event::Content(content)))
}

pub struct HttpChatChannel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpChatChannel {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatChannel for HttpChatChannel {
    async fn send(
        &self,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ChannelError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            stream: true,
        };
        let mut request = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChannelError::Cancelled),
            r = request.send() => r.map_err(|e| ChannelError::RequestFailed(e.to_string()))?,
        };
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChannelError::RequestFailed(format!("HTTP {status}: {text}")));
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(pump(response, tx, cancel));
        Ok(rx)
    }
}

/// Read the event stream and forward content chunks until `[DONE]`,
/// the end of the body, cancellation, or the receiver going away.
async fn pump(
    mut response: reqwest::Response,
    tx: mpsc::Sender<Result<String, ChannelError>>,
    cancel: CancellationToken,
) {
    let mut buffer: Vec<u8> = Vec::new();
    loop {
        let next = tokio::select! {
            c = response.chunk() => c,
            _ = cancel.cancelled() => {
                let _ = tx.send(Err(ChannelError::Cancelled)).await;
                return;
            }
        };
        let bytes = match next {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(ChannelError::RequestFailed(e.to_string()))).await;
                return;
            }
        };
        buffer.extend_from_slice(&bytes);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            match parse_event(&line) {
                Ok(Some(Event::Content(text))) => {
                    if tx.send(Ok(text)).await.is_err() {
                        return;
                    }
                }
                Ok(Some(Event::Done)) => {
                    debug!("stream finished");
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("{e}");
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    }

    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        if let Ok(Some(Event::Content(text))) = parse_event(&line) {
            let _ = tx.send(Ok(text)).await;
        }
    }
}
