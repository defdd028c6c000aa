/// Chat session with bounded continuation.
///
/// Replies may be cut off by the model's output limit. Until the accumulated
/// answer ends with the end mark, the session asks the model to continue,
/// sending at most `max_rounds` requests in total.
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::prompt::{self, DEFAULT_END_MARK};
use super::transcript::Transcript;
use super::{ChannelError, ChatChannel, ChatMessage, parser};
use crate::inspection::Finding;
use crate::symbols::document::split_lines;

pub const DEFAULT_MAX_ROUNDS: usize = 3;

#[derive(Error, Debug)]
pub enum CopilotError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

pub struct Copilot {
    channel: Arc<dyn ChatChannel>,
    max_rounds: usize,
    end_mark: String,
    java_version: u32,
}

impl Copilot {
    pub fn new(channel: Arc<dyn ChatChannel>) -> Self {
        Self {
            channel,
            max_rounds: DEFAULT_MAX_ROUNDS,
            end_mark: DEFAULT_END_MARK.to_string(),
            java_version: 17,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_end_mark(mut self, end_mark: impl Into<String>) -> Self {
        self.end_mark = end_mark.into();
        self
    }

    pub fn with_java_version(mut self, java_version: u32) -> Self {
        self.java_version = java_version;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Send a conversation and collect the complete answer.
    ///
    /// The trailing end mark (with an optional `//` prefix) is removed. When
    /// the mark never arrives, whatever accumulated after `max_rounds`
    /// requests is returned.
    pub async fn send(&self, messages: Vec<ChatMessage>) -> Result<String, CopilotError> {
        let cancel = CancellationToken::new();
        let mut history = messages;
        let mut answer = String::new();

        for round in 1..=self.max_rounds {
            let mut stream = self.channel.send(&history, cancel.clone()).await?;
            let mut reply = String::new();
            while let Some(chunk) = stream.recv().await {
                reply.push_str(&chunk?);
            }
            debug!("round {round}: received {} chars", reply.len());
            answer.push_str(&reply);

            if answer.trim_end().ends_with(&self.end_mark) {
                break;
            }
            if round < self.max_rounds {
                history.push(ChatMessage::assistant(reply));
                history.push(ChatMessage::user(prompt::continue_message(&self.end_mark)));
            } else {
                debug!("no end mark after {round} rounds, using partial answer");
            }
        }

        Ok(self.strip_end_mark(&answer))
    }

    fn strip_end_mark(&self, answer: &str) -> String {
        let commented = format!("//{}", self.end_mark);
        answer
            .replace(&commented, "")
            .replace(&self.end_mark, "")
    }

    /// Full inspection round trip for a piece of code.
    ///
    /// Findings carry lines relative to `code`. Code with nothing left after
    /// comment stripping never reaches the channel.
    pub async fn inspect(&self, code: &str) -> Result<Vec<Finding>, CopilotError> {
        let transcript = Transcript::encode(code);
        if transcript.is_empty() {
            return Ok(Vec::new());
        }

        let mut messages = prompt::preamble(self.java_version, &self.end_mark);
        messages.push(ChatMessage::user(transcript.text()));
        let answer = self.send(messages).await?;

        let annotations = parser::extract_annotations(&answer);
        let findings = parser::remap(annotations, &transcript, &split_lines(code));
        debug!("{} finding(s) from {} transcript lines", findings.len(), transcript.line_count());
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copilot::Role;
    use crate::copilot::mock::MockChannel;

    fn copilot(channel: &Arc<MockChannel>) -> Copilot {
        Copilot::new(Arc::clone(channel) as Arc<dyn ChatChannel>)
    }

    #[tokio::test]
    async fn test_single_round_when_end_mark_present() {
        let channel = Arc::new(MockChannel::new(["hello\n//<|endofresponse|>"]));
        let answer = copilot(&channel)
            .send(vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(answer, "hello\n");
        assert_eq!(channel.request_count(), 1);
    }

    #[tokio::test]
    async fn test_continuation_concatenates_parts() {
        let channel = Arc::new(MockChannel::new(["part one, ", "part two<|endofresponse|>"]));
        let answer = copilot(&channel)
            .send(vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(answer, "part one, part two");

        let requests = channel.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(second[1].content, "part one, ");
        assert!(second[2].content.starts_with("continue where you left off"));
    }

    #[tokio::test]
    async fn test_rounds_are_bounded() {
        let channel = Arc::new(MockChannel::new(["never ends "]));
        let answer = copilot(&channel)
            .with_max_rounds(3)
            .send(vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(channel.request_count(), 3);
        assert_eq!(answer, "never ends never ends never ends ");
    }

    #[tokio::test]
    async fn test_channel_failure_propagates() {
        let channel = Arc::new(MockChannel::failing("offline"));
        let err = copilot(&channel)
            .send(vec![ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::Channel(ChannelError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_inspect_empty_code_skips_channel() {
        let channel = Arc::new(MockChannel::new(["unused"]));
        let findings = copilot(&channel).inspect("// only a comment\n\n").await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(channel.request_count(), 0);
    }

    #[tokio::test]
    async fn test_inspect_round_trip() {
        let code = "class C {\n  // comment\n  int x = 1;\n}\n";
        let reply = "class C {\n// @PROBLEM: Using magic number\n// @SOLUTION: Extract a constant\n\
                     // @SYMBOL: 1\n// @SEVERITY: LOW\n  int x = 1;\n}\n//<|endofresponse|>";
        let channel = Arc::new(MockChannel::new([reply]));
        let findings = copilot(&channel).inspect(code).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].problem.position.line, 2);

        // preamble plus transcript
        let request = &channel.requests()[0];
        assert_eq!(request.len(), 4);
        assert_eq!(request[3].content, "class C {\n  int x = 1;\n}\n");
    }
}
