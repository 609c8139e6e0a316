//! In-process model stub shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gemini_core::errors::{GeminiError, GeminiResult};
use gemini_core::types::{GroundingChunk, GroundingMetadata, WebChunk};

use crate::provider::{ChatProvider, ProviderReply};
use crate::session::ConversationTurn;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub transcript: Vec<ConversationTurn>,
    pub query: String,
    pub grounded: bool,
}

/// Replays queued replies in order, echoing the query once the queue is empty.
#[derive(Default)]
pub struct StubProvider {
    replies: Mutex<VecDeque<GeminiResult<ProviderReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: ProviderReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(GeminiError::HttpError {
                status_code: 500,
                message: message.to_string(),
            }));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    async fn send_turn(
        &self,
        transcript: &[ConversationTurn],
        query: &str,
        grounded: bool,
    ) -> GeminiResult<ProviderReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            transcript: transcript.to_vec(),
            query: query.to_string(),
            grounded,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.replies.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(ProviderReply {
                text: format!("answer for {}", query),
                grounding_metadata: None,
            })
        })
    }
}

/// A reply citing one web chunk per `(url, title)` pair.
pub fn grounded_reply(text: &str, sources: &[(&str, &str)]) -> ProviderReply {
    let chunks = sources
        .iter()
        .map(|(url, title)| GroundingChunk {
            web: Some(WebChunk {
                uri: Some(url.to_string()),
                title: Some(title.to_string()),
            }),
        })
        .collect();

    ProviderReply {
        text: text.to_string(),
        grounding_metadata: Some(GroundingMetadata {
            grounding_chunks: Some(chunks),
            ..GroundingMetadata::default()
        }),
    }
}
