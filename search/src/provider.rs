use std::sync::Arc;

use async_trait::async_trait;
use gemini_core::client::GeminiClient;
use gemini_core::errors::GeminiResult;
use gemini_core::types::{Content, GroundingMetadata};
use tracing::debug;

use crate::session::ConversationTurn;

/// What the model produced for one turn.
#[derive(Debug, Clone, Default)]
pub struct ProviderReply {
    pub text: String,
    pub grounding_metadata: Option<GroundingMetadata>,
}

/// The language model behind a conversation.
///
/// Takes the transcript so far plus the new query and returns one reply;
/// the caller owns the transcript and decides whether to record the turn.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send_turn(
        &self,
        transcript: &[ConversationTurn],
        query: &str,
        grounded: bool,
    ) -> GeminiResult<ProviderReply>;
}

pub type ChatProviderRef = Arc<dyn ChatProvider>;

/// `ChatProvider` backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn send_turn(
        &self,
        transcript: &[ConversationTurn],
        query: &str,
        grounded: bool,
    ) -> GeminiResult<ProviderReply> {
        let request = self
            .client
            .build_request(transcript_contents(transcript, query), grounded);
        let response = self.client.generate_content(&request).await?;

        let text = GeminiClient::extract_text_from_response(&response)?;
        let grounding_metadata = GeminiClient::grounding_metadata(&response).cloned();
        debug!(
            answer_len = text.len(),
            grounded = grounding_metadata.is_some(),
            "Received model reply"
        );

        Ok(ProviderReply {
            text,
            grounding_metadata,
        })
    }
}

/// Replays the transcript as alternating user/model contents, then the new query.
pub fn transcript_contents(transcript: &[ConversationTurn], query: &str) -> Vec<Content> {
    let mut contents = Vec::with_capacity(transcript.len() * 2 + 1);
    for turn in transcript {
        contents.push(Content::user(turn.query.clone()));
        contents.push(Content::model(turn.raw_answer.clone()));
    }
    contents.push(Content::user(query));
    contents
}
