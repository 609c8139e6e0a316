use reqwest::Client;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::errors::{GeminiError, GeminiResult};
use crate::types::*;

/// The key travels in a header; request URLs end up in error messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons for which the candidate carries no usable answer.
const BLOCKING_FINISH_REASONS: [&str; 5] =
    ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            GeminiError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )
        })?;

        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url(),
            self.config.model()
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let url = self.generate_url();
        debug!(
            model = self.config.model(),
            turns = request.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                GeminiError::RequestError(format!("Failed to send request: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                GeminiError::ResponseError(format!(
                    "Failed to read error response: {}",
                    e.without_url()
                ))
            })?;

            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                GeminiError::ParsingError(format!("Failed to parse response: {}", e.without_url()))
            })
    }

    /// Builds a request for a multi-turn exchange, optionally grounded with Google Search.
    pub fn build_request(&self, contents: Vec<Content>, grounded: bool) -> GenerateContentRequest {
        let system_instruction = self
            .config
            .system_prompt
            .as_ref()
            .map(|prompt| Content {
                parts: vec![Part::text(prompt.clone())],
                role: None,
            });

        GenerateContentRequest {
            contents,
            system_instruction,
            tools: grounded.then(|| vec![Tool::google_search()]),
            generation_config: Some(GenerationConfig::search_defaults()),
        }
    }

    /// Concatenates the text parts of the first candidate.
    pub fn extract_text_from_response(response: &GenerateContentResponse) -> GeminiResult<String> {
        let Some(candidate) = response.candidates.first() else {
            if let Some(reason) = response
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.as_ref())
            {
                return Err(GeminiError::Blocked(format!("prompt blocked ({})", reason)));
            }
            return Err(GeminiError::ResponseError(
                "No candidates in response".to_string(),
            ));
        };

        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
        {
            return Err(GeminiError::Blocked(format!("candidate finished with {}", reason)));
        }

        let content = candidate
            .content
            .as_ref()
            .ok_or_else(|| GeminiError::ResponseError("No content in candidate".to_string()))?;

        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if texts.is_empty() {
            return Err(GeminiError::ResponseError("No text in content".to_string()));
        }

        Ok(texts.concat())
    }

    /// Grounding evidence attached to the first candidate, if any.
    pub fn grounding_metadata(response: &GenerateContentResponse) -> Option<&GroundingMetadata> {
        response
            .candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
    }
}
