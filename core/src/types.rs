use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";

/// Request to Gemini API to generate content
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Tool definition for Gemini API
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

impl Tool {
    /// The web-search grounding tool, sent as `{"googleSearch": {}}`.
    pub fn google_search() -> Self {
        Self {
            google_search: Some(GoogleSearch::default()),
        }
    }
}

/// Empty marker object enabling Google Search grounding.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct GoogleSearch {}

/// Content structure for requests and responses
#[derive(Serialize, Clone, Debug, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: Some(ROLE_USER.to_string()),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: Some(ROLE_MODEL.to_string()),
        }
    }
}

/// Part structure for a piece of content
#[derive(Serialize, Clone, Debug, Deserialize, PartialEq)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Generation configuration options
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

impl GenerationConfig {
    /// Sampling settings used for grounded search answers.
    pub fn search_defaults() -> Self {
        Self {
            temperature: Some(0.9),
            top_p: Some(1.0),
            top_k: Some(1),
            max_output_tokens: Some(2048),
        }
    }
}

/// Response from Gemini API
#[derive(Deserialize, Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Candidate in the response
#[derive(Deserialize, Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Evidence backing a grounded answer: the web pages consulted and
/// the answer segments each page supports.
#[derive(Deserialize, Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
    #[serde(default)]
    pub grounding_supports: Option<Vec<GroundingSupport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search_queries: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Serialize, Clone, Default, PartialEq)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Deserialize, Debug, Serialize, Clone, Default, PartialEq)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize, Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default)]
    pub segment: Option<Segment>,
    #[serde(default)]
    pub grounding_chunk_indices: Option<Vec<usize>>,
}

/// Span of the answer text corroborated by one or more chunks.
#[derive(Deserialize, Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
}
