//! Gemini `generateContent` plumbing shared by the search daemon:
//! wire types (including Google Search grounding metadata), the HTTP
//! client, provider configuration and errors.

pub mod client;
pub use client::GeminiClient;

pub mod types;
pub use types::*;

pub mod config;
pub use config::*;

pub mod errors;
pub use errors::*;
