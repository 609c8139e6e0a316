//! Grounded conversational search.
//!
//! A question goes to Gemini with Google Search grounding enabled; the answer
//! comes back as HTML plus a de-duplicated list of cited web sources, and a
//! session identifier that later follow-up questions use to continue the same
//! conversation.

pub mod citations;
pub mod config;
pub mod coordinator;
pub mod http_server;
pub mod markdown;
pub mod provider;
pub mod session;

#[cfg(test)]
mod test_support;

pub use citations::{extract_citations, Citation};
pub use coordinator::{FallbackReason, FollowUp, SearchCoordinator, SearchError, SearchResult};
