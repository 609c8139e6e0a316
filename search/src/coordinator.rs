use gemini_core::errors::GeminiError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::citations::{extract_citations, Citation};
use crate::markdown;
use crate::provider::ChatProviderRef;
use crate::session::{ConversationTurn, SessionStoreError, SessionStoreRef};

/// The outcome of one search turn, handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub session_id: String,
    /// The answer rendered as HTML.
    pub summary: String,
    pub sources: Vec<Citation>,
}

/// Why a follow-up ended up in a new conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The referenced session never existed, was evicted, or expired.
    SessionMiss,
}

/// Result of a follow-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// The turn was appended to the existing session.
    Continued(SearchResult),
    /// The session was unavailable; a new one was started for the query.
    StartedNew {
        result: SearchResult,
        reason: FallbackReason,
    },
}

impl FollowUp {
    pub fn result(&self) -> &SearchResult {
        match self {
            FollowUp::Continued(result) => result,
            FollowUp::StartedNew { result, .. } => result,
        }
    }

    pub fn is_continued(&self) -> bool {
        matches!(self, FollowUp::Continued(_))
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Failed to get response from LLM: {0}")]
    Provider(#[from] GeminiError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Runs grounded search conversations on top of a session store and a model.
#[derive(Clone)]
pub struct SearchCoordinator {
    store: SessionStoreRef,
    provider: ChatProviderRef,
}

impl SearchCoordinator {
    pub fn new(store: SessionStoreRef, provider: ChatProviderRef) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &SessionStoreRef {
        &self.store
    }

    /// Starts a new grounded conversation with `query` as its first turn.
    ///
    /// The session is registered only once the model has answered, so a
    /// failed search leaves nothing behind.
    pub async fn start_search(&self, query: &str) -> Result<SearchResult, SearchError> {
        info!(query_len = query.len(), "Starting new search");

        let (turn, summary) = self.run_turn(&[], query, true).await?;

        let session = self.store.create_session().await?;
        let result = SearchResult {
            session_id: session.id().to_string(),
            summary,
            sources: turn.citations.clone(),
        };
        session.lock().await.push_turn(turn);

        info!(
            session_id = %result.session_id,
            sources = result.sources.len(),
            "Search completed"
        );
        Ok(result)
    }

    /// Continues the conversation identified by `session_id`.
    ///
    /// An unknown session is not an error: a new search is started instead
    /// and reported as [`FollowUp::StartedNew`].
    pub async fn continue_search(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<FollowUp, SearchError> {
        let handle = match self.store.get_session(session_id).await {
            Ok(handle) => handle,
            Err(SessionStoreError::NotFound(_)) => {
                info!(session_id, "Session not found, starting new search");
                let result = self.start_search(query).await?;
                return Ok(FollowUp::StartedNew {
                    result,
                    reason: FallbackReason::SessionMiss,
                });
            }
            Err(e) => return Err(e.into()),
        };

        // Held for the whole turn so follow-ups on one session run in call order.
        let mut session = handle.lock().await;
        debug!(
            session_id,
            turns = session.turns().len(),
            query_len = query.len(),
            "Continuing search"
        );

        let grounded = session.grounded;
        let (turn, summary) = self.run_turn(session.turns(), query, grounded).await?;
        let result = SearchResult {
            session_id: session.id.clone(),
            summary,
            sources: turn.citations.clone(),
        };
        session.push_turn(turn);

        Ok(FollowUp::Continued(result))
    }

    async fn run_turn(
        &self,
        transcript: &[ConversationTurn],
        query: &str,
        grounded: bool,
    ) -> Result<(ConversationTurn, String), SearchError> {
        let reply = self
            .provider
            .send_turn(transcript, query, grounded)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to get response from LLM");
                e
            })?;

        let summary = markdown::normalize(&reply.text);
        let citations = extract_citations(reply.grounding_metadata.as_ref());

        let turn = ConversationTurn {
            query: query.to_string(),
            raw_answer: reply.text,
            citations,
        };
        Ok((turn, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::test_support::{grounded_reply, StubProvider};
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator(provider: Arc<StubProvider>) -> SearchCoordinator {
        SearchCoordinator::new(Arc::new(InMemorySessionStore::default()), provider)
    }

    #[tokio::test]
    async fn test_start_search() {
        let provider = Arc::new(StubProvider::new());
        provider.push_reply(grounded_reply(
            "Summary: Rust is fast",
            &[("https://rust-lang.org", "Rust")],
        ));
        let coordinator = coordinator(provider.clone());

        let result = coordinator.start_search("a").await.unwrap();

        assert_eq!(result.session_id.len(), 16);
        assert!(result.summary.contains("<h2>Summary Rust is fast</h2>"));
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].url, "https://rust-lang.org");
        assert!(provider.calls()[0].grounded);

        let session = coordinator.store().get_session(&result.session_id).await.unwrap();
        assert_eq!(session.lock().await.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_session_continuity() {
        let provider = Arc::new(StubProvider::new());
        let coordinator = coordinator(provider.clone());

        let started = coordinator.start_search("a").await.unwrap();
        let follow_up = coordinator
            .continue_search(&started.session_id, "b")
            .await
            .unwrap();

        assert!(follow_up.is_continued());
        assert_eq!(follow_up.result().session_id, started.session_id);

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].query, "b");
        assert_eq!(calls[1].transcript.len(), 1);
        assert_eq!(calls[1].transcript[0].query, "a");

        let session = coordinator.store().get_session(&started.session_id).await.unwrap();
        let queries: Vec<_> = session
            .lock()
            .await
            .turns()
            .iter()
            .map(|t| t.query.clone())
            .collect();
        assert_eq!(queries, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_session_miss_falls_back() {
        let provider = Arc::new(StubProvider::new());
        let coordinator = coordinator(provider.clone());

        let follow_up = coordinator
            .continue_search("nonexistent-id", "b")
            .await
            .unwrap();

        match follow_up {
            FollowUp::StartedNew { result, reason } => {
                assert_eq!(reason, FallbackReason::SessionMiss);
                assert_ne!(result.session_id, "nonexistent-id");
                assert!(coordinator.store().get_session(&result.session_id).await.is_ok());
            }
            other => panic!("expected a new session, got {:?}", other),
        }
        assert!(provider.calls()[0].transcript.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_registers_nothing() {
        let provider = Arc::new(StubProvider::new());
        provider.push_failure("quota exceeded");
        let coordinator = coordinator(provider);

        let err = coordinator.start_search("a").await.unwrap_err();

        assert!(matches!(err, SearchError::Provider(_)));
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(coordinator.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_follow_up_keeps_transcript() {
        let provider = Arc::new(StubProvider::new());
        let coordinator = coordinator(provider.clone());
        let started = coordinator.start_search("a").await.unwrap();

        provider.push_failure("upstream 503");
        let err = coordinator
            .continue_search(&started.session_id, "b")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));

        let session = coordinator.store().get_session(&started.session_id).await.unwrap();
        assert_eq!(session.lock().await.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_follow_ups_are_serialized() {
        let provider = Arc::new(StubProvider::with_delay(Duration::from_millis(20)));
        let coordinator = coordinator(provider.clone());
        let started = coordinator.start_search("a").await.unwrap();

        let (first, second) = tokio::join!(
            coordinator.continue_search(&started.session_id, "b"),
            coordinator.continue_search(&started.session_id, "c"),
        );
        assert!(first.unwrap().is_continued());
        assert!(second.unwrap().is_continued());

        let seen: Vec<usize> = provider.calls().iter().map(|c| c.transcript.len()).collect();
        assert_eq!(seen, vec![0, 1, 2]);

        let session = coordinator.store().get_session(&started.session_id).await.unwrap();
        assert_eq!(session.lock().await.turns().len(), 3);
    }

    #[tokio::test]
    async fn test_sources_shape() {
        let provider = Arc::new(StubProvider::new());
        provider.push_reply(grounded_reply(
            "answer",
            &[
                ("https://a.example", "A"),
                ("https://a.example", "A duplicate"),
                ("https://b.example", "B"),
            ],
        ));
        let coordinator = coordinator(provider);

        let result = coordinator.start_search("q").await.unwrap();

        assert_eq!(result.sources.len(), 2);
        for source in &result.sources {
            assert!(!source.title.is_empty());
            assert!(!source.url.is_empty());
        }
        assert_eq!(result.sources[0].title, "A");
    }
}
