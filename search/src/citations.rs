use std::collections::HashSet;

use gemini_core::types::{GroundingMetadata, GroundingSupport};
use serde::{Deserialize, Serialize};

/// A web source backing an answer, shown to the user alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    /// Answer segments this source corroborates, space separated. May be empty.
    pub snippet: String,
}

/// Derives the de-duplicated source list from grounding metadata.
///
/// Chunks are visited in order and the first chunk seen for a URL wins; later
/// chunks with the same URL are ignored even if their title differs. Chunks
/// without both a URL and a title are skipped. Missing metadata, or missing
/// chunk/support lists, produce an empty list.
pub fn extract_citations(metadata: Option<&GroundingMetadata>) -> Vec<Citation> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };

    let chunks = metadata.grounding_chunks.as_deref().unwrap_or_default();
    let supports = metadata.grounding_supports.as_deref().unwrap_or_default();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut citations = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        let Some(web) = chunk.web.as_ref() else {
            continue;
        };
        let (Some(url), Some(title)) = (non_empty(&web.uri), non_empty(&web.title)) else {
            continue;
        };
        if !seen.insert(url) {
            continue;
        }

        citations.push(Citation {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet_for(index, supports),
        });
    }

    citations
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Joins, in support order, the segment texts of every support citing `index`.
fn snippet_for(index: usize, supports: &[GroundingSupport]) -> String {
    supports
        .iter()
        .filter(|support| {
            support
                .grounding_chunk_indices
                .as_deref()
                .is_some_and(|indices| indices.contains(&index))
        })
        .map(|support| {
            support
                .segment
                .as_ref()
                .and_then(|segment| segment.text.as_deref())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}
