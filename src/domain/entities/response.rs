use std::fmt;
use std::io::Write;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::SearchResult;
use crate::domain::errors::DomainError;

/// Lazily produced answer fragments. Finite and single-use.
pub type TokenStream = BoxStream<'static, Result<String, DomainError>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub source_nodes: Vec<SearchResult>,
}

impl QueryResponse {
    pub fn new(response: impl Into<String>, source_nodes: Vec<SearchResult>) -> Self {
        Self {
            response: response.into(),
            source_nodes,
        }
    }

    pub fn source_contents(&self) -> Vec<String> {
        self.source_nodes
            .iter()
            .map(|n| n.chunk.content.clone())
            .collect()
    }
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.response)
    }
}

pub struct StreamingResponse {
    pub source_nodes: Vec<SearchResult>,
    pub response_gen: TokenStream,
}

impl StreamingResponse {
    pub fn new(source_nodes: Vec<SearchResult>, response_gen: TokenStream) -> Self {
        Self {
            source_nodes,
            response_gen,
        }
    }

    /// Writes each fragment as it arrives and returns the full answer.
    pub async fn print_response_stream<W: Write + Send>(
        self,
        writer: &mut W,
    ) -> Result<QueryResponse, DomainError> {
        let Self {
            source_nodes,
            mut response_gen,
        } = self;

        let mut text = String::new();
        while let Some(fragment) = response_gen.next().await {
            let fragment = fragment?;
            writer
                .write_all(fragment.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| DomainError::internal(format!("Failed to write stream: {e}")))?;
            text.push_str(&fragment);
        }
        writeln!(writer).map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(QueryResponse::new(text, source_nodes))
    }

    pub async fn into_response(self) -> Result<QueryResponse, DomainError> {
        let Self {
            source_nodes,
            response_gen,
        } = self;

        let fragments: Vec<String> = response_gen
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        Ok(QueryResponse::new(fragments.concat(), source_nodes))
    }

    pub async fn collect_text(self) -> Result<String, DomainError> {
        Ok(self.into_response().await?.response)
    }
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("source_nodes", &self.source_nodes.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub query: Option<String>,
    pub response: String,
    pub contexts: Vec<String>,
    pub passing: bool,
    pub feedback: String,
    pub score: f32,
}

impl EvaluationResult {
    pub fn new(
        query: Option<&str>,
        response: &str,
        contexts: &[String],
        passing: bool,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            query: query.map(str::to_string),
            response: response.to_string(),
            contexts: contexts.to_vec(),
            passing,
            feedback: feedback.into(),
            score: if passing { 1.0 } else { 0.0 },
        }
    }
}
