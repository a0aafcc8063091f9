use std::sync::Arc;
use tracing::instrument;

use super::prompt::{render_template, template_overhead, DEFAULT_TEXT_QA_TEMPLATE};
use super::RagService;
use crate::domain::{
    ports::LlmService, DomainError, QueryResponse, SearchResult, StreamingResponse,
};

/// Rough conversion used to turn a token window into a character budget.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub top_k: usize,
    pub system_prompt: String,
    pub text_qa_template: String,
    /// Model context size in tokens.
    pub context_window: usize,
    /// Tokens reserved for the answer.
    pub num_output: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            system_prompt: String::new(),
            text_qa_template: DEFAULT_TEXT_QA_TEMPLATE.to_string(),
            context_window: 4096,
            num_output: 256,
        }
    }
}

pub struct QueryEngine {
    rag: Arc<RagService>,
    llm: Arc<dyn LlmService>,
    settings: QuerySettings,
}

impl QueryEngine {
    pub fn new(rag: Arc<RagService>, llm: Arc<dyn LlmService>, settings: QuerySettings) -> Self {
        Self { rag, llm, settings }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    #[instrument(skip(self), fields(top_k = self.settings.top_k))]
    pub async fn query(&self, question: &str) -> Result<QueryResponse, DomainError> {
        let (source_nodes, prompt) = self.prepare(question).await?;
        let answer = self
            .llm
            .complete_with_system(&self.settings.system_prompt, &prompt)
            .await?;
        Ok(QueryResponse::new(answer, source_nodes))
    }

    /// Same retrieval and prompt as [`query`](Self::query); returns once the
    /// stream is open and leaves pulling fragments to the caller.
    #[instrument(skip(self), fields(top_k = self.settings.top_k))]
    pub async fn query_streaming(&self, question: &str) -> Result<StreamingResponse, DomainError> {
        let (source_nodes, prompt) = self.prepare(question).await?;
        let response_gen = self
            .llm
            .stream_with_system(&self.settings.system_prompt, &prompt)
            .await?;
        Ok(StreamingResponse::new(source_nodes, response_gen))
    }

    async fn prepare(&self, question: &str) -> Result<(Vec<SearchResult>, String), DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::validation("Question must not be empty"));
        }

        let source_nodes = self.rag.retrieve_top_k(question, self.settings.top_k).await?;
        tracing::debug!(count = source_nodes.len(), "retrieved source nodes");

        let prompt = self.build_prompt(question, &source_nodes);
        Ok((source_nodes, prompt))
    }

    fn build_prompt(&self, question: &str, nodes: &[SearchResult]) -> String {
        let context = pack_context(nodes, self.context_budget(question));
        render_template(
            &self.settings.text_qa_template,
            &[("context_str", &context), ("query_str", question)],
        )
    }

    fn context_budget(&self, question: &str) -> usize {
        let tokens = self
            .settings
            .context_window
            .saturating_sub(self.settings.num_output);
        let overhead = template_overhead(
            &self.settings.text_qa_template,
            &["context_str", "query_str"],
        );
        (tokens * CHARS_PER_TOKEN).saturating_sub(overhead + question.len())
    }
}

/// Joins node contents in rank order until `budget` bytes are used. The top
/// node is truncated rather than dropped when it alone exceeds the budget.
fn pack_context(nodes: &[SearchResult], budget: usize) -> String {
    let mut context = String::new();

    for node in nodes {
        let separator = if context.is_empty() { "" } else { "\n\n" };
        let remaining = budget.saturating_sub(context.len() + separator.len());
        let content = node.content();

        if content.len() <= remaining {
            context.push_str(separator);
            context.push_str(content);
            continue;
        }

        if context.is_empty() {
            let mut end = remaining;
            while !content.is_char_boundary(end) {
                end -= 1;
            }
            context.push_str(&content[..end]);
        }
        break;
    }

    context
}
