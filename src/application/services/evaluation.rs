use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::prompt::{render_template, DEFAULT_FAITHFULNESS_TEMPLATE, DEFAULT_RELEVANCY_TEMPLATE};
use crate::domain::{
    ports::{Evaluator, LlmService},
    DomainError, EvaluationResult,
};

/// A judge verdict passes when its first word is YES, ignoring case and
/// leading punctuation or markup.
pub fn parse_verdict(raw: &str) -> bool {
    raw.trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_uppercase()
        .starts_with("YES")
}

fn require_contexts(contexts: &[String]) -> Result<(), DomainError> {
    if contexts.iter().all(|c| c.trim().is_empty()) {
        return Err(DomainError::validation(
            "Evaluation needs at least one non-empty context",
        ));
    }
    Ok(())
}

/// Checks whether a response is supported by the retrieved context.
pub struct FaithfulnessEvaluator {
    llm: Arc<dyn LlmService>,
    template: String,
}

impl FaithfulnessEvaluator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            template: DEFAULT_FAITHFULNESS_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }
}

#[async_trait]
impl Evaluator for FaithfulnessEvaluator {
    #[instrument(skip_all, fields(contexts = contexts.len()))]
    async fn evaluate(
        &self,
        query: Option<&str>,
        response: &str,
        contexts: &[String],
    ) -> Result<EvaluationResult, DomainError> {
        require_contexts(contexts)?;
        if response.trim().is_empty() {
            return Ok(EvaluationResult::new(
                query,
                response,
                contexts,
                false,
                "Empty response",
            ));
        }

        let context_str = contexts.join("\n\n");
        let prompt = render_template(
            &self.template,
            &[("query_str", response), ("context_str", &context_str)],
        );

        // judged without the query-time system prompt so the verdict stays YES/NO
        let verdict = self.llm.complete(&prompt).await?;
        let passing = parse_verdict(&verdict);
        tracing::debug!(passing, "faithfulness verdict");

        Ok(EvaluationResult::new(
            query,
            response,
            contexts,
            passing,
            verdict.trim(),
        ))
    }
}

/// Checks whether the response and its context actually address the query.
pub struct RelevancyEvaluator {
    llm: Arc<dyn LlmService>,
    template: String,
}

impl RelevancyEvaluator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            template: DEFAULT_RELEVANCY_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }
}

#[async_trait]
impl Evaluator for RelevancyEvaluator {
    #[instrument(skip_all, fields(contexts = contexts.len()))]
    async fn evaluate(
        &self,
        query: Option<&str>,
        response: &str,
        contexts: &[String],
    ) -> Result<EvaluationResult, DomainError> {
        let query_str = query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| DomainError::validation("Relevancy evaluation needs a query"))?;
        require_contexts(contexts)?;
        if response.trim().is_empty() {
            return Ok(EvaluationResult::new(
                query,
                response,
                contexts,
                false,
                "Empty response",
            ));
        }

        let context_str = contexts.join("\n\n");
        let prompt = render_template(
            &self.template,
            &[
                ("query_str", query_str),
                ("response_str", response),
                ("context_str", &context_str),
            ],
        );

        let verdict = self.llm.complete(&prompt).await?;
        let passing = parse_verdict(&verdict);
        tracing::debug!(passing, "relevancy verdict");

        Ok(EvaluationResult::new(
            query,
            response,
            contexts,
            passing,
            verdict.trim(),
        ))
    }
}
