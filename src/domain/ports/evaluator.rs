use async_trait::async_trait;

use crate::domain::{errors::DomainError, EvaluationResult, QueryResponse};

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        query: Option<&str>,
        response: &str,
        contexts: &[String],
    ) -> Result<EvaluationResult, DomainError>;

    /// Judges the whole answer against every source node it was built from.
    async fn evaluate_response(
        &self,
        query: Option<&str>,
        response: &QueryResponse,
    ) -> Result<EvaluationResult, DomainError> {
        let contexts = response.source_contents();
        self.evaluate(query, &response.response, &contexts).await
    }
}
