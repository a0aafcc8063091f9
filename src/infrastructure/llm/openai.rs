use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::{CompletionModel, Prompt};
use rig::providers::openai;
use rig::streaming::StreamedAssistantContent;
use tracing::instrument;

use super::require_api_key;
use crate::domain::{ports::LlmService, DomainError, TokenStream};
use crate::infrastructure::config::LlmConfig;

pub struct OpenAiLlm {
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    timeout: Duration,
}

impl OpenAiLlm {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn client() -> Result<openai::Client, DomainError> {
        require_api_key()?;
        Ok(openai::Client::from_env())
    }

    async fn prompt(&self, system: Option<&str>, prompt: &str) -> Result<String, DomainError> {
        let client = Self::client()?;

        let mut builder = client.agent(&self.model);
        if let Some(system) = system {
            builder = builder.preamble(system);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        let agent = builder.build();

        self.with_timeout_err(agent.prompt(prompt))
            .await?
            .map_err(|e| DomainError::external(format!("Completion failed: {e}")))
    }

    async fn with_timeout_err<F: IntoFuture>(&self, fut: F) -> Result<F::Output, DomainError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| DomainError::timeout(format!("{} did not answer in time", self.model)))
    }
}

#[async_trait]
impl LlmService for OpenAiLlm {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompt(None, prompt).await
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.prompt(Some(system), prompt).await
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn stream_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<TokenStream, DomainError> {
        let client = Self::client()?;
        let model = client.completion_model(&self.model);

        let mut request = model.completion_request(prompt);
        if !system.is_empty() {
            request = request.preamble(system.to_string());
        }
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.max_tokens(max_tokens);
        }

        let response = self
            .with_timeout_err(request.stream())
            .await?
            .map_err(|e| DomainError::external(format!("Stream failed to open: {e}")))?;

        let fragments = response.filter_map(|item| async move {
            match item {
                Ok(StreamedAssistantContent::Text(text)) => Some(Ok(text.text)),
                Ok(_) => None,
                Err(e) => Some(Err(DomainError::external(format!("Stream interrupted: {e}")))),
            }
        });

        Ok(fragments.boxed())
    }
}
