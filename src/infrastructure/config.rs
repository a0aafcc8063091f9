use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{
    CorruptIndexPolicy, QuerySettings, DEFAULT_FAITHFULNESS_TEMPLATE, DEFAULT_RELEVANCY_TEMPLATE,
    DEFAULT_TEXT_QA_TEMPLATE,
};
use crate::domain::DomainError;

pub const CONFIG_ENV: &str = "RAG_CONFIG";
pub const PROMPTS_ENV: &str = "RAG_PROMPTS";

/// Runtime settings plus prompt templates, passed explicitly to every constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads `RAG_CONFIG` (or `default_config`) and `RAG_PROMPTS` (or
    /// `default_prompts`). A path named by an env var must exist; a missing
    /// default path falls back to built-in values.
    pub fn from_env(default_config: &str, default_prompts: &str) -> Result<Self, DomainError> {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => load_yaml(Path::new(&path))?,
            Err(_) => load_yaml_or_default(Path::new(default_config))?,
        };
        let prompts = match std::env::var(PROMPTS_ENV) {
            Ok(path) => load_yaml(Path::new(&path))?,
            Err(_) => load_yaml_or_default(Path::new(default_prompts))?,
        };
        Ok(Self { config, prompts })
    }

    pub fn load(config_path: &Path, prompts_path: &Path) -> Result<Self, DomainError> {
        Ok(Self {
            config: load_yaml(config_path)?,
            prompts: load_yaml(prompts_path)?,
        })
    }
}

impl From<&AppConfig> for QuerySettings {
    fn from(app: &AppConfig) -> Self {
        Self {
            top_k: app.config.rag.top_k,
            system_prompt: app.prompts.query.system.clone(),
            text_qa_template: app.prompts.query.text_qa_template.clone(),
            context_window: app.config.llm.context_window,
            num_output: app.config.llm.max_tokens.unwrap_or(256) as usize,
        }
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DomainError> {
    let raw = fs::read_to_string(path).map_err(|e| DomainError::io(path, e))?;
    serde_yaml::from_str(&raw)
        .map_err(|e| DomainError::config(format!("path={}; err={}", path.display(), e)))
}

fn load_yaml_or_default<T>(path: &Path) -> Result<T, DomainError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if path.exists() {
        load_yaml(path)
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        Ok(T::default())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: Option<f64>,
    /// Upper bound on generated tokens; also reserved out of the context window.
    pub max_tokens: Option<u64>,
    pub context_window: usize,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: Some(0.1),
            max_tokens: Some(256),
            context_window: 4096,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            dimension: 1536,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            chunk_size: 4000,
            chunk_overlap: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: PathBuf,
    pub persist_dir: Option<PathBuf>,
    pub question: String,
    pub corrupt_index_policy: CorruptIndexPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("./godisnje-izvjesce-2022-CA.pdf"),
            persist_dir: None,
            question: "Poslovnice u inozemstvu".to_string(),
            corrupt_index_policy: CorruptIndexPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub query: QueryPrompts,
    pub evaluation: EvaluationPrompts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPrompts {
    pub system: String,
    /// Must contain `{context_str}` and `{query_str}`.
    pub text_qa_template: String,
}

impl Default for QueryPrompts {
    fn default() -> Self {
        Self {
            system: "Respond in Croatian language".to_string(),
            text_qa_template: DEFAULT_TEXT_QA_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationPrompts {
    /// Placeholders: `{query_str}` (the response under test) and `{context_str}`.
    pub faithfulness: String,
    /// Placeholders: `{query_str}`, `{response_str}` and `{context_str}`.
    pub relevancy: String,
}

impl Default for EvaluationPrompts {
    fn default() -> Self {
        Self {
            faithfulness: DEFAULT_FAITHFULNESS_TEMPLATE.to_string(),
            relevancy: DEFAULT_RELEVANCY_TEMPLATE.to_string(),
        }
    }
}
