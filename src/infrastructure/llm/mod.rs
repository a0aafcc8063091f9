mod openai;

pub use openai::OpenAiLlm;

use crate::domain::DomainError;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// The rig client panics on a missing key; check first so the failure is an
/// ordinary error at the first network call.
pub(crate) fn require_api_key() -> Result<(), DomainError> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(DomainError::external(format!("{API_KEY_ENV} is not set"))),
    }
}
