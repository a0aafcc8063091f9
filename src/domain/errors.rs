use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Incompatible index at {}: {reason}", path.display())]
    IncompatibleIndex { path: PathBuf, reason: String },
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Io(format!("path={}; err={}", path.display(), err))
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn incompatible(path: &Path, reason: impl Into<String>) -> Self {
        Self::IncompatibleIndex {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
