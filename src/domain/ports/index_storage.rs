use std::path::Path;

use async_trait::async_trait;

use crate::domain::{errors::DomainError, IndexProbe, IndexSnapshot};

#[async_trait]
pub trait IndexStorage: Send + Sync {
    /// Cheap existence check; never deserializes.
    fn probe(&self, dir: &Path) -> Result<IndexProbe, DomainError>;
    async fn load(&self, dir: &Path) -> Result<IndexSnapshot, DomainError>;
    async fn persist(&self, dir: &Path, snapshot: &IndexSnapshot) -> Result<(), DomainError>;
}
