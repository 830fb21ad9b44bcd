//! World model persistence port

use async_trait::async_trait;
use gapwise_domain::WorldModel;
use thiserror::Error;

/// Errors shared by the persistence ports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt data: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Loads and saves the world model.
///
/// `save` is all-or-nothing: a failed save leaves the previous model intact.
#[async_trait]
pub trait WorldModelStore: Send + Sync {
    async fn load(&self) -> Result<WorldModel, StoreError>;

    async fn save(&self, model: &WorldModel) -> Result<(), StoreError>;
}
