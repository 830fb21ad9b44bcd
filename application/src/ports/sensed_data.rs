//! Sensed data source port

use super::world_model_store::StoreError;
use async_trait::async_trait;
use gapwise_domain::SensedItem;

/// Supplies the items the snapshot builder observes (mail, events, tasks...).
#[async_trait]
pub trait SensedDataSource: Send + Sync {
    async fn load_items(&self) -> Result<Vec<SensedItem>, StoreError>;
}

/// Source that never yields anything.
pub struct NoSensedData;

#[async_trait]
impl SensedDataSource for NoSensedData {
    async fn load_items(&self) -> Result<Vec<SensedItem>, StoreError> {
        Ok(Vec::new())
    }
}
