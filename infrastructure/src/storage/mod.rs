//! JSON file stores for the world model, sensed items and pipeline runs.

mod atomic;
mod checkpoints;
mod sensed_items;
mod world_model;

pub use checkpoints::JsonCheckpointStore;
pub use sensed_items::JsonSensedItems;
pub use world_model::JsonWorldModelStore;

use gapwise_application::StoreError;

fn io_error(path: &std::path::Path, e: std::io::Error) -> StoreError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(path.display().to_string())
    } else {
        StoreError::Io(format!("{}: {}", path.display(), e))
    }
}
