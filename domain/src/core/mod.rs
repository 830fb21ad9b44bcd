//! Core domain concepts shared across all modules

pub mod error;
pub mod ids;

pub use error::DomainError;
