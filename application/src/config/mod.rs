//! Application-level configuration.
//!
//! [`PipelineParams`] controls stage behavior: solution count, concurrency,
//! inference timeout, agent defaults and the learning policy.

pub mod pipeline_params;

pub use pipeline_params::PipelineParams;
