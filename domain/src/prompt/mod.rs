//! Prompt templates for the inference stages

mod template;

pub use template::PromptTemplate;
