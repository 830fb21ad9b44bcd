//! Inference request model and response parsing.

pub mod parsing;
pub mod request;

pub use parsing::{
    ParseError, ParsedSolutions, extract_json, parse_expectation, parse_gaps,
    parse_parameters, parse_problem_analysis, parse_solutions,
};
pub use request::{InferenceRequest, OutputSchema};
