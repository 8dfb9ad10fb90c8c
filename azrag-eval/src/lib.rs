//! Azrag Eval - LLM-as-judge scoring of chat answers
//!
//! Each answer is rated by a chat model on a fixed rubric set (quality, correctness, focus,
//! retrieval relevance, and an opt-in "don't know" metric) using few-shot prompts. Ratings
//! come back either as free text carrying `thoughts:` / `stars:` markers or as a
//! schema-constrained object.

pub mod evaluator;
pub mod harness;
pub mod parser;
pub mod report;
pub mod rubric;

pub use evaluator::*;
pub use harness::*;
pub use parser::*;
pub use rubric::*;
