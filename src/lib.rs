//! Email triage — LLM classification and category-based dispatch.

pub mod actions;
pub mod config;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod pipeline;
