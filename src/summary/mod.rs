//! Net balance and approval summaries

pub mod summarizer;
pub mod types;

pub use summarizer::LogSummarizer;
pub use types::*;
