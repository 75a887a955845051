pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod reports;
pub mod types;
