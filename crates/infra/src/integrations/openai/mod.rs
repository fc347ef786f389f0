//! OpenAI-compatible text-generation client

pub mod client;
pub mod types;

pub use client::OpenAIClient;
