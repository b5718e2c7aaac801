//! lexner LLM - HTTP clients for the external extraction service
//!
//! Implements `lexner_core::LlmClient` for OpenAI-compatible APIs, Ollama
//! and Gemini. The extraction pipeline only sees the trait; this crate is
//! wired in by the binary according to `LlmConfig::provider`.

pub mod llm;

pub use llm::{create_llm_client, GeminiClient, OllamaClient, OpenAiClient};
