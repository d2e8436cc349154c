//! Completion client crate for docchat.
//!
//! This crate provides a provider-agnostic abstraction over hosted LLM
//! completion services. A completion is a single `(model, prompt) -> text`
//! call: no streaming, no retries, no client-side timeout.
//!
//! # Providers
//! - **Ollama**: local LLM runtime (default)
//! - **OpenAI-compatible**: any `/v1/chat/completions` endpoint
//!
//! # Example
//! ```no_run
//! use docchat_llm::{LlmClient, LlmRequest, ModelName, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", ModelName::Mistral7b.as_str());
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatClient};
pub use types::{ModelName, ProviderType, UnknownModel};
