//! Model catalog and provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The models a user may select for a session.
///
/// Identifiers are the catalog names shown to the user; a deployment maps
/// them to backend-specific tags through `modelAliases`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ModelName {
    Mixtral8x7b,
    SnowflakeArctic,
    MistralLarge,
    Llama3_8b,
    Llama3_70b,
    RekaFlash,
    Mistral7b,
    Llama2_70bChat,
    Gemma7b,
}

/// Error returned when a model identifier is not in the catalog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown model '{0}'. Available: {list}", list = ModelName::catalog())]
pub struct UnknownModel(pub String);

impl ModelName {
    /// Every selectable model, in menu order.
    pub const ALL: [ModelName; 9] = [
        ModelName::Mixtral8x7b,
        ModelName::SnowflakeArctic,
        ModelName::MistralLarge,
        ModelName::Llama3_8b,
        ModelName::Llama3_70b,
        ModelName::RekaFlash,
        ModelName::Mistral7b,
        ModelName::Llama2_70bChat,
        ModelName::Gemma7b,
    ];

    /// Catalog identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mixtral8x7b => "mixtral-8x7b",
            Self::SnowflakeArctic => "snowflake-arctic",
            Self::MistralLarge => "mistral-large",
            Self::Llama3_8b => "llama3-8b",
            Self::Llama3_70b => "llama3-70b",
            Self::RekaFlash => "reka-flash",
            Self::Mistral7b => "mistral-7b",
            Self::Llama2_70bChat => "llama2-70b-chat",
            Self::Gemma7b => "gemma-7b",
        }
    }

    /// Parse a catalog identifier (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, UnknownModel> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == wanted)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }

    /// Comma-separated list of catalog identifiers.
    pub fn catalog() -> String {
        Self::ALL
            .iter()
            .map(ModelName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ModelName {
    fn default() -> Self {
        Self::Mixtral8x7b
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ModelName> for String {
    fn from(model: ModelName) -> Self {
        model.as_str().to_string()
    }
}

impl TryFrom<String> for ModelName {
    type Error = UnknownModel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
    OpenAiCompat,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "openai-compat" => Some(Self::OpenAiCompat),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAiCompat => "openai",
        }
    }
}
