//! Per-session conversation state.
//!
//! A [`Session`] is the only holder of the conversation log and the user's
//! settings. It is created once per user session and passed explicitly to
//! every operation of the conversation loop.

use chrono::{DateTime, Utc};
use docchat_core::config::AppConfig;
use docchat_core::{AppError, AppResult};
use docchat_llm::ModelName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered turns in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// User-adjustable settings read by every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    /// Model answering the questions
    pub model: ModelName,

    /// Fold prior turns into retrieval and the answer prompt
    pub use_history: bool,

    /// Surface the history summary on the debug channel
    pub debug: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: ModelName::default(),
            use_history: true,
            debug: true,
        }
    }
}

/// Where the current turn is. `Idle` between turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStage {
    #[default]
    Idle,
    Summarizing,
    Retrieving,
    Completing,
    Displaying,
}

impl TurnStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Summarizing => "summarizing",
            Self::Retrieving => "retrieving",
            Self::Completing => "completing",
            Self::Displaying => "displaying",
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation state owned by one user session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
    stage: TurnStage,
    pub log: ConversationLog,
    pub settings: ChatSettings,
}

impl Session {
    /// Start a session with an empty log.
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            stage: TurnStage::Idle,
            log: ConversationLog::new(),
            settings,
        }
    }

    /// Start a session from the configured defaults.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let model = ModelName::parse(&config.model).map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self::new(ChatSettings {
            model,
            use_history: config.chat.use_history,
            debug: config.chat.debug,
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> TurnStage {
        self.stage
    }

    pub(crate) fn set_stage(&mut self, stage: TurnStage) {
        if self.stage != stage {
            tracing::info!(session = %self.id, "Turn stage: {} -> {}", self.stage, stage);
            self.stage = stage;
        }
    }

    /// Clear the conversation. Settings are kept.
    pub fn reset(&mut self) {
        tracing::info!(session = %self.id, "Resetting conversation ({} turns)", self.log.len());
        self.log.clear();
        self.stage = TurnStage::Idle;
    }

    /// Serializable view of the session for the debug panel.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            started_at: self.started_at,
            stage: self.stage,
            settings: self.settings,
            turn_count: self.log.len(),
            turns: self.log.turns().to_vec(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stage: TurnStage,
    pub settings: ChatSettings,
    pub turn_count: usize,
    pub turns: Vec<Turn>,
}
