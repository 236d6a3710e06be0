use serde::{Deserialize, Serialize};
use std::fmt;

use super::generation::Generation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    Retrying,
    Success,
    Error,
    Aborted,
}

impl GenerationStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, GenerationStatus::Loading | GenerationStatus::Retrying)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStatus::Success | GenerationStatus::Error | GenerationStatus::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Loading => "loading",
            GenerationStatus::Retrying => "retrying",
            GenerationStatus::Success => "success",
            GenerationStatus::Error => "error",
            GenerationStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of a controller's generation state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub status: GenerationStatus,
    pub error: Option<String>,
    pub result: Option<Generation>,
    pub retry_count: u32,
}

impl GenerationState {
    pub fn is_processing(&self) -> bool {
        self.status.is_in_flight()
    }

    pub fn status_message(&self, max_retries: u32) -> String {
        match self.status {
            GenerationStatus::Loading => "Generating your creation...".to_string(),
            GenerationStatus::Retrying => format!(
                "Model overloaded. Retrying... ({}/{})",
                self.retry_count, max_retries
            ),
            GenerationStatus::Aborted => "Generation aborted.".to_string(),
            _ => "Your generation will appear here".to_string(),
        }
    }
}
