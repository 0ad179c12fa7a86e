//! Core Domain Types
//!
//! Shared types crossing module boundaries: provider identity, the normalized
//! questionnaire, and request-scoped metadata. Everything here is created
//! fresh per request and never persisted.

pub mod error;

pub use error::{EngineError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Provider Identity
// =============================================================================

/// Stable identity of a configured text-generation backend.
///
/// Fixed at startup; the set never changes at runtime. Only the per-provider
/// availability flag moves, and only downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    DeepSeek,
    Qwen,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
        }
    }

    /// The alternate backend, used for fallback routing
    pub fn other(&self) -> Self {
        match self {
            Self::DeepSeek => Self::Qwen,
            Self::Qwen => Self::DeepSeek,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Request Metadata
// =============================================================================

/// Report language selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

/// User tier tag consumed from the excluded auth layer.
///
/// Only affects prompt depth instructions here; tier-based truncation of the
/// final report happens outside this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserTier {
    #[default]
    Free,
    Premium,
    Vip,
}

// =============================================================================
// Form Input
// =============================================================================

/// The normalized dwelling questionnaire.
///
/// Used both to build the outbound prompt and as the sole input to the
/// deterministic score hash. All fields are optional; absent fields serialize
/// to the empty string in the canonical hash tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormInput {
    /// Property type (residence, office, shop, ...)
    pub house_type: Option<String>,
    /// Entry-door orientation (south, northeast, ...)
    pub direction: Option<String>,
    /// Floor area in square meters, kept as entered
    pub area: Option<String>,
    /// Floor position within the building
    pub floor_level: Option<String>,
    /// Number of rooms
    pub room_count: Option<String>,
    /// Household size
    pub family_size: Option<String>,
    /// Free-text description of the current layout
    pub description: Option<String>,
}

impl FormInput {
    pub fn direction_str(&self) -> &str {
        self.direction.as_deref().unwrap_or("")
    }
}
