//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Network and provider call constants
pub mod network {
    /// Default per-call deadline for LLM requests (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// TCP connect timeout (seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Deadline for the short speed-test probe (seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 20;
}

/// Generation defaults shared by both backends
pub mod generation {
    /// Default sampling temperature; kept low for answer consistency
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    /// Default completion token cap
    pub const DEFAULT_MAX_TOKENS: usize = 2000;

    /// Token cap for the optimization-plan follow-up call
    pub const OPTIMIZATION_MAX_TOKENS: usize = 800;

    /// Canned probe prompt used by speed-test routing
    pub const PROBE_PROMPT: &str = "Reply with the single word: ready";
}

/// Classification pipeline constants
pub mod classify {
    /// Character cap per keyword-bucketed section; stops one section from
    /// absorbing the whole document
    pub const SECTION_CHAR_CAP: usize = 200;

    /// Character cap for the default (layout) bucket
    pub const DEFAULT_BUCKET_CHAR_CAP: usize = 150;

    /// Sentence fragments at or below this many characters are discarded
    pub const MIN_FRAGMENT_CHARS: usize = 5;

    /// Maximum measures joined into each optimization-plan bucket
    pub const MAX_PLAN_ITEMS: usize = 4;
}

/// Deterministic score constants
pub mod score {
    /// Lower clamp of the deterministic score
    pub const SCORE_MIN: u8 = 50;

    /// Upper clamp of the deterministic score; a perfect score is never given
    pub const SCORE_MAX: u8 = 85;

    /// Base score for an unknown orientation
    pub const DEFAULT_BASE: u8 = 65;

    /// Modulus for the hash-derived adjustment; yields a span of -5..=+5
    pub const ADJUSTMENT_MODULUS: u64 = 11;
}
