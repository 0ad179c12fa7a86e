//! Placeholder Results
//!
//! When a backend has no usable credential (or disabled itself after an
//! authentication failure) its client serves a locally synthesized analysis
//! instead of making network calls. The text carries the same section
//! markers a live model is instructed to emit, so the classification
//! pipeline behaves identically either way.

use std::time::Duration;

use crate::types::ProviderId;

use super::{CallResult, TokenUsage};

/// Canned marker-formatted analysis served on the unavailable path
const PLACEHOLDER_ANALYSIS: &str = "\
***SCORE_START***
72 points; the overall configuration of this property is sound with room to improve; energy flow through the space is largely unobstructed; suitable for residential or office use
***SCORE_END***

***DIRECTION_START***
The chosen orientation receives adequate natural light which supports indoor energy flow; its Five Element attributes match the property function; the orientation is considered broadly auspicious
***DIRECTION_END***

***LAYOUT_START***
Place a screen or decorative partition at the entrance to shape a welcoming field; keep the main living area open and bright and avoid furniture blocking airflow; position rest areas in quiet corners of the plan
***LAYOUT_END***

***TIMING_START***
Schedule space cleansing on the first and fifteenth of each lunar month; plan renovations for spring or autumn when seasonal energy is balanced; make day-to-day furniture adjustments in the mid-morning hours
***TIMING_END***

***NOTES_START***
Avoid storing heavy objects or waste bins at the center of the property; mirrors should not face beds or primary seating; store sharp objects away to avoid cutting energy; keep the interior tidy and ventilated
***NOTES_END***";

/// Synthesize a clearly labeled local result for an unusable backend.
///
/// A short artificial delay keeps downstream latency accounting from
/// recording an implausible zero.
pub async fn placeholder_result(provider: ProviderId) -> CallResult {
    tokio::time::sleep(Duration::from_millis(50)).await;

    CallResult {
        content: PLACEHOLDER_ANALYSIS.to_string(),
        model_used: format!("{}-demo", provider.as_str()),
        usage: TokenUsage {
            prompt_tokens: 150,
            completion_tokens: 350,
            total_tokens: 500,
        },
        finish_reason: Some("stop".to_string()),
        latency_ms: 50,
        placeholder: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_carries_all_markers() {
        let result = placeholder_result(ProviderId::DeepSeek).await;
        assert!(result.placeholder);
        assert_eq!(result.model_used, "deepseek-demo");
        for marker in [
            "***SCORE_START***",
            "***DIRECTION_START***",
            "***LAYOUT_START***",
            "***TIMING_START***",
            "***NOTES_START***",
        ] {
            assert!(result.content.contains(marker), "missing {marker}");
        }
    }
}
