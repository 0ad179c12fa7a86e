//! Response Classification
//!
//! Free text coming back from a model is sorted into five fixed report
//! sections. Classification never fails: an ordered list of extraction
//! strategies runs until one produces a viable result, and the last tier
//! always does.
//!
//! ## Strategies
//!
//! 1. `marker`: explicit `***SCORE_START***` style delimiter pairs the
//!    prompt instructs the model to emit
//! 2. `heading`: recognizable section headings in loosely formatted text
//! 3. `keyword`: sentence fragments bucketed by vocabulary; always viable
//!
//! A result is viable when at least one principal section (score,
//! direction, or layout) is non-empty.

mod heading;
mod keyword;
mod marker;
mod optimization;

pub use optimization::{OptimizationPlan, extract_plan, fallback_plan};

use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Result;

use heading::HeadingStrategy;
use keyword::KeywordStrategy;
use marker::MarkerStrategy;

// =============================================================================
// Sections
// =============================================================================

/// The five fixed report sections; unpopulated sections are empty strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifiedSections {
    pub score: String,
    pub direction: String,
    pub layout: String,
    pub timing: String,
    pub notes: String,
}

impl ClassifiedSections {
    /// Minimum-viable predicate: at least one principal section extracted
    pub fn is_viable(&self) -> bool {
        !self.score.is_empty() || !self.direction.is_empty() || !self.layout.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Score,
    Direction,
    Layout,
    Timing,
    Notes,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Score,
        SectionKind::Direction,
        SectionKind::Layout,
        SectionKind::Timing,
        SectionKind::Notes,
    ];
}

// =============================================================================
// Strategy Interface
// =============================================================================

/// Output of one extraction strategy
pub(crate) struct Extraction {
    pub sections: ClassifiedSections,
    /// True when the score line was invented rather than found in the text
    pub synthesized_score: bool,
}

/// One tier of the classification pipeline
pub(crate) trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means the strategy found nothing to work with; a `Some` result
    /// is still subject to the viability check
    fn extract(&self, text: &str) -> Option<Extraction>;
}

// =============================================================================
// Shared Text Utilities
// =============================================================================

/// Strips markdown residue models sprinkle into plain-text answers
pub(crate) struct MarkupCleaner {
    bold: Regex,
    fence: Regex,
    rule: Regex,
    heading_hash: Regex,
}

impl MarkupCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bold: Regex::new(r"\*\*(.*?)\*\*")?,
            fence: Regex::new(r"```[\s\S]*?```")?,
            rule: Regex::new(r"-{3,}")?,
            heading_hash: Regex::new(r"#{2,3}\s*")?,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        let text = self.heading_hash.replace_all(text, "");
        let text = self.bold.replace_all(&text, "$1");
        let text = text.replace("* ", "").replace('*', "");
        let text = text.replace("| ", "").replace('|', "");
        let text = self.fence.replace_all(&text, "");
        let text = self.rule.replace_all(&text, "");
        text.trim().to_string()
    }
}

/// Finds a numeric score claim in free text, any common phrasing
pub(crate) struct ScoreSniffer {
    patterns: Vec<Regex>,
}

impl ScoreSniffer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: vec![
                Regex::new(r"(\d+)分")?,
                Regex::new(r"评分[：:\s]*(\d+)")?,
                Regex::new(r"(?i)(\d+)\s*points?")?,
                Regex::new(r"总分[：:\s]*(\d+)")?,
                Regex::new(r"(?i)score[：:\s]*(\d+)")?,
            ],
        })
    }

    pub fn find(&self, text: &str) -> Option<u32> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(text) {
                if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                    return Some(value);
                }
            }
        }
        None
    }
}

// =============================================================================
// Parsing Statistics
// =============================================================================

/// Which tier served each classification, as process-wide counters
#[derive(Debug, Default)]
pub struct ClassifierStats {
    total: AtomicU64,
    marker_hits: AtomicU64,
    heading_hits: AtomicU64,
    keyword_hits: AtomicU64,
    synthesized_scores: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStatsSnapshot {
    pub total: u64,
    pub marker_hits: u64,
    pub heading_hits: u64,
    pub keyword_hits: u64,
    pub synthesized_scores: u64,
}

impl ClassifierStats {
    fn record(&self, strategy: &str, synthesized_score: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match strategy {
            "marker" => &self.marker_hits,
            "heading" => &self.heading_hits,
            _ => &self.keyword_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if synthesized_score {
            self.synthesized_scores.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ClassifierStatsSnapshot {
        ClassifierStatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            marker_hits: self.marker_hits.load(Ordering::Relaxed),
            heading_hits: self.heading_hits.load(Ordering::Relaxed),
            keyword_hits: self.keyword_hits.load(Ordering::Relaxed),
            synthesized_scores: self.synthesized_scores.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Sorts raw model output into the five report sections.
///
/// Strategies run in a fixed order and the pipeline stops at the first
/// viable result. The keyword tier always produces one, so `classify`
/// never errors and never returns an all-empty result.
pub struct ResponseClassifier {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    sniffer: ScoreSniffer,
    stats: ClassifierStats,
}

impl ResponseClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            strategies: vec![
                Box::new(MarkerStrategy::new()),
                Box::new(HeadingStrategy::new()?),
                Box::new(KeywordStrategy::new()?),
            ],
            sniffer: ScoreSniffer::new()?,
            stats: ClassifierStats::default(),
        })
    }

    /// Numeric score the model claimed for itself, if any. Logged and kept
    /// in the report for comparison; never used as the displayed score.
    pub fn advisory_score(&self, raw_text: &str) -> Option<u32> {
        self.sniffer.find(raw_text)
    }

    pub fn classify(&self, raw_text: &str) -> ClassifiedSections {
        for strategy in &self.strategies {
            if let Some(extraction) = strategy.extract(raw_text) {
                if extraction.sections.is_viable() {
                    debug!(
                        strategy = strategy.name(),
                        synthesized = extraction.synthesized_score,
                        "Classification settled"
                    );
                    self.stats.record(strategy.name(), extraction.synthesized_score);
                    return extraction.sections;
                }
            }
        }
        // Unreachable in practice; the keyword tier is always viable
        self.stats.record("keyword", true);
        ClassifiedSections {
            score: keyword::PLACEHOLDER_SCORE.to_string(),
            ..Default::default()
        }
    }

    pub fn stats(&self) -> ClassifierStatsSnapshot {
        self.stats.snapshot()
    }
}
