//! Optimization Plan Extraction
//!
//! A follow-up model call asks for concrete improvement measures split into
//! immediately-doable and periodically-recurring work. Parsing degrades
//! gracefully: explicit `***IMMEDIATE_START***` / `***REGULAR_START***`
//! marker pairs first, then a two-line or semicolon-list reading, then
//! keyword bucketing, and finally a canned generic pair. The plan is never
//! empty.

use serde::{Deserialize, Serialize};

use crate::constants::classify::MAX_PLAN_ITEMS;
use crate::types::Language;

/// Improvement measures grouped by implementation cadence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationPlan {
    /// Doable today or within the week
    pub immediate: String,
    /// Recurring upkeep
    pub regular: String,
}

impl OptimizationPlan {
    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.regular.is_empty()
    }
}

const IMMEDIATE_WORDS_EN: &[&str] = &[
    "immediately", "now", "today", "place", "adjust", "clean", "organize",
];
const IMMEDIATE_WORDS_ZH: &[&str] = &[
    "立即", "马上", "当天", "现在", "摆放", "调整", "清理", "整理",
];
const REGULAR_WORDS_EN: &[&str] = &[
    "regularly", "monthly", "seasonal", "maintain", "keep", "check",
];
const REGULAR_WORDS_ZH: &[&str] = &["定期", "每月", "季节", "维护", "保持", "检查"];

fn separator(language: Language) -> &'static str {
    match language {
        Language::En => "; ",
        Language::Zh => "；",
    }
}

fn marker_span(text: &str, token: &str) -> Option<String> {
    let start_marker = format!("***{token}_START***");
    let end_marker = format!("***{token}_END***");
    let start = text.find(&start_marker)? + start_marker.len();
    let rest = &text[start..];
    let end = rest.find(&end_marker)?;
    Some(rest[..end].trim().to_string())
}

/// Parse a follow-up response into a plan, falling back tier by tier
pub fn extract_plan(response: &str, language: Language) -> OptimizationPlan {
    let plan = OptimizationPlan {
        immediate: marker_span(response, "IMMEDIATE").unwrap_or_default(),
        regular: marker_span(response, "REGULAR").unwrap_or_default(),
    };
    if !plan.is_empty() {
        return plan;
    }
    parse_from_text(response, language)
}

fn parse_from_text(text: &str, language: Language) -> OptimizationPlan {
    if text.chars().count() <= 50 {
        return fallback_plan(language);
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > 10)
        .collect();

    // Two substantial lines read as immediate-then-regular
    if lines.len() >= 2 {
        return OptimizationPlan {
            immediate: lines[0].to_string(),
            regular: lines[1].to_string(),
        };
    }

    // One long semicolon list splits half and half
    if lines.len() == 1 {
        let parts: Vec<&str> = lines[0]
            .split(['；', ';'])
            .map(str::trim)
            .filter(|part| part.chars().count() > 5)
            .collect();
        if parts.len() >= 4 {
            let mid = parts.len().div_ceil(2);
            let sep = separator(language);
            return OptimizationPlan {
                immediate: parts[..mid].join(sep),
                regular: parts[mid..].join(sep),
            };
        }
    }

    let plan = bucket_by_keywords(text, language);
    if plan.is_empty() {
        fallback_plan(language)
    } else {
        plan
    }
}

fn bucket_by_keywords(text: &str, language: Language) -> OptimizationPlan {
    let (immediate_words, regular_words) = match language {
        Language::En => (IMMEDIATE_WORDS_EN, REGULAR_WORDS_EN),
        Language::Zh => (IMMEDIATE_WORDS_ZH, REGULAR_WORDS_ZH),
    };

    let mut immediate = Vec::new();
    let mut regular = Vec::new();
    for fragment in text.split(['；', '。', ';', '\n']) {
        let fragment = fragment.trim();
        if fragment.chars().count() <= 5 {
            continue;
        }
        let lower = fragment.to_lowercase();
        let has_immediate = immediate_words.iter().any(|w| lower.contains(w));
        let has_regular = regular_words.iter().any(|w| lower.contains(w));
        if has_immediate && !has_regular {
            immediate.push(fragment);
        } else if has_regular {
            regular.push(fragment);
        } else {
            // Unclassified measures default to the immediate bucket
            immediate.push(fragment);
        }
    }

    let sep = separator(language);
    OptimizationPlan {
        immediate: immediate
            .into_iter()
            .take(MAX_PLAN_ITEMS)
            .collect::<Vec<_>>()
            .join(sep),
        regular: regular
            .into_iter()
            .take(MAX_PLAN_ITEMS)
            .collect::<Vec<_>>()
            .join(sep),
    }
}

/// Canned generic plan used when nothing parseable came back
pub fn fallback_plan(language: Language) -> OptimizationPlan {
    match language {
        Language::En => OptimizationPlan {
            immediate: "Adjust main furniture layout; Clear pathways keep unobstructed; \
                        Optimize indoor lighting conditions; Organize space avoid clutter accumulation"
                .to_string(),
            regular: "Monthly space cleansing and organization; Regular check of ornament placement; \
                      Seasonal indoor layout adjustments; Maintain space clean and orderly"
                .to_string(),
        },
        Language::Zh => OptimizationPlan {
            immediate: "调整主要家具布局；清理通道保持畅通；优化室内照明条件；整理空间避免杂物堆积"
                .to_string(),
            regular: "每月进行空间净化和整理；定期检查风水物品摆放；季节性调整室内布局；保持空间清洁有序"
                .to_string(),
        },
    }
}
