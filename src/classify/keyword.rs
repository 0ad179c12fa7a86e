//! Keyword Tier
//!
//! Last-resort bucketing for completely unstructured answers. The text is
//! split into sentence fragments on terminal punctuation and every fragment
//! lands in the section whose vocabulary it matches; unmatched fragments
//! default to layout. Length caps keep one section from absorbing the whole
//! answer. This tier always yields a viable result because a score line is
//! synthesized when none is found.

use regex::Regex;

use crate::constants::classify::{DEFAULT_BUCKET_CHAR_CAP, MIN_FRAGMENT_CHARS, SECTION_CHAR_CAP};
use crate::types::Result;

use super::{ClassifiedSections, Extraction, ExtractionStrategy, MarkupCleaner, ScoreSniffer};

/// Score line used when the text contains no numeric claim at all
pub(crate) const PLACEHOLDER_SCORE: &str = "75分 - 基于传统风水理论综合评估";

const DIRECTION_WORDS: &[&str] = &[
    "朝向", "方位", "方向", "东南西北", "入户门", "大门", "坐向", "orientation", "facing",
    "compass", "south-facing", "north-facing", "entrance faces",
];
const LAYOUT_WORDS: &[&str] = &[
    "布局", "格局", "户型", "空间", "客厅", "卧室", "厨房", "房间", "家具", "layout", "furniture",
    "living room", "bedroom", "kitchen", "floor plan", "partition",
];
const TIMING_WORDS: &[&str] = &[
    "时间", "时机", "月份", "季节", "春夏秋冬", "择日", "农历", "timing", "season", "monthly",
    "lunar", "schedule", "springtime", "autumn",
];
const NOTES_WORDS: &[&str] = &[
    "注意", "禁忌", "避免", "不宜", "提醒", "重要", "avoid", "caution", "taboo", "should not",
    "beware", "do not",
];

pub(crate) struct KeywordStrategy {
    cleaner: MarkupCleaner,
    sniffer: ScoreSniffer,
    splitter: Regex,
}

impl KeywordStrategy {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cleaner: MarkupCleaner::new()?,
            sniffer: ScoreSniffer::new()?,
            splitter: Regex::new(r"[。！？；.!?;\n]")?,
        })
    }

    fn bucket_for(fragment: &str) -> Option<Bucket> {
        let lower = fragment.to_lowercase();
        let hit = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if hit(DIRECTION_WORDS) {
            Some(Bucket::Direction)
        } else if hit(LAYOUT_WORDS) {
            Some(Bucket::Layout)
        } else if hit(TIMING_WORDS) {
            Some(Bucket::Timing)
        } else if hit(NOTES_WORDS) {
            Some(Bucket::Notes)
        } else {
            None
        }
    }

    fn append(slot: &mut String, fragment: &str, cap: usize) {
        if slot.chars().count() >= cap {
            return;
        }
        if !slot.is_empty() {
            slot.push_str("; ");
        }
        slot.push_str(fragment);
    }
}

#[derive(Clone, Copy)]
enum Bucket {
    Direction,
    Layout,
    Timing,
    Notes,
}

impl ExtractionStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn extract(&self, text: &str) -> Option<Extraction> {
        let clean = self.cleaner.clean(text);
        let mut sections = ClassifiedSections::default();

        for fragment in self.splitter.split(&clean) {
            let fragment = fragment.trim();
            if fragment.chars().count() <= MIN_FRAGMENT_CHARS {
                continue;
            }

            match Self::bucket_for(fragment) {
                Some(Bucket::Direction) => {
                    Self::append(&mut sections.direction, fragment, SECTION_CHAR_CAP)
                }
                Some(Bucket::Layout) => {
                    Self::append(&mut sections.layout, fragment, SECTION_CHAR_CAP)
                }
                Some(Bucket::Timing) => {
                    Self::append(&mut sections.timing, fragment, SECTION_CHAR_CAP)
                }
                Some(Bucket::Notes) => {
                    Self::append(&mut sections.notes, fragment, SECTION_CHAR_CAP)
                }
                // Unmatched prose still belongs somewhere a reader will see
                None => Self::append(&mut sections.layout, fragment, DEFAULT_BUCKET_CHAR_CAP),
            }
        }

        let mut synthesized_score = false;
        match self.sniffer.find(&clean) {
            Some(value) => sections.score = format!("{value}分"),
            None => {
                sections.score = PLACEHOLDER_SCORE.to_string();
                synthesized_score = true;
            }
        }

        Some(Extraction {
            sections,
            synthesized_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> KeywordStrategy {
        KeywordStrategy::new().unwrap()
    }

    #[test]
    fn test_fragments_land_in_matching_buckets() {
        let text = "大门朝向东南采光很好。客厅家具建议靠墙摆放。农历初一适合进行净化仪式。注意镜子不要对床。";
        let extraction = strategy().extract(text).unwrap();
        assert!(extraction.sections.direction.contains("朝向"));
        assert!(extraction.sections.layout.contains("家具"));
        assert!(extraction.sections.timing.contains("农历"));
        assert!(extraction.sections.notes.contains("镜子"));
    }

    #[test]
    fn test_unmatched_fragments_default_to_layout() {
        let text = "This dwelling has a pleasant overall feel to it.";
        let extraction = strategy().extract(text).unwrap();
        assert!(extraction.sections.layout.contains("pleasant"));
    }

    #[test]
    fn test_short_fragments_dropped() {
        let extraction = strategy().extract("好。嗯。ok.").unwrap();
        assert!(extraction.sections.layout.is_empty());
    }

    #[test]
    fn test_score_sniffed_or_synthesized() {
        let sniffed = strategy().extract("综合来看大约73分的水平。").unwrap();
        assert_eq!(sniffed.sections.score, "73分");
        assert!(!sniffed.synthesized_score);

        let synthesized = strategy().extract("没有任何数字的一段话而已。").unwrap();
        assert_eq!(synthesized.sections.score, PLACEHOLDER_SCORE);
        assert!(synthesized.synthesized_score);
    }

    #[test]
    fn test_section_cap_stops_absorption() {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("客厅布局第{i}条建议需要认真考虑周全。"));
        }
        let extraction = strategy().extract(&text).unwrap();
        let len = extraction.sections.layout.chars().count();
        // One fragment may straddle the cap but growth stops right after
        assert!(len < SECTION_CHAR_CAP + 50, "layout grew to {len}");
    }

    #[test]
    fn test_always_viable() {
        assert!(strategy().extract("").unwrap().sections.is_viable());
    }
}
