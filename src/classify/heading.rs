//! Heading Tier
//!
//! Models that ignore the marker contract usually still structure their
//! answer under recognizable headings. After stripping markdown residue,
//! each section's heading pattern is matched against the text and the
//! section content runs until the next recognized heading of a different
//! section or the end of the text.

use regex::Regex;

use crate::types::Result;

use super::{
    ClassifiedSections, Extraction, ExtractionStrategy, MarkupCleaner, ScoreSniffer, SectionKind,
};

/// Score line used when headings matched but no numeric claim was found
const PLACEHOLDER_SCORE: &str = "75分 - 基于风水分析综合评估";

struct HeadingHit {
    kind: SectionKind,
    start: usize,
    content_start: usize,
}

pub(crate) struct HeadingStrategy {
    cleaner: MarkupCleaner,
    sniffer: ScoreSniffer,
    headings: Vec<(SectionKind, Regex)>,
}

impl HeadingStrategy {
    pub fn new() -> Result<Self> {
        let headings = vec![
            (
                SectionKind::Score,
                Regex::new(
                    r"(?m)^[ \t]*(?:总体评分|综合评分|整体评分|评分|总分|(?i:overall\s+score|total\s+score|rating))[：:\s]*",
                )?,
            ),
            (
                SectionKind::Direction,
                Regex::new(
                    r"(?m)^[ \t]*(?:方位分析|朝向分析|方向分析|入户门朝向|朝向|方位|(?i:direction\s+analysis|orientation\s+analysis|orientation|facing))[：:\s]*",
                )?,
            ),
            (
                SectionKind::Layout,
                Regex::new(
                    r"(?m)^[ \t]*(?:布局优化建议|布局建议|布局|户型|格局|(?i:layout\s+suggestions|layout\s+optimization|layout|floor\s+plan))[：:\s]*",
                )?,
            ),
            (
                SectionKind::Timing,
                Regex::new(
                    r"(?m)^[ \t]*(?:时间建议|最佳时机|择日|时机|(?i:timing\s+suggestions|best\s+timing|timing|auspicious\s+dates))[：:\s]*",
                )?,
            ),
            (
                SectionKind::Notes,
                Regex::new(
                    r"(?m)^[ \t]*(?:注意事项|禁忌|重要提醒|(?i:important\s+notes|precautions|cautions|taboos))[：:\s]*",
                )?,
            ),
        ];

        Ok(Self {
            cleaner: MarkupCleaner::new()?,
            sniffer: ScoreSniffer::new()?,
            headings,
        })
    }

    fn find_hits(&self, text: &str) -> Vec<HeadingHit> {
        let mut hits: Vec<HeadingHit> = Vec::new();
        for (kind, pattern) in &self.headings {
            for m in pattern.find_iter(text) {
                hits.push(HeadingHit {
                    kind: *kind,
                    start: m.start(),
                    content_start: m.end(),
                });
            }
        }
        hits.sort_by_key(|h| h.start);
        hits
    }
}

impl ExtractionStrategy for HeadingStrategy {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn extract(&self, text: &str) -> Option<Extraction> {
        let clean = self.cleaner.clean(text);
        let hits = self.find_hits(&clean);

        let principal_hit = hits.iter().any(|h| {
            matches!(
                h.kind,
                SectionKind::Score | SectionKind::Direction | SectionKind::Layout
            )
        });
        if !principal_hit {
            return None;
        }

        let mut sections = ClassifiedSections::default();
        for (idx, hit) in hits.iter().enumerate() {
            // Content runs until the next heading of a different section
            let end = hits[idx + 1..]
                .iter()
                .find(|next| next.kind != hit.kind)
                .map(|next| next.start)
                .unwrap_or(clean.len());
            if end <= hit.content_start {
                continue;
            }
            let content = clean[hit.content_start..end].trim();
            if content.is_empty() {
                continue;
            }

            let slot = match hit.kind {
                SectionKind::Score => &mut sections.score,
                SectionKind::Direction => &mut sections.direction,
                SectionKind::Layout => &mut sections.layout,
                SectionKind::Timing => &mut sections.timing,
                SectionKind::Notes => &mut sections.notes,
            };
            // First occurrence of a section wins
            if slot.is_empty() {
                *slot = content.to_string();
            }
        }

        let mut synthesized_score = false;
        if sections.score.is_empty()
            && (!sections.direction.is_empty() || !sections.layout.is_empty())
        {
            match self.sniffer.find(&clean) {
                Some(value) => sections.score = format!("{value}分"),
                None => {
                    sections.score = PLACEHOLDER_SCORE.to_string();
                    synthesized_score = true;
                }
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

    fn strategy() -> HeadingStrategy {
        HeadingStrategy::new().unwrap()
    }

    #[test]
    fn test_chinese_headings_sliced_between_each_other() {
        let text = "总体评分：82分，整体格局不错\n\
                    方位分析：坐北朝南，采光充足\n\
                    布局建议：客厅保持开阔\n\
                    注意事项：镜子不要对床";
        let extraction = strategy().extract(text).unwrap();
        assert!(extraction.sections.score.starts_with("82分"));
        assert!(extraction.sections.direction.contains("坐北朝南"));
        assert!(extraction.sections.layout.contains("客厅"));
        assert!(extraction.sections.notes.contains("镜子"));
        assert!(!extraction.synthesized_score);
    }

    #[test]
    fn test_english_headings() {
        let text = "Overall score: 74 points, decent configuration.\n\
                    Orientation analysis: the south-facing entrance draws steady light.\n\
                    Layout suggestions: keep the main hall uncluttered.";
        let extraction = strategy().extract(text).unwrap();
        assert!(extraction.sections.score.contains("74"));
        assert!(extraction.sections.direction.contains("south-facing"));
        assert!(extraction.sections.layout.contains("uncluttered"));
    }

    #[test]
    fn test_missing_score_is_sniffed_from_body() {
        let text = "方位分析：朝向东南，综合约76分水平\n布局建议：玄关设置屏风";
        let extraction = strategy().extract(text).unwrap();
        assert_eq!(extraction.sections.score, "76分");
        assert!(!extraction.synthesized_score);
    }

    #[test]
    fn test_missing_score_synthesized_when_unsniffable() {
        let text = "布局建议：玄关设置屏风，保持通道畅通无阻";
        let extraction = strategy().extract(text).unwrap();
        assert_eq!(extraction.sections.score, PLACEHOLDER_SCORE);
        assert!(extraction.synthesized_score);
    }

    #[test]
    fn test_no_principal_heading_no_match() {
        assert!(strategy().extract("随便聊聊天气如何").is_none());
        // A timing heading alone does not make the tier claim the text
        assert!(strategy().extract("时间建议：春季动工").is_none());
    }

    #[test]
    fn test_markdown_residue_stripped_before_matching() {
        let text = "### **总体评分**：80分\n\n### 布局建议：保持整洁";
        let extraction = strategy().extract(text).unwrap();
        assert!(extraction.sections.score.starts_with("80分"));
    }
}
