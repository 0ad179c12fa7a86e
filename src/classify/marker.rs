//! Marker Tier
//!
//! The prompt instructs models to wrap each section in explicit delimiter
//! pairs (`***SCORE_START***` … `***SCORE_END***`). This tier is a literal
//! span scan; a section only counts when its end marker appears after its
//! start marker, and extracted text is trimmed.

use super::{ClassifiedSections, Extraction, ExtractionStrategy, SectionKind};

impl SectionKind {
    fn marker_token(self) -> &'static str {
        match self {
            SectionKind::Score => "SCORE",
            SectionKind::Direction => "DIRECTION",
            SectionKind::Layout => "LAYOUT",
            SectionKind::Timing => "TIMING",
            SectionKind::Notes => "NOTES",
        }
    }
}

pub(crate) struct MarkerStrategy;

impl MarkerStrategy {
    pub fn new() -> Self {
        Self
    }

    fn extract_span(text: &str, token: &str) -> Option<String> {
        let start_marker = format!("***{token}_START***");
        let end_marker = format!("***{token}_END***");

        let start = text.find(&start_marker)? + start_marker.len();
        let rest = &text[start..];
        let end = rest.find(&end_marker)?;
        Some(rest[..end].trim().to_string())
    }
}

impl ExtractionStrategy for MarkerStrategy {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn extract(&self, text: &str) -> Option<Extraction> {
        let mut sections = ClassifiedSections::default();
        let mut matched = false;

        for kind in SectionKind::ALL {
            if let Some(content) = Self::extract_span(text, kind.marker_token()) {
                matched = true;
                let slot = match kind {
                    SectionKind::Score => &mut sections.score,
                    SectionKind::Direction => &mut sections.direction,
                    SectionKind::Layout => &mut sections.layout,
                    SectionKind::Timing => &mut sections.timing,
                    SectionKind::Notes => &mut sections.notes,
                };
                *slot = content;
            }
        }

        matched.then_some(Extraction {
            sections,
            synthesized_score: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_five_pairs_extracted() {
        let text = "\
***SCORE_START*** 80分 ***SCORE_END***
***DIRECTION_START*** south facing ***DIRECTION_END***
***LAYOUT_START*** open hall ***LAYOUT_END***
***TIMING_START*** spring works ***TIMING_END***
***NOTES_START*** no mirrors facing beds ***NOTES_END***";
        let extraction = MarkerStrategy::new().extract(text).unwrap();
        assert_eq!(extraction.sections.score, "80分");
        assert_eq!(extraction.sections.direction, "south facing");
        assert_eq!(extraction.sections.layout, "open hall");
        assert_eq!(extraction.sections.timing, "spring works");
        assert_eq!(extraction.sections.notes, "no mirrors facing beds");
    }

    #[test]
    fn test_end_marker_must_follow_start() {
        let text = "***SCORE_END*** stray ***SCORE_START*** dangling";
        assert!(MarkerStrategy::new().extract(text).is_none());
    }

    #[test]
    fn test_partial_markers_still_match() {
        let text = "prose ***TIMING_START*** 农历初一 ***TIMING_END*** prose";
        let extraction = MarkerStrategy::new().extract(text).unwrap();
        assert_eq!(extraction.sections.timing, "农历初一");
        // Timing alone is not a principal section
        assert!(!extraction.sections.is_viable());
    }

    #[test]
    fn test_no_markers_no_match() {
        assert!(MarkerStrategy::new().extract("plain text").is_none());
    }
}
