//! Deterministic Scoring
//!
//! The displayed score never comes from the model. Identical form input must
//! produce an identical score across runs and platforms, so the score is a
//! pure function: an orientation lookup gives the base, and an FNV-1a hash
//! of the canonicalized form nudges it within a small band. Any score the
//! model claims for itself is parsed for logging only.

use serde::Serialize;

use crate::constants::score::{ADJUSTMENT_MODULUS, DEFAULT_BASE, SCORE_MAX, SCORE_MIN};
use crate::types::FormInput;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64-bit over raw bytes; stable, fast, endianness-free
pub(crate) const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Empty and the common "nothing to add" spellings collapse to one token so
/// they cannot produce different scores
fn normalize_description(description: Option<&str>) -> String {
    match description.map(str::trim) {
        None | Some("") | Some("无") => "empty".to_string(),
        Some(text) if text.eq_ignore_ascii_case("none") => "empty".to_string(),
        Some(text) => text.to_string(),
    }
}

fn base_for_direction(direction: &str) -> i64 {
    match direction.trim().to_lowercase().as_str() {
        "south" | "正南" | "南" => 78,
        "southeast" | "东南" => 75,
        "east" | "正东" | "东" => 72,
        "southwest" | "西南" => 68,
        "north" | "正北" | "北" => 65,
        "northwest" | "西北" => 62,
        "west" | "正西" | "西" => 58,
        "northeast" | "东北" => 55,
        _ => DEFAULT_BASE as i64,
    }
}

fn canonical_input(form: &FormInput) -> String {
    let field = |value: &Option<String>| value.as_deref().unwrap_or("").trim().to_string();
    [
        field(&form.house_type),
        field(&form.direction),
        field(&form.area),
        field(&form.floor_level),
        field(&form.room_count),
        field(&form.family_size),
        normalize_description(form.description.as_deref()),
    ]
    .join("|")
}

/// Compute the deterministic score for a form, clamped to [50, 85]
pub fn score(form: &FormInput) -> u8 {
    let base = base_for_direction(form.direction_str());
    let hash = fnv1a_64(canonical_input(form).as_bytes());
    let adjustment = (hash % ADJUSTMENT_MODULUS) as i64 - 5;
    (base + adjustment).clamp(SCORE_MIN as i64, SCORE_MAX as i64) as u8
}

// =============================================================================
// Grade Bands
// =============================================================================

/// Display metadata for one grade band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeInfo {
    pub name: &'static str,
    pub min: u8,
    pub max: u8,
    pub color: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Eight-level grading scale, highest band first
pub const GRADE_BANDS: [GradeInfo; 8] = [
    GradeInfo {
        name: "极吉格局",
        min: 85,
        max: 95,
        color: "#FFD700",
        icon: "🌟",
        description: "此格局主家族兴旺发达、富贵荣华绵延不绝、诸事顺遂如意",
    },
    GradeInfo {
        name: "上吉格局",
        min: 75,
        max: 84,
        color: "#FF6B35",
        icon: "⭐",
        description: "此格局主事业蒸蒸日上、财富广进、家庭和睦美满",
    },
    GradeInfo {
        name: "中吉格局",
        min: 65,
        max: 74,
        color: "#4ECDC4",
        icon: "✨",
        description: "此格局主生活富足安康、事业稳步上升、小有所成",
    },
    GradeInfo {
        name: "小吉格局",
        min: 55,
        max: 64,
        color: "#45B7D1",
        icon: "🔮",
        description: "此格局主衣食无忧、生活平稳，偶有小福降临",
    },
    GradeInfo {
        name: "中平格局",
        min: 45,
        max: 54,
        color: "#96CEB4",
        icon: "🌿",
        description: "此类格局主平淡安稳、无大福亦无大灾",
    },
    GradeInfo {
        name: "小凶格局",
        min: 35,
        max: 44,
        color: "#FECA57",
        icon: "⚠️",
        description: "此格局主时有不顺、小灾小难频发",
    },
    GradeInfo {
        name: "大凶格局",
        min: 25,
        max: 34,
        color: "#FF9FF3",
        icon: "🚨",
        description: "此格局主灾祸不断、财运衰败、健康受损",
    },
    GradeInfo {
        name: "凶煞格局",
        min: 10,
        max: 24,
        color: "#FF6B6B",
        icon: "❌",
        description: "此格局主家破人亡、凶祸连连，建议立即改善",
    },
];

/// Band containing the score; the scale bottoms out at the lowest band
pub fn grade_for(score: u8) -> GradeInfo {
    GRADE_BANDS
        .iter()
        .find(|band| score >= band.min && score <= band.max)
        .copied()
        .unwrap_or(GRADE_BANDS[GRADE_BANDS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form(direction: &str, area: &str, description: &str) -> FormInput {
        FormInput {
            house_type: Some("apartment".to_string()),
            direction: Some(direction.to_string()),
            area: Some(area.to_string()),
            floor_level: Some("8".to_string()),
            room_count: Some("3".to_string()),
            family_size: Some("3".to_string()),
            description: Some(description.to_string()),
        }
    }

    #[test]
    fn test_identical_input_identical_score() {
        let a = form("south", "100", "");
        let b = form("south", "100", "");
        assert_eq!(score(&a), score(&b));
    }

    #[test]
    fn test_empty_description_spellings_collapse() {
        let empty = score(&form("east", "90", ""));
        assert_eq!(empty, score(&form("east", "90", "无")));
        assert_eq!(empty, score(&form("east", "90", "none")));
        assert_eq!(empty, score(&form("east", "90", "None")));
        assert_eq!(empty, score(&form("east", "90", "NONE")));
    }

    #[test]
    fn test_direction_bases_ordering() {
        // With identical remaining fields the adjustment is constant, so the
        // base ordering shows through
        assert!(score(&form("south", "100", "x")) > score(&form("northeast", "100", "x")));
    }

    #[test]
    fn test_chinese_direction_aliases() {
        assert_eq!(base_for_direction("正南"), base_for_direction("south"));
        assert_eq!(base_for_direction("东南"), base_for_direction("SouthEast"));
        assert_eq!(base_for_direction("胡说"), DEFAULT_BASE as i64);
        assert_eq!(base_for_direction(""), DEFAULT_BASE as i64);
    }

    #[test]
    fn test_fnv_known_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_grade_bands_cover_score_range() {
        for value in SCORE_MIN..=SCORE_MAX {
            let grade = grade_for(value);
            assert!(value >= grade.min && value <= grade.max);
        }
        assert_eq!(grade_for(80).name, "上吉格局");
        assert_eq!(grade_for(50).name, "中平格局");
        assert_eq!(grade_for(5).name, "凶煞格局");
    }

    proptest! {
        #[test]
        fn prop_score_always_in_range(
            direction in "\\PC{0,12}",
            area in "[0-9]{0,4}",
            description in "\\PC{0,40}",
        ) {
            let value = score(&form(&direction, &area, &description));
            prop_assert!((SCORE_MIN..=SCORE_MAX).contains(&value));
        }

        #[test]
        fn prop_score_deterministic(
            direction in "(south|north|east|west|东南|西北)",
            description in "\\PC{0,40}",
        ) {
            let a = form(&direction, "75", &description);
            let b = form(&direction, "75", &description);
            prop_assert_eq!(score(&a), score(&b));
        }
    }
}
