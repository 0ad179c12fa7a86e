//! Prompt Construction
//!
//! Pure string assembly: the outbound analysis prompt is composed from the
//! normalized form, the marker-format contract the classifier expects, and
//! tier-specific depth instructions. Nothing here touches the network.

use std::fmt::Write;

use crate::classify::ClassifiedSections;
use crate::types::{FormInput, Language, UserTier};

/// Marker-format contract block shared by both languages; the classifier's
/// first tier depends on the model honoring these exact tokens
const MARKER_CONTRACT_ZH: &str = "\
【专业分析结构】
必须完全按照以下标记格式输出，缺一不可：

***SCORE_START***
[总体评分和分析内容]
***SCORE_END***

***DIRECTION_START***
[朝向分析内容]
***DIRECTION_END***

***LAYOUT_START***
[布局建议内容]
***LAYOUT_END***

***TIMING_START***
[时间建议内容]
***TIMING_END***

***NOTES_START***
[注意事项内容]
***NOTES_END***

如果不使用上述标记格式，系统将无法正确解析你的回答。";

const MARKER_CONTRACT_EN: &str = "\
【Analysis Structure】
Strictly follow the markup format below, each section using clear start and end markers:

***SCORE_START***
XX points; first scoring basis; second scoring basis; other related explanations
***SCORE_END***

***DIRECTION_START***
Orientation advantages; Bagua Five Elements analysis; aspects requiring attention
***DIRECTION_END***

***LAYOUT_START***
Important area analysis; furniture placement suggestions; spatial layout optimization
***LAYOUT_END***

***TIMING_START***
Best implementation timing; times to avoid; daily maintenance schedule
***TIMING_END***

***NOTES_START***
Important taboos; matters requiring special attention; daily maintenance points
***NOTES_END***

If the markup format is not used, the system cannot parse your answer.";

fn tier_depth_zh(tier: UserTier) -> &'static str {
    match tier {
        UserTier::Free => {
            "- 提供基础风水分析，每个分段控制在200字以内\n\
             - 给出简化的改善建议，重点突出最重要的3-5个要点\n\
             - 分析深度：基础级别，使用通俗易懂的语言，避免过于专业的术语"
        }
        UserTier::Premium => {
            "- 提供详细的专业风水分析，每个分段500-800字\n\
             - 包含具体的改善措施和实施步骤\n\
             - 分析深度：专业级别，结合传统理论和现代实践\n\
             - 提供时间建议和最佳实施时机，可以使用专业术语但需适当解释"
        }
        UserTier::Vip => {
            "- 提供大师级别的深度风水分析，每个分段1000字以上\n\
             - 多角度解读：传统八卦、五行、现代建筑学三重视角\n\
             - 包含个性化建议、详细施工指导和购买清单\n\
             - 分析深度：大师级别，使用专业术语和深层理论解析"
        }
    }
}

fn tier_depth_en(tier: UserTier) -> &'static str {
    match tier {
        UserTier::Free => {
            "- Provide basic analysis, each section within 200 words\n\
             - Give simplified improvement suggestions, highlighting the 3-5 most important points\n\
             - Analysis depth: basic level, plain language, avoid overly professional terms"
        }
        UserTier::Premium => {
            "- Provide detailed professional analysis, each section 500-800 words\n\
             - Include specific improvement measures and implementation steps\n\
             - Analysis depth: professional level, combining traditional theory and modern practice\n\
             - Provide timing advice; professional terms allowed with appropriate explanations"
        }
        UserTier::Vip => {
            "- Provide master-level deep analysis, each section 1000+ words\n\
             - Multi-angle interpretation: traditional Bagua, Five Elements, modern architecture\n\
             - Include personalized advice, detailed construction guidance and purchase lists\n\
             - Analysis depth: master level, professional terms and deep theoretical analysis"
        }
    }
}

/// Compose the outbound analysis prompt for one request
pub fn build_analysis_prompt(form: &FormInput, language: Language, tier: UserTier) -> String {
    match language {
        Language::Zh => build_zh(form, tier),
        Language::En => build_en(form, tier),
    }
}

fn build_zh(form: &FormInput, tier: UserTier) -> String {
    let mut prompt = String::from(
        "作为一位精通《葬书》、《青囊奥语》、《阳宅十书》的资深风水大师，\
         请基于三元九运理论（当前九紫离火运2024-2043）对以下住宅进行专业风水分析：\n\n\
         【基本信息】",
    );
    let _ = write!(
        prompt,
        "\n- 分析类型：{}",
        form.house_type.as_deref().unwrap_or("未指定")
    );
    let _ = write!(
        prompt,
        "\n- 入户门朝向：{}",
        form.direction.as_deref().unwrap_or("未确定")
    );
    if let Some(area) = form.area.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- 建筑面积：{area}平方米");
    }
    if let Some(floor) = form.floor_level.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- 楼层位置：{floor}");
    }
    if let Some(rooms) = form.room_count.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- 房间数量：{rooms}");
    }
    if let Some(family) = form.family_size.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- 家庭人数：{family}");
    }
    if let Some(description) = form.description.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- 当前布局：{description}");
    }

    let _ = write!(
        prompt,
        "\n\n请基于以上信息进行专业风水分析：\n\n\
         【格式要求】\n\
         - 严格禁止使用任何Markdown符号：不能使用**、##、###、*、-、|、```等任何格式化符号\n\
         - 不能使用表格格式，改用简洁的文字描述\n\
         - 所有部分都采用分号分隔格式：要点1；要点2；要点3\n\n\
         {MARKER_CONTRACT_ZH}\n\n\
         【用户等级分析要求】\n{}\n\n\
         【输出要求】\n\
         - 内容要专业权威，基于传统风水理论\n\
         - 语言通俗易懂，建议具体可行，贴近现代生活需求\n\
         - 各区块内容必须完全不重复\n\
         - 标记符号必须完全匹配：***SCORE_START*** 和 ***SCORE_END*** 等",
        tier_depth_zh(tier)
    );
    prompt
}

fn build_en(form: &FormInput, tier: UserTier) -> String {
    let mut prompt = String::from(
        "As a senior Feng Shui master, please provide a detailed Feng Shui analysis \
         for the following property:\n\nProperty Information:",
    );
    let _ = write!(
        prompt,
        "\n- Type: {}",
        form.house_type.as_deref().unwrap_or("unspecified")
    );
    let _ = write!(
        prompt,
        "\n- Orientation: {}",
        form.direction.as_deref().unwrap_or("undetermined")
    );
    if let Some(area) = form.area.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- Area: {area} square meters");
    }
    if let Some(floor) = form.floor_level.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- Floor level: {floor}");
    }
    if let Some(rooms) = form.room_count.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- Room count: {rooms}");
    }
    if let Some(family) = form.family_size.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- Family size: {family}");
    }
    if let Some(description) = form.description.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(prompt, "\n- Current layout: {description}");
    }

    let _ = write!(
        prompt,
        "\n\nPlease provide professional analysis, strictly following the format requirements:\n\n\
         【Format Requirements】\n\
         - Strictly prohibit using any Markdown symbols: no **, ##, ###, *, -, | or code fences\n\
         - No table format; use concise text descriptions instead\n\
         - Use semicolon-separated points within each section\n\n\
         {MARKER_CONTRACT_EN}\n\n\
         【User Tier Analysis Requirements】\n{}\n\n\
         【Output Requirements】\n\
         - Content should be professional and authoritative, based on traditional theory\n\
         - Suggestions should be specific and practical, close to modern life needs\n\
         - All analysis content must be in English\n\
         - Marker tokens must match exactly: ***SCORE_START*** and ***SCORE_END*** etc.",
        tier_depth_en(tier)
    );
    prompt
}

/// Compose the follow-up prompt that asks for the optimization plan
pub fn build_optimization_prompt(sections: &ClassifiedSections, language: Language) -> String {
    match language {
        Language::Zh => format!(
            "作为风水专家，请从以下已分析的风水内容中提取所有的改善措施和优化建议：\n\n\
             分析内容：\n\
             - 方位分析：{}\n\
             - 布局建议：{}\n\
             - 时间建议：{}\n\
             - 注意事项：{}\n\n\
             请提取所有具体的、可执行的改善措施，严格按照以下标记格式输出：\n\n\
             ***IMMEDIATE_START***\n\
             立即执行措施1；立即执行措施2；立即执行措施3；其他当天可完成的改善方法\n\
             ***IMMEDIATE_END***\n\n\
             ***REGULAR_START***\n\
             定期维护措施1；定期维护措施2；定期维护措施3；其他周期性维护方法\n\
             ***REGULAR_END***\n\n\
             要求：\n\
             1. 每个措施都要具体可行，如\"在财位摆放金蟾\"而非\"增强财运\"\n\
             2. 立即执行：当天或本周内可以完成的措施\n\
             3. 定期维护：需要周期性进行的维护措施\n\
             4. 严格使用分号分隔，不要使用任何格式化符号\n\
             5. 从原内容中提取，不要自行新增建议",
            sections.direction, sections.layout, sections.timing, sections.notes
        ),
        Language::En => format!(
            "As a Feng Shui expert, please extract all improvement measures and optimization \
             suggestions from the following analyzed content, categorized by implementation timing:\n\n\
             Analysis Content:\n\
             - Direction Analysis: {}\n\
             - Layout Suggestions: {}\n\
             - Timing Suggestions: {}\n\
             - Important Notes: {}\n\n\
             Extract all specific, actionable improvement measures in the following format \
             (strictly semicolon-separated):\n\n\
             ***IMMEDIATE_START***\n\
             Immediate measure 1; Immediate measure 2; Immediate measure 3; Other immediately actionable methods\n\
             ***IMMEDIATE_END***\n\n\
             ***REGULAR_START***\n\
             Regular measure 1; Regular measure 2; Regular measure 3; Other periodic maintenance methods\n\
             ***REGULAR_END***\n\n\
             Requirements:\n\
             1. Each measure must be specific and actionable, such as \"Place money toad in wealth position\" \
             rather than \"Enhance wealth luck\"\n\
             2. Immediate actions: measures completable today or within this week\n\
             3. Regular actions: measures performed periodically for maintenance\n\
             4. Strictly use semicolon separation; do not use any Markdown symbols\n\
             5. Extract from the original content only; all suggestions must be in English",
            sections.direction, sections.layout, sections.timing, sections.notes
        ),
    }
}
