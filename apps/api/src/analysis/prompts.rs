// All prompt constants and builders for the analysis stages.
// Builders are pure: same profile in, same prompt out.

use serde::Serialize;

use crate::analysis::rubric::RUBRIC;
use crate::llm_client::PromptPair;
use crate::models::profile::{AcademicProfile, PersonalProfile, StudentCase};

/// Shared system prompt for the narrative and advice stages.
pub const BRANDING_SYSTEM: &str = "\
Bạn là chuyên gia hướng nghiệp và phân tích thương hiệu cá nhân cho sinh viên đại học. \
Trả lời nhanh, ngắn, hành động được. Luôn viết bằng tiếng Việt. \
KHÔNG tự bịa thêm thông tin. Chỉ dùng dữ liệu trong object sinh viên; thiếu gì thì nói thiếu ngắn gọn.";

/// System prompt for rubric scoring.
pub const SCORING_SYSTEM: &str = "\
Bạn là người chấm điểm hồ sơ thương hiệu cá nhân của sinh viên theo một rubric cố định. \
Chấm nghiêm khắc, chỉ dựa trên dữ liệu được cung cấp. Mục nào không có dữ liệu thì cho điểm thấp. \
Không được vượt quá điểm tối đa của từng tiêu chí.";

/// Replace `{profile_json}` before sending.
pub const BACKGROUND_PROMPT_TEMPLATE: &str = r#"Hồ sơ học tập của sinh viên (JSON):
{profile_json}

Hãy đưa ra nhận xét ngắn (tối đa 4 câu, viết bằng tiếng Việt) gồm:
- Đánh giá tổng quan nền tảng học tập (1 câu)
- Lỗ hổng lớn nhất đang kéo hồ sơ xuống (1 câu)
- Hành động tốt nhất trong 7 ngày tới để cải thiện hồ sơ (1 câu)
- 1 câu định vị (positioning) phù hợp với ngành và năm học

QUY TẮC:
1. Chỉ dùng dữ liệu trong JSON; trường nào trống thì nói "chưa có thông tin"
2. Trường "mentor" = "unknown" nghĩa là chưa rõ, KHÔNG được hiểu là không có mentor
3. Viết thẳng, gọn, không giải thích dài"#;

/// Replace `{profile_json}` before sending.
pub const PERSONALITY_PROMPT_TEMPLATE: &str = r#"Hồ sơ cá nhân của sinh viên (JSON):
{profile_json}

Phân tích thương hiệu cá nhân dựa trên sở thích, tính cách, phong cách học và mục tiêu.
Viết tối đa 4 câu bằng tiếng Việt:
- Điểm nổi bật nhất có thể trở thành thương hiệu cá nhân (1 câu)
- Mức độ nhất quán giữa tính cách, chủ đề yêu thích và mục tiêu ngắn/trung/dài hạn (1 câu)
- Rủi ro lớn nhất khiến thương hiệu bị mờ nhạt (1 câu)
- 1 câu "tagline" gợi ý cho sinh viên

QUY TẮC:
1. KHÔNG bịa thêm sở thích, thành tích hay mục tiêu không có trong JSON
2. Nếu "unique_brand" trống, đề xuất dựa trên dữ liệu sẵn có và nói rõ đó là đề xuất"#;

/// Replace `{case_json}` before sending.
pub const CASE_PROMPT_TEMPLATE: &str = r#"Toàn bộ hồ sơ sinh viên (học tập + cá nhân, JSON):
{case_json}

Dựa trên cả hai phần hồ sơ, trả về MỘT object JSON với đúng 5 trường, tất cả là chuỗi tiếng Việt:
{
  "advice": "2-3 câu lời khuyên hành động cụ thể để xây dựng thương hiệu cá nhân",
  "article": "chủ đề một bài viết nên đọc, kèm lý do trong 1 câu",
  "books": "1-2 cuốn sách nên đọc (tên sách - tác giả)",
  "newspaper": "một cụm từ tìm kiếm ngắn (3-8 từ) về tin tức/bài báo liên quan đến ngành và mục tiêu",
  "certification_course": "một chứng chỉ hoặc khóa học phù hợp nhất"
}

QUY TẮC:
1. KHÔNG bịa thông tin về sinh viên
2. "newspaper" sẽ được dùng trực tiếp làm truy vấn tìm kiếm web: không dùng dấu ngoặc, không giải thích
3. Không có trường nào được để trống"#;

/// Replace `{weight_table}`, `{academic_json}`, `{personal_json}` before sending.
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Chấm điểm mức độ sẵn sàng về thương hiệu cá nhân của sinh viên theo rubric sau (tổng 100 điểm):
{weight_table}

HỒ SƠ HỌC TẬP (JSON):
{academic_json}

HỒ SƠ CÁ NHÂN (JSON):
{personal_json}

Trả về một object JSON chứa đúng 6 trường số nguyên ở trên.
Mỗi điểm phải nằm trong khoảng từ 0 đến điểm tối đa của tiêu chí đó."#;

fn render_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// One line per rubric dimension: `- key (label): tối đa N điểm`.
pub fn weight_table() -> String {
    RUBRIC
        .iter()
        .map(|d| format!("- {} ({}): tối đa {} điểm", d.key, d.label, d.max))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn background_prompt(academic: &AcademicProfile) -> Result<PromptPair, serde_json::Error> {
    let user = BACKGROUND_PROMPT_TEMPLATE.replace("{profile_json}", &render_json(academic)?);
    Ok(PromptPair::new(BRANDING_SYSTEM, user))
}

pub fn personality_prompt(personal: &PersonalProfile) -> Result<PromptPair, serde_json::Error> {
    let user = PERSONALITY_PROMPT_TEMPLATE.replace("{profile_json}", &render_json(personal)?);
    Ok(PromptPair::new(BRANDING_SYSTEM, user))
}

pub fn case_prompt(case: &StudentCase) -> Result<PromptPair, serde_json::Error> {
    let user = CASE_PROMPT_TEMPLATE.replace("{case_json}", &render_json(case)?);
    Ok(PromptPair::new(BRANDING_SYSTEM, user))
}

pub fn score_prompt(
    academic: &AcademicProfile,
    personal: &PersonalProfile,
) -> Result<PromptPair, serde_json::Error> {
    let user = SCORE_PROMPT_TEMPLATE
        .replace("{weight_table}", &weight_table())
        .replace("{academic_json}", &render_json(academic)?)
        .replace("{personal_json}", &render_json(personal)?);
    Ok(PromptPair::new(SCORING_SYSTEM, user))
}
