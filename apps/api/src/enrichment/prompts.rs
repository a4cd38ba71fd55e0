// Summary prompt for enrichment hits.

use crate::llm_client::PromptPair;

pub const SUMMARY_SYSTEM: &str = "Bạn là trợ lý tóm tắt bài viết cho sinh viên. \
    Chỉ dùng thông tin có trong nội dung được cung cấp. KHÔNG bịa thêm.";

/// Replace `{text}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Tóm tắt nội dung sau bằng tiếng Việt, KHÔNG bịa:
- Đúng 3 gạch đầu dòng (không hơn, không kém)
- Mỗi gạch 1 câu ngắn
- Giữ tên riêng/số liệu/mốc thời gian (nếu có)
- Nếu bài thiếu dữ kiện quan trọng: ghi "không thấy đề cập"

NỘI DUNG:
{text}"#;

pub fn summary_prompt(text: &str) -> PromptPair {
    PromptPair::new(SUMMARY_SYSTEM, SUMMARY_PROMPT_TEMPLATE.replace("{text}", text))
}
