//! Prompt text and reply parsing for the daily analysis.

use vninsights_core::{AnalysisResult, DateKey};

use crate::AiError;

/// Prompt asking for the day's news numbers as a single JSON object.
///
/// The model answers in Vietnamese; only the JSON keys are English.
pub fn analysis_prompt(date: DateKey) -> String {
    format!(
        r#"Phân tích các tin tức, bài báo và sự kiện quan trọng nhất đã xảy ra tại Việt Nam hôm nay ({day}), cho đến 4:00 chiều giờ Việt Nam (GMT+7).

Từ nội dung của các sự kiện này, hãy trích xuất mọi số có hai chữ số mà bạn tìm thấy (từ "00" đến "99"). Thống kê số lần xuất hiện của mỗi số duy nhất.

Dựa trên thống kê đó, chọn một "số đề may mắn nhất" (bestNumber) và từ 2 đến 4 "số lô tiềm năng" (luckyNumbers). Mọi số PHẢI gồm đúng hai chữ số.

Phản hồi của bạn PHẢI là một đối tượng JSON hợp lệ duy nhất và không có gì khác. Không bao gồm văn bản giới thiệu hay định dạng markdown. Đối tượng JSON phải tuân thủ cấu trúc sau:

{{
  "summary": "Một câu tóm tắt ngắn gọn về các chủ đề sự kiện chính trong ngày ở Việt Nam.",
  "bestNumber": {{ "number": "XX", "type": "Số Đề May Mắn Nhất", "probability": "Cao", "reasoning": "Lý do chọn số này, tham chiếu đến sự kiện cụ thể." }},
  "luckyNumbers": [
    {{ "number": "XX", "type": "Số Lô Tiềm Năng", "probability": "Trung bình", "reasoning": "Lý do chọn số này." }}
  ],
  "topNumbers": [
    {{ "number": "XX", "count": 0, "reason": "Tại sao con số này nổi bật, tham chiếu đến sự kiện cụ thể." }}
  ],
  "events": [
    {{ "title": "Tiêu đề sự kiện ngắn gọn", "description": "Mô tả ngắn về sự kiện nơi tìm thấy các con số." }}
  ]
}}

Liệt kê bốn con số xuất hiện thường xuyên nhất trong "topNumbers", sắp xếp theo số lần xuất hiện giảm dần. Toàn bộ nội dung của các trường "summary", "reasoning", "reason", "title", "description" PHẢI LÀ TIẾNG VIỆT."#,
        day = date.display_vi()
    )
}

/// Drop a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the language tag, which may run straight into the body.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse and validate the model's reply text.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AiError> {
    let cleaned = strip_code_fences(text);
    // Tolerate a stray sentence before or after the object.
    let json = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    };
    let analysis: AnalysisResult = serde_json::from_str(json)?;
    analysis.validate()?;
    Ok(analysis)
}
