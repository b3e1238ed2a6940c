//! LLM layer: prompts Gemini with Google Search grounding for the day's news
//! and turns the reply into a validated [`AnalysisPayload`](vninsights_core::AnalysisPayload).

mod gemini;
mod prompt;

pub use gemini::{AiError, GeminiClient};
pub use prompt::{analysis_prompt, parse_analysis, strip_code_fences};
