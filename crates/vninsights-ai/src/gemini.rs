//! Gemini `generateContent` client with Google Search grounding.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};
use vninsights_core::{
    AnalysisPayload, DateKey, GeminiSettings, GroundingChunk, ValidationError, WebSource,
};

use crate::prompt::{analysis_prompt, parse_analysis};

/// Low temperature keeps the JSON shape stable.
const TEMPERATURE: f64 = 0.1;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model returned no text")]
    EmptyResponse,
    #[error("invalid analysis: {0}")]
    Invalid(#[from] ValidationError),
    #[error("no Gemini API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<RawChunk>,
}

/// Chunks without a `web` source (e.g. retrieved context) are dropped.
#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

impl GeminiClient {
    /// Build a client from settings. Fails without an API key.
    pub fn new(settings: &GeminiSettings) -> Result<Self, AiError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AiError::MissingApiKey)?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Analyse the news of `date`.
    pub async fn analyze(&self, date: DateKey) -> Result<AnalysisPayload, AiError> {
        let body = request_body(&analysis_prompt(date));

        info!(date = %date, model = %self.model, "requesting daily analysis");
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let payload = parse_generate_response(&text)?;
        info!(
            date = %date,
            best = %payload.analysis.best_number.number,
            lucky = payload.analysis.lucky_numbers.len(),
            sources = payload.grounding_chunks.len(),
            "analysis received"
        );
        Ok(payload)
    }
}

fn request_body(prompt: &str) -> serde_json::Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "tools": [{ "google_search": {} }],
        "generationConfig": { "temperature": TEMPERATURE },
    })
}

/// Turn a raw `generateContent` response body into a validated payload.
fn parse_generate_response(body: &str) -> Result<AnalysisPayload, AiError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(AiError::EmptyResponse);
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    debug!(chars = text.len(), "model reply");

    let analysis = parse_analysis(&text).inspect_err(|e| {
        warn!(error = %e, "unusable model reply");
    })?;

    let grounding_chunks = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web.map(|web| GroundingChunk { web }))
        .collect();

    Ok(AnalysisPayload {
        analysis,
        grounding_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::tests::REPLY;

    fn settings(key: Option<&str>) -> GeminiSettings {
        GeminiSettings {
            api_key: key.map(str::to_string),
            base_url: "http://localhost:8080/".into(),
            ..GeminiSettings::default()
        }
    }

    fn wrap(text: &str, chunks: serde_json::Value) -> String {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "groundingMetadata": { "groundingChunks": chunks },
            }]
        })
        .to_string()
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(matches!(GeminiClient::new(&settings(None)), Err(AiError::MissingApiKey)));
        assert!(matches!(GeminiClient::new(&settings(Some("  "))), Err(AiError::MissingApiKey)));
    }

    #[test]
    fn endpoint_names_the_model() {
        let client = GeminiClient::new(&settings(Some("k"))).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn request_enables_search_and_low_temperature() {
        let body = request_body("xin chào");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "xin chào");
        assert!(body["tools"][0].get("google_search").is_some());
        assert_eq!(body["generationConfig"]["temperature"], 0.1);
    }

    #[test]
    fn response_yields_analysis_and_web_sources() {
        let body = wrap(
            &format!("```json\n{REPLY}\n```"),
            json!([
                { "web": { "uri": "https://vnexpress.net/a", "title": "vnexpress.net" } },
                { "retrievedContext": { "uri": "gs://x" } },
                { "web": { "uri": "https://tuoitre.vn/b", "title": "tuoitre.vn" } },
            ]),
        );
        let payload = parse_generate_response(&body).unwrap();
        assert_eq!(payload.analysis.best_number.number, "07");
        assert_eq!(payload.grounding_chunks.len(), 2);
        assert_eq!(payload.grounding_chunks[1].web.title, "tuoitre.vn");
    }

    #[test]
    fn split_parts_are_joined() {
        let (head, tail) = REPLY.split_at(REPLY.find("\"luckyNumbers\"").unwrap());
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": head }, { "text": tail }] } }]
        })
        .to_string();
        let payload = parse_generate_response(&body).unwrap();
        assert!(payload.grounding_chunks.is_empty());
        assert_eq!(payload.analysis.lucky_numbers[1].number, "45");
    }

    #[test]
    fn no_candidates_is_empty() {
        assert!(matches!(
            parse_generate_response(r#"{"candidates": []}"#),
            Err(AiError::EmptyResponse)
        ));
        assert!(matches!(
            parse_generate_response(&wrap("   ", json!([]))),
            Err(AiError::EmptyResponse)
        ));
    }

    #[test]
    fn invalid_analysis_is_reported() {
        let reply = r#"{"summary": "s", "bestNumber": {"number": "7"}, "luckyNumbers": [{"number": "23"}]}"#;
        assert!(matches!(
            parse_generate_response(&wrap(reply, json!([]))),
            Err(AiError::Invalid(_))
        ));
    }
}
