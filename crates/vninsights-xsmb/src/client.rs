//! HTTP client for the XSMB results API.

use reqwest::header::ACCEPT;
use thiserror::Error;
use tracing::{debug, info, warn};
use vninsights_core::{DateKey, LotteryResult, ValidationError};

use crate::response::XsmbResponse;

/// The results host rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum XsmbError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed prize table: {0}")]
    Invalid(#[from] ValidationError),
}

/// Client for the `/api/xoso` endpoint.
pub struct XsmbClient {
    client: reqwest::Client,
    base_url: String,
}

impl XsmbClient {
    /// `base_url` like `https://v0-next-js-app-for-xoso.vercel.app` (a trailing
    /// slash is trimmed).
    pub fn new(base_url: impl Into<String>) -> Result<Self, XsmbError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn day_url(&self, date: DateKey) -> String {
        format!("{}/api/xoso?date={date}", self.base_url)
    }

    fn range_url(&self, start: DateKey, end: DateKey) -> String {
        format!("{}/api/xoso?start={start}&end={end}", self.base_url)
    }

    async fn get(&self, url: &str) -> Result<XsmbResponse, XsmbError> {
        debug!(url = %url, "querying xsmb");
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(XsmbError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Raw response for one day.
    pub async fn fetch_day(&self, date: DateKey) -> Result<XsmbResponse, XsmbError> {
        self.get(&self.day_url(date)).await
    }

    /// Raw response for an inclusive range of days.
    pub async fn fetch_range(
        &self,
        start: DateKey,
        end: DateKey,
    ) -> Result<XsmbResponse, XsmbError> {
        self.get(&self.range_url(start, end)).await
    }

    /// The reduced result for `date`, or `None` if it is not published yet.
    pub async fn lottery_result(&self, date: DateKey) -> Result<Option<LotteryResult>, XsmbError> {
        let resp = self.fetch_day(date).await?;
        if !resp.ok {
            warn!(
                date = %date,
                error = resp.error.as_deref().unwrap_or("unknown"),
                "xsmb has no result"
            );
        }
        let result = resp.lottery_result()?;
        match &result {
            Some(r) => info!(date = %date, special = %r.special_prize, "fetched lottery result"),
            None => info!(date = %date, "lottery result not available yet"),
        }
        Ok(result)
    }

    /// Reduced results for every day in `start..=end` the upstream returned.
    pub async fn lottery_results(
        &self,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<(DateKey, Option<LotteryResult>)>, XsmbError> {
        let resp = self.fetch_range(start, end).await?;
        let results = resp.lottery_results()?;
        info!(
            start = %start,
            end = %end,
            days = results.len(),
            available = results.iter().filter(|(_, r)| r.is_some()).count(),
            "fetched lottery range"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = XsmbClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn urls_use_iso_dates() {
        let client = XsmbClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.day_url(key("2024-01-15")),
            "http://localhost:3000/api/xoso?date=2024-01-15"
        );
        assert_eq!(
            client.range_url(key("2024-01-01"), key("2024-01-15")),
            "http://localhost:3000/api/xoso?start=2024-01-01&end=2024-01-15"
        );
    }

    #[test]
    fn requests_identify_as_a_browser() {
        assert!(USER_AGENT.starts_with("Mozilla/5.0 ("));
        assert!(!USER_AGENT.contains("  "));
        assert!(reqwest::header::HeaderValue::from_str(USER_AGENT).is_ok());
    }

    #[test]
    fn bad_tail_surfaces_as_invalid() {
        let resp: XsmbResponse =
            serde_json::from_str(r#"{"ok": true, "data": {"prizes": {"ĐB": ["1"]}}}"#).unwrap();
        let err: XsmbError = resp.lottery_result().unwrap_err().into();
        assert!(matches!(err, XsmbError::Invalid(_)));
        assert!(err.to_string().starts_with("malformed prize table"));
    }

    #[test]
    fn day_fixture_parses() {
        let resp: XsmbResponse = serde_json::from_str(crate::response::tests::DAY_JSON).unwrap();
        assert!(resp.ok);
        assert!(!resp.range);
        assert_eq!(resp.region, "mb");
    }
}
