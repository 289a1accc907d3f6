use super::SentimentError;
use crate::config::SentimentConfig;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static SCORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+").expect("score pattern is valid"));

/// Client for the hosted sentiment model
pub struct SentimentAnalyzer {
    http: Client,
    url: String,
    api_key: String,
}

impl SentimentAnalyzer {
    pub fn new(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            url: config.sentiment_url.clone(),
            api_key: config.sentiment_api_key.clone(),
        })
    }

    fn build_prompt(text: &str) -> String {
        format!(
            "Rate the overall sentiment of these tweets about the Bittensor project \
             on a scale from -100 (extremely negative) through 0 (neutral) to 100 \
             (extremely positive). Reply with a single integer between -100 and 100 \
             and nothing else.\n\nTweets:\n{}",
            text
        )
    }

    /// Score `text` in `[-100, 100]`
    pub async fn analyze(&self, text: &str) -> Result<i32, SentimentError> {
        debug!("Scoring sentiment of {} chars", text.len());

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "inputs": { "prompt": Self::build_prompt(text) } }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SentimentError::Status {
                service: "sentiment model",
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await?;
        let generation = extract_generation(&body).ok_or_else(|| {
            SentimentError::UnexpectedResponse("no generation in model response".to_string())
        })?;

        parse_score(&generation).ok_or_else(|| {
            warn!("Model reply has no score: {:?}", generation);
            SentimentError::UnexpectedResponse(format!("no integer in {:?}", generation))
        })
    }
}

/// Text of the model reply, from whichever response shape is present
fn extract_generation(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/outputs/generation"),
        body.get("output"),
        body.pointer("/choices/0/text"),
        body.pointer("/choices/0/message/content"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// First integer in `reply`, clamped to `[-100, 100]`
pub fn parse_score(reply: &str) -> Option<i32> {
    let found = SCORE_PATTERN.find(reply)?;
    let value: i64 = match found.as_str().parse() {
        Ok(v) => v,
        // more digits than fit in i64; keep the sign
        Err(_) if found.as_str().starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    };
    Some(value.clamp(-100, 100) as i32)
}
