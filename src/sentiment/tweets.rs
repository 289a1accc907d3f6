use super::SentimentError;
use crate::config::SentimentConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: u32,
}

/// Client for the tweet search API
pub struct TweetSearchClient {
    http: Client,
    url: String,
    api_key: String,
    limit: u32,
}

impl TweetSearchClient {
    pub fn new(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            url: config.search_url.clone(),
            api_key: config.search_api_key.clone(),
            limit: config.tweet_limit,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Tweet>, SentimentError> {
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&SearchRequest {
                query,
                limit: self.limit,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SentimentError::Status {
                service: "tweet search",
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await?;
        let tweets = parse_tweets(body)?;
        debug!("Tweet search for {:?} returned {} tweets", query, tweets.len());
        Ok(tweets)
    }
}

/// Accepts a bare array, `{"tweets": [...]}` or `{"data": [...]}`
fn parse_tweets(body: Value) -> Result<Vec<Tweet>, SentimentError> {
    let list = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => match map.remove("tweets").or_else(|| map.remove("data")) {
            Some(list @ Value::Array(_)) => list,
            _ => {
                return Err(SentimentError::UnexpectedResponse(
                    "search response has no tweet list".to_string(),
                ))
            }
        },
        other => {
            return Err(SentimentError::UnexpectedResponse(format!(
                "search response is {}",
                other
            )))
        }
    };
    serde_json::from_value(list).map_err(|e| SentimentError::UnexpectedResponse(e.to_string()))
}
