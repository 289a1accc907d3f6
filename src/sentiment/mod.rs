//! Tweet sentiment for subnets
//!
//! Searches recent tweets about a subnet and asks a hosted model to score
//! them from -100 (very negative) to 100 (very positive). Any failure
//! degrades to a neutral score of 0.

mod analyzer;
mod tweets;

pub use analyzer::{parse_score, SentimentAnalyzer};
pub use tweets::{Tweet, TweetSearchClient};

use crate::config::SentimentConfig;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Outcome of a subnet sentiment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentReport {
    /// -100..=100, 0 when neutral or unavailable
    pub score: i32,
    pub tweet_count: usize,
    pub query: String,
}

/// Source of subnet sentiment scores
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn analyze_subnet(&self, netuid: u16) -> SentimentReport;
}

/// Tweet search followed by model scoring
pub struct SentimentService {
    search: TweetSearchClient,
    analyzer: SentimentAnalyzer,
}

impl SentimentService {
    pub fn new(config: &SentimentConfig) -> Result<Self, SentimentError> {
        if config.search_api_key.is_empty() {
            warn!("DATURA_APIKEY not set, tweet search will likely be rejected");
        }
        if config.sentiment_api_key.is_empty() {
            warn!("CHUTES_API_KEY not set, sentiment scoring will likely be rejected");
        }
        Ok(Self {
            search: TweetSearchClient::new(config)?,
            analyzer: SentimentAnalyzer::new(config)?,
        })
    }

    pub fn search_query(netuid: u16) -> String {
        format!("Bittensor netuid {}", netuid)
    }
}

#[async_trait]
impl SentimentSource for SentimentService {
    async fn analyze_subnet(&self, netuid: u16) -> SentimentReport {
        let query = Self::search_query(netuid);
        info!("Analyzing tweet sentiment for {:?}", query);

        let tweets = match self.search.search(&query).await {
            Ok(tweets) => tweets,
            Err(e) => {
                warn!("Tweet search failed: {}", e);
                Vec::new()
            }
        };

        if tweets.is_empty() {
            warn!("No tweets found for {:?}, sentiment is neutral", query);
            return SentimentReport {
                score: 0,
                tweet_count: 0,
                query,
            };
        }

        let text = tweets
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let score = match self.analyzer.analyze(&text).await {
            Ok(score) => score,
            Err(e) => {
                warn!("Sentiment analysis failed: {}", e);
                0
            }
        };

        info!(
            netuid,
            score,
            tweets = tweets.len(),
            "Sentiment analysis complete"
        );

        SentimentReport {
            score,
            tweet_count: tweets.len(),
            query,
        }
    }
}
