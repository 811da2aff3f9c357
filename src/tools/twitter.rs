//! X (Twitter) recent-search tool.
//!
//! Fetches recent posts for a query, joins author and media expansions,
//! and returns documents scored with the relevance heuristics.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::score::{relevance_score, SocialDocument};
use super::{ParamsExt, Tool, ToolParameters, ToolParams};
use crate::error::Result;
use crate::llm::http::shared_client;

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const MAX_RESULTS_DEFAULT: i64 = 10;

/// Search operation for the X platform.
pub struct TwitterSearchTool {
    bearer_token: String,
    parameters: ToolParameters,
}

impl TwitterSearchTool {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            parameters: ToolParameters::object()
                .string("query", "search query for recent posts", true)
                .number("max_results", "maximum number of posts to return", false)
                .build(),
        }
    }

    async fn fetch(&self, query: &str, max_results: i64) -> Result<TweetsResponse> {
        let resp = shared_client()
            .get(SEARCH_URL)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.to_string()),
                ("max_results", max_results.to_string()),
                (
                    "tweet.fields",
                    "created_at,public_metrics,author_id".to_string(),
                ),
                ("media.fields", "url,preview_image_url".to_string()),
                (
                    "user.fields",
                    "name,profile_image_url,verified,verified_type,public_metrics".to_string(),
                ),
                ("expansions", "attachments.media_keys,author_id".to_string()),
            ])
            .send()
            .await?;

        if resp.status().as_u16() == 429 {
            warn!("twitter rate limit exceeded");
            return Ok(TweetsResponse::default());
        }
        let resp = resp.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Tool for TwitterSearchTool {
    fn name(&self) -> &str {
        "twitter_search"
    }

    fn description(&self) -> &str {
        "Search recent posts on the X platform for a query."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn call(&self, params: ToolParams) -> Result<serde_json::Value> {
        let query = params.get_str_opt("query").unwrap_or_default().to_string();
        let max_results = params.get_i64_opt("max_results").unwrap_or(MAX_RESULTS_DEFAULT);

        let tweets = self.fetch(&query, max_results).await?;
        let documents = build_documents(tweets);
        Ok(serde_json::to_value(documents)?)
    }
}

fn build_documents(tweets: TweetsResponse) -> Vec<SocialDocument> {
    let users: HashMap<&str, &TwitterUser> = tweets
        .includes
        .users
        .iter()
        .map(|u| (u.id.as_str(), u))
        .collect();
    let media: HashMap<&str, &TwitterMedia> = tweets
        .includes
        .media
        .iter()
        .map(|m| (m.media_key.as_str(), m))
        .collect();

    tweets
        .data
        .iter()
        .map(|tweet| {
            let author = tweet
                .author_id
                .as_deref()
                .and_then(|id| users.get(id).copied());
            let media_image_urls: Vec<String> = tweet
                .attachments
                .media_keys
                .iter()
                .filter_map(|key| media.get(key.as_str()))
                .filter_map(|m| m.preview_image_url.clone().or_else(|| m.url.clone()))
                .collect();

            let mut doc = SocialDocument {
                text: tweet.text.clone(),
                created_at: tweet.created_at.clone().unwrap_or_default(),
                username: author.map(|u| u.username.clone()).unwrap_or_default(),
                verified: author.map(|u| u.verified).unwrap_or(false),
                like_count: tweet.public_metrics.like_count,
                retweet_count: tweet.public_metrics.retweet_count,
                reply_count: tweet.public_metrics.reply_count,
                followers_count: author
                    .map(|u| u.public_metrics.followers_count)
                    .unwrap_or(0),
                media_image_urls,
                score: 0.0,
            };
            doc.score = relevance_score(&doc);
            doc
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct TweetsResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: TweetIncludes,
}

#[derive(Debug, Default, Deserialize)]
struct TweetIncludes {
    #[serde(default)]
    users: Vec<TwitterUser>,
    #[serde(default)]
    media: Vec<TwitterMedia>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    text: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    public_metrics: TweetMetrics,
    #[serde(default)]
    attachments: TweetAttachments,
}

#[derive(Debug, Default, Deserialize)]
struct TweetMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct TweetAttachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    public_metrics: UserMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetrics {
    #[serde(default)]
    followers_count: u64,
}

#[derive(Debug, Deserialize)]
struct TwitterMedia {
    media_key: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    preview_image_url: Option<String>,
}
