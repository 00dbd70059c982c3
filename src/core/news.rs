//! Company news headlines

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::FetchResult;

/// One cached news fetch as stored in the JSON cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEntry {
    #[serde(rename = "Fetched")]
    pub fetched: NaiveDate,
    #[serde(rename = "News")]
    pub news: Value,
}

/// Display view of a single headline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub source: String,
    pub timestamp: String,
    pub summary: String,
}

fn text_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl NewsEntry {
    /// Headlines found in the payload. Anything that is not a list of
    /// titled objects yields nothing.
    pub fn items(&self) -> Vec<NewsItem> {
        self.news
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.get("title").is_some())
                    .map(|item| NewsItem {
                        title: text_field(item, "title"),
                        url: text_field(item, "url"),
                        source: text_field(item, "source"),
                        timestamp: text_field(item, "timestamp"),
                        summary: text_field(item, "summary"),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Raw payload of the latest headlines for `symbol`.
    async fn fetch_news(&self, symbol: &str) -> FetchResult<Value>;
}
