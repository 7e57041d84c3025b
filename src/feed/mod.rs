pub mod fetcher;
pub mod parser;
pub mod retry;

use serde::{Deserialize, Serialize};

/// A feed reduced to the fields clients consume. This is the only form that
/// gets written to the cache; the raw document is dropped after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedFeed {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub items: Vec<Article>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub link: String,
    /// RFC 3339, empty when the source carries no date.
    #[serde(rename = "PublishedParsed", default)]
    pub published_at: String,
    #[serde(rename = "URL", default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Author {
    #[serde(default)]
    pub name: String,
}

impl NormalizedFeed {
    pub fn article(&self, index: usize) -> Option<&Article> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Article {
    /// Appends a category unless it is already present.
    pub fn add_category(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !self.categories.contains(&term) {
            self.categories.push(term);
        }
    }
}

/// Outcome of one fetch-and-persist unit of a refresh pass.
#[derive(Debug, Clone)]
pub struct FeedResult {
    pub feed_name: String,
    pub success: bool,
    pub error: Option<String>,
    pub articles: usize,
}

impl FeedResult {
    pub fn ok(feed_name: &str, articles: usize) -> Self {
        Self {
            feed_name: feed_name.to_string(),
            success: true,
            error: None,
            articles,
        }
    }

    pub fn failed(feed_name: &str, error: String) -> Self {
        Self {
            feed_name: feed_name.to_string(),
            success: false,
            error: Some(error),
            articles: 0,
        }
    }
}
