use crate::feed::{Article, Author, NormalizedFeed};
use crate::error::{Error, Result};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser as feed_parser;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed<R: BufRead>(&self, reader: R) -> Result<NormalizedFeed> {
        let feed = feed_parser::parse(reader)
            .map_err(|e| Error::FeedParse(format!("Failed to parse feed: {}", e)))?;

        Ok(normalize(feed))
    }

    pub fn parse_str(&self, body: &str) -> Result<NormalizedFeed> {
        self.parse_feed(body.as_bytes())
    }

    pub fn validate_feed_url(&self, url: &str) -> Result<()> {
        let parsed_url = url::Url::parse(url)
            .map_err(|e| Error::InvalidUrl(format!("Invalid URL: {}", e)))?;

        match parsed_url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(Error::InvalidUrl(format!("Unsupported scheme: {}", scheme))),
        }
    }
}

fn normalize(feed: Feed) -> NormalizedFeed {
    NormalizedFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        description: feed.description.map(|d| d.content).unwrap_or_default(),
        link: feed.links.first().map(|l| l.href.clone()).unwrap_or_default(),
        items: feed.entries.into_iter().map(normalize_entry).collect(),
    }
}

fn normalize_entry(entry: Entry) -> Article {
    // Enclosures land in `media` for RSS and as rel="enclosure" links for Atom.
    let url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
        .or_else(|| {
            entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("enclosure"))
                .map(|l| l.href.clone())
        })
        .unwrap_or_default();

    let mut article = Article {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        description: entry.summary.map(|s| s.content).unwrap_or_default(),
        content: entry.content.and_then(|c| c.body).unwrap_or_default(),
        author: Author {
            name: entry.authors.first().map(|a| a.name.clone()).unwrap_or_default(),
        },
        categories: Vec::with_capacity(entry.categories.len()),
        link: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
        published_at: entry
            .published
            .or(entry.updated)
            .map(|d| d.to_rfc3339())
            .unwrap_or_default(),
        url,
    };

    for category in entry.categories {
        article.add_category(category.term);
    }

    article
}
