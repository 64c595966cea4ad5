//! Content source: reading-list resolution and article fetching, plus the shared HTTP client.

mod client;
mod error;

pub mod bilibili;

pub use client::{HttpClient, HttpClientBuilder};
pub use error::SourceError;

use crate::model::{ArticleContent, ArticleId, ReadingList};

/// Remote content API consumed by the pipeline.
///
/// Implemented by [BilibiliSource](bilibili::BilibiliSource); tests substitute in-memory fakes.
pub trait ContentSource {
    /// Resolve a reading list into its name and ordered article ids.
    fn resolve_list(&mut self, list_id: &str) -> Result<ReadingList, SourceError>;

    /// Fetch one article's title and content-node tree.
    fn fetch_article(&mut self, id: &ArticleId) -> Result<ArticleContent, SourceError>;
}

/// Normalize a reading-list id given as `843588`, `rl843588`, or a readlist URL.
pub fn parse_list_id(input: &str) -> Result<String, SourceError> {
    let invalid = || SourceError::InvalidListId {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let last = without_query.rsplit('/').next().unwrap_or(without_query);
    let digits = last
        .strip_prefix("rl")
        .or_else(|| last.strip_prefix("RL"))
        .unwrap_or(last);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok(digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_id_plain_number() -> Result<(), SourceError> {
        assert_eq!(parse_list_id("843588")?, "843588");
        assert_eq!(parse_list_id("  843588 ")?, "843588");
        Ok(())
    }

    #[test]
    fn list_id_with_rl_prefix() -> Result<(), SourceError> {
        assert_eq!(parse_list_id("rl843588")?, "843588");
        Ok(())
    }

    #[test]
    fn list_id_from_readlist_url() -> Result<(), SourceError> {
        assert_eq!(
            parse_list_id("https://www.bilibili.com/read/readlist/rl843588")?,
            "843588"
        );
        assert_eq!(
            parse_list_id("https://www.bilibili.com/read/readlist/rl843588/?spm_id_from=333")?,
            "843588"
        );
        Ok(())
    }

    #[test]
    fn list_id_rejects_garbage() -> Result<(), String> {
        for input in ["", "rl", "abc", "https://www.bilibili.com/read/cv123x"] {
            match parse_list_id(input) {
                Err(SourceError::InvalidListId { input: got }) if got == input => {}
                other => return Err(format!("expected InvalidListId for {:?}, got {:?}", input, other)),
            }
        }
        Ok(())
    }
}
