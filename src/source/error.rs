//! Shared error type for the content source and HTTP fetches.

use crate::model::ArticleId;
use thiserror::Error;

/// Errors from resolving a reading list, fetching an article, or fetching image bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid reading list id '{input}'. Use the number after 'rl', e.g. 843588 for https://www.bilibili.com/read/readlist/rl843588")]
    InvalidListId { input: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "reading list", "article 123") for programmatic use.
        context: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("API returned code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Could not parse reading list: {message}")]
    ParseList { message: String },

    #[error("Could not parse article {id}: {message}")]
    ParseArticle { id: ArticleId, message: String },
}
