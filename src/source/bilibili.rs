//! Bilibili adapter. Resolves a read list via the web API, then fetches each article page
//! and turns the embedded body HTML into a content-node tree.

use crate::model::{ArticleContent, ArticleId, ContentNode, ReadingList};
use crate::source::{ContentSource, HttpClient, SourceError};
use scraper::{ElementRef, Html};
use serde::Deserialize;

const LIST_API: &str = "https://api.bilibili.com/x/article/list/web/articles";
const ARTICLE_PAGE: &str = "https://www.bilibili.com/read/cv";
const INITIAL_STATE_MARKER: &str = "window.__INITIAL_STATE__=";

/// Bilibili content source. Owns a clone of the shared HTTP client.
pub struct BilibiliSource {
    client: HttpClient,
}

/// Common `{code, message, data}` envelope of the web API.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    list: ListMeta,
    #[serde(default)]
    articles: Vec<ListArticle>,
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListArticle {
    id: ArticleId,
}

/// Parse the list API response. Article order is preserved.
fn parse_list_response(json: &str) -> Result<ReadingList, SourceError> {
    let envelope: ApiEnvelope<ListData> =
        serde_json::from_str(json).map_err(|e| SourceError::ParseList {
            message: e.to_string(),
        })?;
    if envelope.code != 0 {
        return Err(SourceError::Api {
            code: envelope.code,
            message: envelope.message,
        });
    }
    let data = envelope.data.ok_or_else(|| SourceError::ParseList {
        message: "response has no data".to_string(),
    })?;
    Ok(ReadingList {
        name: data.list.name,
        articles: data.articles.into_iter().map(|a| a.id).collect(),
    })
}

/// Pull the `window.__INITIAL_STATE__` object out of an article page.
fn extract_initial_state(html: &str, id: &ArticleId) -> Result<serde_json::Value, SourceError> {
    let start = html
        .find(INITIAL_STATE_MARKER)
        .map(|i| i + INITIAL_STATE_MARKER.len())
        .ok_or_else(|| SourceError::ParseArticle {
            id: id.clone(),
            message: "page has no initial state".to_string(),
        })?;
    // The object is followed by `;(function(){...` so only the first JSON value is read.
    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<serde_json::Value>()
        .next()
        .unwrap_or_else(|| Err(serde::de::Error::custom("empty initial state")))
        .map_err(|e| SourceError::ParseArticle {
            id: id.clone(),
            message: format!("invalid initial state: {}", e),
        })
}

/// Parse an article page into title and content tree.
fn parse_article_page(html: &str, id: &ArticleId) -> Result<ArticleContent, SourceError> {
    let state = extract_initial_state(html, id)?;
    let read_info = state
        .get("readInfo")
        .ok_or_else(|| SourceError::ParseArticle {
            id: id.clone(),
            message: "initial state has no readInfo".to_string(),
        })?;
    let title = read_info
        .get("title")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("cv{}", id));
    let content = read_info
        .get("content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| SourceError::ParseArticle {
            id: id.clone(),
            message: "article has no content".to_string(),
        })?;
    Ok(ArticleContent {
        id: id.clone(),
        title,
        root: html_to_tree(content),
    })
}

/// Convert article body HTML into a content-node tree rooted at a container.
pub fn html_to_tree(html: &str) -> ContentNode {
    let fragment = Html::parse_fragment(html);
    ContentNode::container(element_children(fragment.root_element()))
}

fn element_children(element: ElementRef<'_>) -> Vec<ContentNode> {
    let mut nodes = Vec::new();
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            nodes.push(element_to_node(el));
        } else if let Some(text) = child.value().as_text() {
            if !text.trim().is_empty() {
                nodes.push(ContentNode::text(&**text));
            }
        }
    }
    nodes
}

fn element_to_node(el: ElementRef<'_>) -> ContentNode {
    if el.value().name().eq_ignore_ascii_case("img") {
        let src = el
            .value()
            .attr("data-src")
            .or_else(|| el.value().attr("src"))
            .map(normalize_image_url);
        let mut node = ContentNode::image(String::new()).with_children(element_children(el));
        node.url = src;
        return node;
    }
    ContentNode::container(element_children(el))
}

/// Protocol-relative `//host/path` becomes `https://host/path`.
fn normalize_image_url(src: &str) -> String {
    let src = src.trim();
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => src.to_string(),
    }
}

impl BilibiliSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl ContentSource for BilibiliSource {
    fn resolve_list(&mut self, list_id: &str) -> Result<ReadingList, SourceError> {
        let url = format!("{}?id={}", LIST_API, list_id);
        let body = self.client.get_text(&url, "reading list")?;
        parse_list_response(&body)
    }

    fn fetch_article(&mut self, id: &ArticleId) -> Result<ArticleContent, SourceError> {
        let url = format!("{}{}", ARTICLE_PAGE, id);
        let html = self.client.get_text(&url, &format!("article {}", id))?;
        parse_article_page(&html, id)
    }
}
