//! Data model shared by the content source, extractor, pipeline and ledger.
//!
//! `ContentNode` mirrors the node-tree JSON emitted for an article body:
//! `{"type": "ImageNode" | "TextNode" | ..., "url"?, "text"?, "children"?}`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque article identifier.
///
/// Numeric ids serialize as JSON numbers so ledgers of the form `[123, 456]` stay
/// readable by older tooling; anything else serializes as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ArticleId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for ArticleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_u64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ArticleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ArticleId::from(n),
            Raw::Text(s) => ArticleId(s),
        })
    }
}

/// Kind of a content node. Unknown type names deserialize as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "ImageNode")]
    Image,
    #[serde(rename = "TextNode")]
    Text,
    #[serde(other)]
    Other,
}

/// One element of an article body. Any kind may carry children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Image source; meaningful for `Image` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Text run; meaningful for `Text` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Image,
            url: Some(url.into()),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text,
            url: None,
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn container(children: Vec<ContentNode>) -> Self {
        Self {
            kind: NodeKind::Other,
            url: None,
            text: None,
            children,
        }
    }

    pub fn with_children(mut self, children: Vec<ContentNode>) -> Self {
        self.children = children;
        self
    }
}

/// Raw article as returned by a content source: title plus body tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub id: ArticleId,
    pub title: String,
    pub root: ContentNode,
}

/// Article after extraction: image URLs in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub title: String,
    pub images: Vec<String>,
}

/// A resolved reading list: display name and article ids in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingList {
    pub name: String,
    pub articles: Vec<ArticleId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn article_id_numeric_serializes_as_number() -> Result<(), Box<dyn Error>> {
        let ids = vec![ArticleId::from(123), ArticleId::new("cv-draft")];
        let json = serde_json::to_string(&ids)?;
        assert_eq!(json, r#"[123,"cv-draft"]"#);
        Ok(())
    }

    #[test]
    fn article_id_accepts_numbers_and_strings() -> Result<(), Box<dyn Error>> {
        let ids: Vec<ArticleId> = serde_json::from_str(r#"[123, "456", "abc"]"#)?;
        assert_eq!(
            ids,
            vec![
                ArticleId::new("123"),
                ArticleId::new("456"),
                ArticleId::new("abc")
            ]
        );
        Ok(())
    }

    #[test]
    fn article_id_with_leading_zero_stays_string() -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string(&ArticleId::new("007"))?;
        assert_eq!(json, r#""007""#);
        Ok(())
    }

    #[test]
    fn content_node_parses_node_tree_json() -> Result<(), Box<dyn Error>> {
        let json = r#"{
            "type": "Article",
            "children": [
                {"type": "ParagraphNode", "children": [
                    {"type": "TextNode", "text": "hello"}
                ]},
                {"type": "ImageNode", "url": "https://i0.hdslb.com/bfs/article/a.jpg", "alt": "x"}
            ]
        }"#;
        let root: ContentNode = serde_json::from_str(json)?;
        assert_eq!(root.kind, NodeKind::Other);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].kind, NodeKind::Other);
        assert_eq!(root.children[0].children[0].text.as_deref(), Some("hello"));
        assert_eq!(root.children[1].kind, NodeKind::Image);
        assert_eq!(
            root.children[1].url.as_deref(),
            Some("https://i0.hdslb.com/bfs/article/a.jpg")
        );
        Ok(())
    }

    #[test]
    fn text_node_without_text_field_parses() -> Result<(), Box<dyn Error>> {
        let node: ContentNode = serde_json::from_str(r#"{"type": "TextNode"}"#)?;
        assert_eq!(node.kind, NodeKind::Text);
        assert!(node.text.is_none());
        assert!(node.children.is_empty());
        Ok(())
    }
}
