//! Image URL extraction from an article's content-node tree.
//!
//! Output order is page order in the archive: depth-first, pre-order, a node's own
//! URLs before those of its children.

use crate::model::{ArticleContent, ArticleRecord, ContentNode, NodeKind};
use regex::Regex;
use std::sync::LazyLock;

/// Only images served from this CDN are collected.
pub const CDN_PREFIX: &str = "https://i0.hdslb.com";

/// CDN URLs embedded in text, ending at whitespace or a double quote.
static TEXT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"{}[^\s"]+"#, regex::escape(CDN_PREFIX)))
        .expect("CDN pattern is a valid regex")
});

/// Collect image URLs from the children of `root` (the root itself is not inspected).
pub fn extract_images(root: &ContentNode) -> Vec<String> {
    let mut images = Vec::new();
    walk(&root.children, &mut images);
    images
}

fn walk(nodes: &[ContentNode], images: &mut Vec<String>) {
    for node in nodes {
        match node.kind {
            NodeKind::Image => {
                if let Some(url) = node.url.as_deref().filter(|u| u.starts_with(CDN_PREFIX)) {
                    images.push(url.to_string());
                }
            }
            NodeKind::Text => {
                if let Some(text) = node.text.as_deref() {
                    images.extend(TEXT_URL.find_iter(text).map(|m| m.as_str().to_string()));
                }
            }
            NodeKind::Other => {}
        }
        walk(&node.children, images);
    }
}

/// Run extraction over a fetched article.
pub fn to_record(article: &ArticleContent) -> ArticleRecord {
    ArticleRecord {
        id: article.id.clone(),
        title: article.title.clone(),
        images: extract_images(&article.root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdn(name: &str) -> String {
        format!("{}/bfs/article/{}", CDN_PREFIX, name)
    }

    #[test]
    fn collects_image_nodes_in_preorder() {
        let root = ContentNode::container(vec![
            ContentNode::image(cdn("1.jpg")),
            ContentNode::container(vec![
                ContentNode::image(cdn("2.jpg")),
                ContentNode::container(vec![ContentNode::image(cdn("3.jpg"))]),
            ]),
            ContentNode::image(cdn("4.jpg")),
        ]);
        assert_eq!(
            extract_images(&root),
            vec![cdn("1.jpg"), cdn("2.jpg"), cdn("3.jpg"), cdn("4.jpg")]
        );
    }

    #[test]
    fn root_node_itself_is_not_inspected() {
        let root = ContentNode::image(cdn("root.jpg"))
            .with_children(vec![ContentNode::image(cdn("child.jpg"))]);
        assert_eq!(extract_images(&root), vec![cdn("child.jpg")]);
    }

    #[test]
    fn foreign_image_urls_are_dropped() {
        let root = ContentNode::container(vec![
            ContentNode::image("https://example.com/a.jpg"),
            ContentNode::image(cdn("ok.jpg")),
            ContentNode::image("http://i0.hdslb.com/insecure.jpg"),
        ]);
        assert_eq!(extract_images(&root), vec![cdn("ok.jpg")]);
    }

    #[test]
    fn text_urls_left_to_right_until_space_or_quote() {
        let text = format!(
            r#"see {} and <img src="{}"> then {}"#,
            cdn("a.jpg"),
            cdn("b.png"),
            cdn("c.webp")
        );
        let root = ContentNode::container(vec![ContentNode::text(text)]);
        assert_eq!(
            extract_images(&root),
            vec![cdn("a.jpg"), cdn("b.png"), cdn("c.webp")]
        );
    }

    #[test]
    fn text_without_cdn_urls_contributes_nothing() {
        let root = ContentNode::container(vec![ContentNode::text(
            "https://example.com/x.jpg and i0.hdslb.com/no-scheme.jpg",
        )]);
        assert!(extract_images(&root).is_empty());
    }

    #[test]
    fn text_node_missing_text_is_skipped() {
        let mut node = ContentNode::text("");
        node.text = None;
        let root = ContentNode::container(vec![node, ContentNode::image(cdn("x.jpg"))]);
        assert_eq!(extract_images(&root), vec![cdn("x.jpg")]);
    }

    #[test]
    fn descends_into_children_of_image_and_text_nodes() {
        let root = ContentNode::container(vec![
            ContentNode::image(cdn("parent.jpg"))
                .with_children(vec![ContentNode::image(cdn("under-image.jpg"))]),
            ContentNode::text(format!("inline {}", cdn("text.jpg")))
                .with_children(vec![ContentNode::image(cdn("under-text.jpg"))]),
        ]);
        assert_eq!(
            extract_images(&root),
            vec![
                cdn("parent.jpg"),
                cdn("under-image.jpg"),
                cdn("text.jpg"),
                cdn("under-text.jpg"),
            ]
        );
    }

    #[test]
    fn image_node_without_url_still_descends() {
        let mut node = ContentNode::image("");
        node.url = None;
        let root =
            ContentNode::container(vec![node.with_children(vec![ContentNode::image(cdn("k.jpg"))])]);
        assert_eq!(extract_images(&root), vec![cdn("k.jpg")]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let root = ContentNode::container(vec![
            ContentNode::text(format!("{} {}", cdn("a.jpg"), cdn("b.jpg"))),
            ContentNode::container(vec![ContentNode::image(cdn("c.jpg"))]),
        ]);
        let first = extract_images(&root);
        let second = extract_images(&root);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        assert!(extract_images(&ContentNode::container(Vec::new())).is_empty());
    }
}
