//! The rich-content document edited in the dashboard.
//!
//! A [`Document`] is a plain value: an ordered list of block [`Node`]s and a
//! cursor. It is stored as JSON in the article row and rendered to HTML for
//! the public site. Nothing here performs I/O.

use crate::media::UploadedAsset;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Locally generated token linking a placeholder to its upload result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        CorrelationId(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The media host's handle for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        AssetId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

impl Align {
    fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// A finalized embed of a hosted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaNode {
    pub url: String,
    pub asset_id: AssetId,
    /// Declared display width in pixels.
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub align: Align,
    #[serde(default = "default_size_percent")]
    pub size_percent: u8,
}

fn default_size_percent() -> u8 {
    100
}

impl MediaNode {
    pub fn from_upload(asset: &UploadedAsset) -> Self {
        MediaNode {
            url: asset.url.clone(),
            asset_id: asset.asset_id.clone(),
            width: asset.width,
            height: asset.height,
            align: Align::default(),
            size_percent: default_size_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Paragraph { text: String },
    Heading { level: u8, text: String },
    /// Non-editable marker for an upload in flight.
    Placeholder { correlation_id: CorrelationId },
    Media(MediaNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<Node>,
    /// Insertion point, as an index between nodes (`0..=nodes.len()`).
    #[serde(default)]
    cursor: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document with the cursor at the end.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let cursor = nodes.len();
        Document { nodes, cursor }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.nodes.len());
    }

    /// Insert at the cursor and move the cursor past the new node.
    pub fn insert_at_cursor(&mut self, node: Node) -> usize {
        let idx = self.cursor.min(self.nodes.len());
        self.nodes.insert(idx, node);
        self.cursor = idx + 1;
        idx
    }

    pub fn replace(&mut self, idx: usize, node: Node) -> Option<Node> {
        let slot = self.nodes.get_mut(idx)?;
        Some(std::mem::replace(slot, node))
    }

    /// Remove the node at `idx`, keeping the cursor on the same neighbour.
    pub fn remove(&mut self, idx: usize) -> Option<Node> {
        if idx >= self.nodes.len() {
            return None;
        }
        let node = self.nodes.remove(idx);
        if self.cursor > idx {
            self.cursor -= 1;
        }
        Some(node)
    }

    pub fn placeholder_index(&self, id: &CorrelationId) -> Option<usize> {
        self.nodes.iter().position(
            |n| matches!(n, Node::Placeholder { correlation_id } if correlation_id == id),
        )
    }

    pub fn media(&self) -> impl Iterator<Item = &MediaNode> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Media(m) => Some(m),
            _ => None,
        })
    }

    pub fn asset_ids(&self) -> BTreeSet<AssetId> {
        self.media().map(|m| m.asset_id.clone()).collect()
    }

    pub fn references(&self, asset: &AssetId) -> usize {
        self.media().filter(|m| &m.asset_id == asset).count()
    }

    /// Reject documents a client could not have produced through the editor.
    pub fn validate(&self) -> Result<(), String> {
        if self.cursor > self.nodes.len() {
            return Err(format!(
                "cursor {} is past the end of a {}-node document",
                self.cursor,
                self.nodes.len()
            ));
        }
        let mut seen = BTreeSet::new();
        for node in &self.nodes {
            match node {
                Node::Heading { level, .. } if !(1..=6).contains(level) => {
                    return Err(format!("heading level {level} is out of range"));
                }
                Node::Media(m) if m.size_percent == 0 || m.size_percent > 100 => {
                    return Err(format!("size {}% is out of range", m.size_percent));
                }
                Node::Media(m) if m.asset_id.0.is_empty() => {
                    return Err("media node without an asset id".to_string());
                }
                Node::Placeholder { correlation_id } if !seen.insert(*correlation_id) => {
                    return Err(format!("duplicate placeholder {correlation_id}"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Paragraph { text } => {
                    out.push_str("<p>");
                    out.push_str(&escape(text));
                    out.push_str("</p>");
                }
                Node::Heading { level, text } => {
                    let level = (*level).clamp(1, 6);
                    out.push_str(&format!("<h{level}>{}</h{level}>", escape(text)));
                }
                Node::Placeholder { correlation_id } => {
                    out.push_str(&format!(
                        "<span contenteditable=\"false\" data-uploading=\"true\" data-correlation-id=\"{correlation_id}\"></span>"
                    ));
                }
                Node::Media(m) => {
                    out.push_str(&format!(
                        "<figure class=\"align-{}\" style=\"width:{}%\"><img src=\"{}\" data-asset-id=\"{}\" width=\"{}\" height=\"{}\" alt=\"\"></figure>",
                        m.align.as_str(),
                        m.size_percent,
                        escape(&m.url),
                        escape(m.asset_id.as_str()),
                        m.width,
                        m.height,
                    ));
                }
            }
        }
        out
    }
}

/// Asset ids referenced by `prev` that `next` no longer references at all.
pub fn removed_assets(prev: &Document, next: &Document) -> Vec<AssetId> {
    let still = next.asset_ids();
    prev.asset_ids()
        .into_iter()
        .filter(|id| !still.contains(id))
        .collect()
}

fn escape(s: &str) -> Cow<'_, str> {
    const SPECIAL: [char; 5] = ['<', '>', '&', '"', '\''];
    if !s.contains(SPECIAL) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> Node {
        Node::Paragraph {
            text: text.to_string(),
        }
    }

    fn image(id: &str) -> Node {
        Node::Media(MediaNode {
            url: format!("/asset/{id}"),
            asset_id: AssetId::from(id),
            width: 640,
            height: 480,
            align: Align::Center,
            size_percent: 100,
        })
    }

    #[test]
    fn insert_moves_cursor_and_remove_restores_it() {
        let mut doc = Document::from_nodes(vec![para("a"), para("b")]);
        doc.set_cursor(1);
        let before = doc.clone();

        let idx = doc.insert_at_cursor(image("x"));
        assert_eq!(idx, 1);
        assert_eq!(doc.cursor(), 2);

        doc.remove(idx);
        assert_eq!(doc, before);
    }

    #[test]
    fn cursor_is_clamped() {
        let mut doc = Document::from_nodes(vec![para("a")]);
        doc.set_cursor(99);
        assert_eq!(doc.cursor(), 1);
    }

    #[test]
    fn removed_assets_ignores_surviving_duplicates() {
        let prev = Document::from_nodes(vec![image("x"), para("t"), image("x"), image("y")]);
        let next = Document::from_nodes(vec![image("x"), para("t")]);
        assert_eq!(removed_assets(&prev, &next), vec![AssetId::from("y")]);
    }

    #[test]
    fn html_is_escaped() {
        let doc = Document::from_nodes(vec![
            Node::Heading {
                level: 2,
                text: "Q&A".into(),
            },
            para("<script>alert('x')</script>"),
        ]);
        assert_eq!(
            doc.to_html(),
            "<h2>Q&amp;A</h2><p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn json_shape_is_tagged() {
        let doc = Document::from_nodes(vec![para("halo"), image("a1")]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["nodes"][0]["type"], "paragraph");
        assert_eq!(json["nodes"][1]["type"], "media");
        assert_eq!(json["nodes"][1]["asset_id"], "a1");
        assert_eq!(json["cursor"], 2);

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn validate_rejects_bad_nodes() {
        let doc = Document::from_nodes(vec![Node::Heading {
            level: 9,
            text: "x".into(),
        }]);
        assert!(doc.validate().is_err());

        let id = CorrelationId::new();
        let doc = Document::from_nodes(vec![
            Node::Placeholder { correlation_id: id },
            Node::Placeholder { correlation_id: id },
        ]);
        assert!(doc.validate().is_err());

        let doc = Document::from_nodes(vec![para("ok"), image("a")]);
        assert!(doc.validate().is_ok());
    }
}
