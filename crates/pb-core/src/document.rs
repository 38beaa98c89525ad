//! Serializable page documents.
//!
//! A document is the nested `{id, kind, properties, children}` shape of a
//! page. It is untrusted: `PageSchema::from_document` re-validates the id
//! invariants before a document becomes a live page. JSON field aliases
//! (`type`, `props`) accept the builder's legacy component format.

use crate::error::EditError;
use crate::id::NodeId;
use crate::model::{ComponentKind, PageSchema, PropValue, Properties};
use serde::{Deserialize, Serialize};

/// Errors loading or saving a page document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid JSON page document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid MessagePack page document: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("could not encode page document: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error(transparent)]
    Invalid(#[from] EditError),
}

/// A page as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentTree>,
}

/// A component and its owned children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTree {
    pub id: NodeId,
    #[serde(alias = "type")]
    pub kind: ComponentKind,
    #[serde(default, alias = "props")]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComponentTree>,
}

impl ComponentTree {
    pub fn leaf(id: NodeId, kind: ComponentKind, properties: Properties) -> Self {
        Self {
            id,
            kind,
            properties,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, root included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ComponentTree::len).sum::<usize>()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append every id in this subtree, pre-order.
    pub fn collect_ids(&self, out: &mut Vec<NodeId>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

impl PageDocument {
    /// The page a new builder session starts with.
    pub fn starter() -> Self {
        let mut header = Properties::new();
        header.insert("title".into(), PropValue::from("Welcome to Page Builder"));
        header.insert(
            "subtitle".into(),
            PropValue::from("Create beautiful pages with AI"),
        );
        let mut content = Properties::new();
        content.insert(
            "content".into(),
            PropValue::from("This is a sample content section. Select it to edit properties."),
        );

        Self {
            id: NodeId::intern("default-page"),
            name: "Untitled Page".into(),
            components: vec![
                ComponentTree::leaf(NodeId::intern("header-1"), ComponentKind::Header, header),
                ComponentTree::leaf(
                    NodeId::intern("content-1"),
                    ComponentKind::ContentSection,
                    content,
                ),
            ],
        }
    }

    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, DocumentError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Total number of components in the document.
    pub fn node_count(&self) -> usize {
        self.components.iter().map(ComponentTree::len).sum()
    }
}

/// Parse and validate a JSON page in one step.
pub fn load_page_json(text: &str) -> Result<PageSchema, DocumentError> {
    let doc = PageDocument::from_json(text)?;
    Ok(PageSchema::from_document(doc)?)
}
