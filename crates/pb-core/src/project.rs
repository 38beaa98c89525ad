//! Rendering projection: page schema + selection + viewport → render tree.
//!
//! The projection is a pure function of its inputs. It mirrors the page
//! tree one-to-one and splits each node's properties into the keys its kind
//! renders and the keys it merely preserves.

use crate::id::NodeId;
use crate::model::{ComponentKind, PageSchema, Properties};
use serde::{Deserialize, Serialize};

// ─── Viewport & zoom ─────────────────────────────────────────────────────

/// Device width class of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportClass {
    /// Phone-sized canvas.
    Narrow,
    /// Tablet-sized canvas.
    Medium,
    /// Desktop canvas.
    #[default]
    Wide,
}

impl ViewportClass {
    /// Canvas width in CSS pixels at 100% zoom.
    pub fn width(self) -> f32 {
        match self {
            Self::Narrow => 375.0,
            Self::Medium => 768.0,
            Self::Wide => 1200.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "narrow" | "mobile" => Some(Self::Narrow),
            "medium" | "tablet" => Some(Self::Medium),
            "wide" | "desktop" => Some(Self::Wide),
            _ => None,
        }
    }
}

/// Canvas zoom as a whole percentage, kept within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u16")]
pub struct Zoom(u16);

impl Zoom {
    pub const MIN: u16 = 50;
    pub const MAX: u16 = 200;
    pub const STEP: u16 = 10;
    pub const DEFAULT: Zoom = Zoom(100);

    /// Clamp an arbitrary percentage into range.
    pub fn new(percent: u16) -> Self {
        Zoom(percent.clamp(Self::MIN, Self::MAX))
    }

    pub fn percent(self) -> u16 {
        self.0
    }

    pub fn factor(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    #[must_use]
    pub fn zoom_in(self) -> Self {
        Self::new(self.0.saturating_add(Self::STEP))
    }

    #[must_use]
    pub fn zoom_out(self) -> Self {
        Self::new(self.0.saturating_sub(Self::STEP))
    }

    #[must_use]
    pub fn reset() -> Self {
        Self::DEFAULT
    }
}

impl From<u16> for Zoom {
    fn from(percent: u16) -> Self {
        Self::new(percent)
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─── Render tree ─────────────────────────────────────────────────────────

/// Render-ready view of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTree {
    pub page_id: NodeId,
    pub page_name: String,
    pub viewport: ViewportClass,
    pub zoom: Zoom,
    /// Scaled canvas width: viewport width × zoom factor.
    pub canvas_width: f32,
    /// Whether the canvas draws its background grid.
    pub show_grid: bool,
    pub nodes: Vec<RenderNode>,
}

/// Render-ready view of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub kind: ComponentKind,
    /// Label shown above the component on the canvas.
    pub label: String,
    pub is_selected: bool,
    /// Properties the renderer interprets for this kind.
    pub rendered: Properties,
    /// Keys present on the node but ignored by the renderer.
    pub preserved_keys: Vec<String>,
    /// Unknown kinds render as a labelled placeholder.
    pub placeholder: bool,
    pub children: Vec<RenderNode>,
}

impl RenderTree {
    /// Total number of render nodes.
    pub fn len(&self) -> usize {
        fn count(nodes: &[RenderNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.nodes)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a render node by id (depth-first).
    pub fn find(&self, id: NodeId) -> Option<&RenderNode> {
        fn search(nodes: &[RenderNode], id: NodeId) -> Option<&RenderNode> {
            nodes
                .iter()
                .find_map(|n| if n.id == id { Some(n) } else { search(&n.children, id) })
        }
        search(&self.nodes, id)
    }

    /// Ids of selected nodes. At most one for a consistent selection.
    pub fn selected_ids(&self) -> Vec<NodeId> {
        fn collect(nodes: &[RenderNode], out: &mut Vec<NodeId>) {
            for n in nodes {
                if n.is_selected {
                    out.push(n.id);
                }
                collect(&n.children, out);
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }
}

/// Project a page for a viewport and zoom, marking `selected`. The grid is
/// on; callers that track a grid toggle overwrite `show_grid`.
#[must_use]
pub fn project(
    schema: &PageSchema,
    selected: Option<NodeId>,
    viewport: ViewportClass,
    zoom: Zoom,
) -> RenderTree {
    RenderTree {
        page_id: schema.id,
        page_name: schema.name.clone(),
        viewport,
        zoom,
        canvas_width: viewport.width() * zoom.factor(),
        show_grid: true,
        nodes: project_children(schema, None, selected),
    }
}

fn project_children(
    schema: &PageSchema,
    parent: Option<NodeId>,
    selected: Option<NodeId>,
) -> Vec<RenderNode> {
    schema
        .children(parent)
        .into_iter()
        .filter_map(|id| {
            let node = schema.find_node(id)?;
            let mut rendered = Properties::new();
            let mut preserved_keys = Vec::new();
            for (key, value) in &node.properties {
                if node.kind.interprets(key) {
                    rendered.insert(key.clone(), value.clone());
                } else {
                    preserved_keys.push(key.clone());
                }
            }
            log::trace!(
                "PROJECT {} {} rendered={} preserved={}",
                node.kind,
                id,
                rendered.len(),
                preserved_keys.len()
            );
            Some(RenderNode {
                id,
                kind: node.kind.clone(),
                label: node.kind.label().to_string(),
                is_selected: selected == Some(id),
                rendered,
                preserved_keys,
                placeholder: !node.kind.is_known(),
                children: project_children(schema, Some(id), selected),
            })
        })
        .collect()
}
