//! Core page-schema data model.
//!
//! A page is a tree of component nodes. Nodes live in a `StableDiGraph`
//! with parent → child edges; the render order of each child list is kept
//! explicitly, so insertion at an index is cheap and deterministic. An id
//! index maps every `NodeId` to its graph slot.
//!
//! All mutating operations validate first and mutate second: a failed edit
//! leaves the page exactly as it was.

use crate::document::{ComponentTree, PageDocument};
use crate::error::EditError;
use crate::id::NodeId;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

// ─── Property values ─────────────────────────────────────────────────────

/// Attribute map of a component. Ordered so projections are deterministic.
pub type Properties = BTreeMap<String, PropValue>;

/// A single attribute value.
///
/// Composite attributes (per-side padding, margins) are nested maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Map(Properties),
}

impl PropValue {
    /// Coerce raw inspector input: `true`/`false` become booleans, finite
    /// numerics become numbers, anything else stays text.
    pub fn parse_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "true" => return PropValue::Bool(true),
            "false" => return PropValue::Bool(false),
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && !trimmed.is_empty() => PropValue::Number(n),
            _ => PropValue::Text(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Properties> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Number(n) => write!(f, "{n}"),
            PropValue::Text(s) => write!(f, "{s:?}"),
            PropValue::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Text(s)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Number(n)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

/// Split a property key into path segments (`padding.top` → `["padding", "top"]`).
fn key_path(key: &str) -> Result<Vec<&str>, EditError> {
    if key.trim().is_empty() {
        return Err(EditError::InvalidIntent("property key is empty".into()));
    }
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(EditError::InvalidIntent(format!(
            "property key `{key}` has an empty segment"
        )));
    }
    Ok(segments)
}

/// Read a value by dotted key.
pub fn lookup_path<'a>(props: &'a Properties, key: &str) -> Option<&'a PropValue> {
    let mut segments = key.split('.');
    let mut current = props.get(segments.next()?)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Write a value by dotted key, creating intermediate maps.
/// Returns the previous value at the key.
fn assign_path(
    props: &mut Properties,
    key: &str,
    value: PropValue,
) -> Result<Option<PropValue>, EditError> {
    let segments = key_path(key)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| EditError::InvalidIntent("property key is empty".into()))?;

    // Check the whole path before touching anything.
    let mut cursor = Some(&*props);
    for (depth, segment) in parents.iter().enumerate() {
        let Some(map) = cursor else { break };
        cursor = match map.get(*segment) {
            None => None,
            Some(PropValue::Map(inner)) => Some(inner),
            Some(_) => {
                return Err(EditError::InvalidIntent(format!(
                    "`{}` is not a composite property",
                    segments[..=depth].join(".")
                )));
            }
        };
    }

    let mut map = props;
    for segment in parents {
        let slot = map
            .entry((*segment).to_string())
            .or_insert_with(|| PropValue::Map(Properties::new()));
        map = match slot {
            PropValue::Map(inner) => inner,
            _ => {
                return Err(EditError::InvalidIntent(format!(
                    "`{segment}` is not a composite property"
                )));
            }
        };
    }
    Ok(map.insert((*last).to_string(), value))
}

// ─── Component kinds ─────────────────────────────────────────────────────

/// The renderable component variants.
///
/// Known kinds are exhaustively matched by the renderer; any other tag is
/// preserved verbatim in `Unknown` and rendered as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Header,
    ContentSection,
    Section,
    Container,
    Grid,
    Heading,
    Paragraph,
    Button,
    Image,
    Video,
    Carousel,
    Input,
    Textarea,
    ContactForm,
    Hero,
    Features,
    Testimonials,
    Pricing,
    Footer,
    Unknown(String),
}

/// Keys every kind understands (inspector style/layout tabs).
pub const COMMON_KEYS: &[&str] = &[
    "fontSize",
    "fontWeight",
    "textColor",
    "backgroundColor",
    "borderRadius",
    "width",
    "height",
    "padding",
    "margin",
    "flexbox",
    "flexDirection",
    "justifyContent",
    "clickable",
    "linkUrl",
    "className",
];

impl ComponentKind {
    /// All known kinds, in library order.
    pub const KNOWN: [ComponentKind; 19] = [
        ComponentKind::Header,
        ComponentKind::ContentSection,
        ComponentKind::Section,
        ComponentKind::Container,
        ComponentKind::Grid,
        ComponentKind::Heading,
        ComponentKind::Paragraph,
        ComponentKind::Button,
        ComponentKind::Image,
        ComponentKind::Video,
        ComponentKind::Carousel,
        ComponentKind::Input,
        ComponentKind::Textarea,
        ComponentKind::ContactForm,
        ComponentKind::Hero,
        ComponentKind::Features,
        ComponentKind::Testimonials,
        ComponentKind::Pricing,
        ComponentKind::Footer,
    ];

    /// Parse a kind tag. Matching ignores case, spaces, `-` and `_`,
    /// so `ContactForm`, `contact-form` and `Contact Form` agree.
    pub fn parse(tag: &str) -> Self {
        let norm: String = tag
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match norm.as_str() {
            "header" => Self::Header,
            "contentsection" | "content" => Self::ContentSection,
            "section" => Self::Section,
            "container" => Self::Container,
            "grid" => Self::Grid,
            "heading" => Self::Heading,
            "paragraph" => Self::Paragraph,
            "button" => Self::Button,
            "image" => Self::Image,
            "video" => Self::Video,
            "carousel" => Self::Carousel,
            "input" => Self::Input,
            "textarea" => Self::Textarea,
            "contactform" => Self::ContactForm,
            "hero" | "herosection" => Self::Hero,
            "features" | "featuresgrid" => Self::Features,
            "testimonials" => Self::Testimonials,
            "pricing" | "pricingtable" => Self::Pricing,
            "footer" => Self::Footer,
            _ => Self::Unknown(tag.to_string()),
        }
    }

    /// Canonical tag, as stored in page documents.
    pub fn name(&self) -> &str {
        match self {
            Self::Header => "Header",
            Self::ContentSection => "ContentSection",
            Self::Section => "Section",
            Self::Container => "Container",
            Self::Grid => "Grid",
            Self::Heading => "Heading",
            Self::Paragraph => "Paragraph",
            Self::Button => "Button",
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Carousel => "Carousel",
            Self::Input => "Input",
            Self::Textarea => "Textarea",
            Self::ContactForm => "ContactForm",
            Self::Hero => "Hero",
            Self::Features => "Features",
            Self::Testimonials => "Testimonials",
            Self::Pricing => "Pricing",
            Self::Footer => "Footer",
            Self::Unknown(tag) => tag,
        }
    }

    /// Human-readable label shown on the canvas.
    pub fn label(&self) -> &str {
        match self {
            Self::ContentSection => "Content Section",
            Self::ContactForm => "Contact Form",
            Self::Hero => "Hero Section",
            Self::Features => "Features Grid",
            Self::Pricing => "Pricing Table",
            other => other.name(),
        }
    }

    /// Prefix for generated ids (`contact-form-2`).
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        for (i, c) in self.name().chars().enumerate() {
            if c.is_uppercase() && i > 0 && !slug.ends_with('-') {
                slug.push('-');
            }
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-').to_string();
        if slug.is_empty() {
            "component".to_string()
        } else {
            slug
        }
    }

    /// Content keys this kind renders, in addition to `COMMON_KEYS`.
    pub fn content_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Header | Self::Hero => &["title", "subtitle", "ctaLabel", "ctaUrl"],
            Self::ContentSection => &["content"],
            Self::Section | Self::Container | Self::Grid => &["columns", "gap", "maxWidth"],
            Self::Heading => &["text", "level"],
            Self::Paragraph => &["text"],
            Self::Button => &["label", "href", "variant"],
            Self::Image => &["src", "alt"],
            Self::Video => &["src", "autoplay", "controls"],
            Self::Carousel => &["slides", "interval"],
            Self::Input | Self::Textarea => &["label", "placeholder", "name", "required"],
            Self::ContactForm => &["title", "submitLabel", "fields"],
            Self::Features => &["title", "items", "columns"],
            Self::Testimonials => &["title", "quotes"],
            Self::Pricing => &["title", "tiers"],
            Self::Footer => &["text", "links"],
            Self::Unknown(_) => &[],
        }
    }

    /// Whether the renderer interprets `key` for this kind.
    pub fn interprets(&self, key: &str) -> bool {
        let root = key.split('.').next().unwrap_or(key);
        COMMON_KEYS.contains(&root) || self.content_keys().contains(&root)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for ComponentKind {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl Serialize for ComponentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ComponentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// One component in the page tree. Children are owned by the page graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    pub id: NodeId,
    pub kind: ComponentKind,
    pub properties: Properties,
}

impl ComponentNode {
    pub fn new(id: NodeId, kind: ComponentKind, properties: Properties) -> Self {
        Self {
            id,
            kind,
            properties,
        }
    }

    /// Read a property, following dotted keys into composite values.
    pub fn property(&self, key: &str) -> Option<&PropValue> {
        lookup_path(&self.properties, key)
    }
}

/// A subtree detached by `remove_node`, with where it used to live.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedSubtree {
    pub parent: Option<NodeId>,
    pub index: usize,
    pub tree: ComponentTree,
}

impl RemovedSubtree {
    /// Every id in the removed subtree, root first.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.tree.collect_ids(&mut out);
        out
    }
}

// ─── Page schema ─────────────────────────────────────────────────────────

/// The authoritative page tree.
#[derive(Debug, Clone)]
pub struct PageSchema {
    /// Page id; shares the id namespace with the nodes.
    pub id: NodeId,
    pub name: String,
    graph: StableDiGraph<ComponentNode, ()>,
    id_index: HashMap<NodeId, NodeIndex>,
    /// Top-level components in render order.
    roots: Vec<NodeIndex>,
    /// Child render order per parent.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    /// Next serial per id prefix.
    serials: HashMap<String, u64>,
}

impl PageSchema {
    /// Create an empty page.
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            roots: Vec::new(),
            child_order: HashMap::new(),
            serials: HashMap::new(),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Look up a node by id.
    pub fn find_node(&self, id: NodeId) -> Option<&ComponentNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    /// Children of `parent` in render order; `None` means the top level.
    /// An unknown parent has no children.
    pub fn children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        match parent {
            None => self.ids_of(&self.roots),
            Some(id) => self
                .id_index
                .get(&id)
                .and_then(|idx| self.child_order.get(idx))
                .map(|order| self.ids_of(order))
                .unwrap_or_default(),
        }
    }

    /// Parent of a node, or `None` for top-level and unknown nodes.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Position of a node within its parent's child list.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let idx = self.index_of(id)?;
        self.slots(self.parent_index(idx))
            .iter()
            .position(|&s| s == idx)
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let Some(mut current) = self.index_of(descendant) else {
            return false;
        };
        while let Some(parent) = self.parent_index(current) {
            if self.graph[parent].id == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Ids of a node and all its descendants, pre-order. Empty if absent.
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(idx) = self.index_of(id) {
            self.collect_preorder(idx, &mut out);
        }
        out
    }

    /// All node ids in render (depth-first, pre-order) order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.node_count());
        for &idx in &self.roots {
            self.collect_preorder(idx, &mut out);
        }
        out
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Create a node under `parent` (top level when `None`) at `index`
    /// (append when `None`). Returns the fresh id.
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        kind: ComponentKind,
        properties: Properties,
        index: Option<usize>,
    ) -> Result<NodeId, EditError> {
        let parent_idx = self.resolve_parent(parent)?;
        let position = self.check_index(parent_idx, index)?;

        let id = self.fresh_id(&kind);
        let node = ComponentNode::new(id, kind, properties);
        self.attach(parent_idx, position, node);
        log::debug!("added {id} under {}", describe_parent(parent));
        Ok(id)
    }

    /// Set `key` on a node, returning the value it replaced.
    /// Dotted keys address entries of composite properties.
    pub fn update_property(
        &mut self,
        id: NodeId,
        key: &str,
        value: PropValue,
    ) -> Result<Option<PropValue>, EditError> {
        let idx = self.index_of(id).ok_or(EditError::NotFound(id))?;
        let previous = assign_path(&mut self.graph[idx].properties, key, value)?;
        log::debug!("updated {id}.{key}");
        Ok(previous)
    }

    /// Detach a node and its whole subtree.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemovedSubtree, EditError> {
        let idx = self.index_of(id).ok_or(EditError::NotFound(id))?;
        let parent_idx = self.parent_index(idx);
        let index = self
            .slots(parent_idx)
            .iter()
            .position(|&s| s == idx)
            .ok_or_else(|| {
                EditError::ConstraintViolation(format!("{id} is missing from its parent's order"))
            })?;

        let tree = self.build_tree(idx);
        let mut doomed = Vec::new();
        self.collect_preorder_indices(idx, &mut doomed);

        self.slots_mut(parent_idx).remove(index);
        for node_idx in doomed {
            self.child_order.remove(&node_idx);
            if let Some(node) = self.graph.remove_node(node_idx) {
                self.id_index.remove(&node.id);
            }
        }

        log::debug!("removed {id} ({} nodes)", tree.len());
        Ok(RemovedSubtree {
            parent: parent_idx.map(|p| self.graph[p].id),
            index,
            tree,
        })
    }

    /// Insert an owned subtree, keeping its ids. Fails without changes if
    /// any id is empty, repeated within the subtree, or already in the page.
    pub fn insert_subtree(
        &mut self,
        parent: Option<NodeId>,
        index: Option<usize>,
        tree: ComponentTree,
    ) -> Result<NodeId, EditError> {
        let parent_idx = self.resolve_parent(parent)?;
        let position = self.check_index(parent_idx, index)?;

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        tree.collect_ids(&mut ids);
        for id in ids {
            if id.as_str().is_empty() {
                return Err(EditError::ConstraintViolation("empty node id".into()));
            }
            if id == self.id || self.contains(id) || !seen.insert(id) {
                return Err(EditError::ConstraintViolation(format!("duplicate id {id}")));
            }
        }

        let root_id = tree.id;
        self.attach_tree(parent_idx, position, tree);
        Ok(root_id)
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// Build a page from a document, re-validating the tree invariants.
    pub fn from_document(doc: PageDocument) -> Result<Self, EditError> {
        if doc.id.as_str().is_empty() {
            return Err(EditError::ConstraintViolation("empty page id".into()));
        }
        let mut schema = Self::new(doc.id, doc.name);
        for tree in doc.components {
            schema.insert_subtree(None, None, tree)?;
        }
        Ok(schema)
    }

    /// Snapshot the page as a serializable document.
    pub fn to_document(&self) -> PageDocument {
        PageDocument {
            id: self.id,
            name: self.name.clone(),
            components: self.roots.iter().map(|&idx| self.build_tree(idx)).collect(),
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    fn ids_of(&self, order: &[NodeIndex]) -> Vec<NodeId> {
        order.iter().map(|&idx| self.graph[idx].id).collect()
    }

    fn slots(&self, parent: Option<NodeIndex>) -> &[NodeIndex] {
        match parent {
            None => &self.roots,
            Some(p) => self.child_order.get(&p).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    fn slots_mut(&mut self, parent: Option<NodeIndex>) -> &mut Vec<NodeIndex> {
        match parent {
            None => &mut self.roots,
            Some(p) => self.child_order.entry(p).or_default(),
        }
    }

    fn resolve_parent(&self, parent: Option<NodeId>) -> Result<Option<NodeIndex>, EditError> {
        match parent {
            None => Ok(None),
            Some(id) => self.index_of(id).map(Some).ok_or(EditError::NotFound(id)),
        }
    }

    fn check_index(
        &self,
        parent: Option<NodeIndex>,
        index: Option<usize>,
    ) -> Result<usize, EditError> {
        let len = self.slots(parent).len();
        match index {
            None => Ok(len),
            Some(i) if i <= len => Ok(i),
            Some(i) => Err(EditError::InvalidIntent(format!(
                "index {i} is out of range for {len} children"
            ))),
        }
    }

    fn fresh_id(&mut self, kind: &ComponentKind) -> NodeId {
        let slug = kind.slug();
        loop {
            let serial = self.serials.entry(slug.clone()).or_insert(0);
            *serial += 1;
            let candidate = NodeId::numbered(&slug, *serial);
            if candidate != self.id && !self.contains(candidate) {
                return candidate;
            }
        }
    }

    fn attach(&mut self, parent: Option<NodeIndex>, position: usize, node: ComponentNode) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        if let Some(p) = parent {
            self.graph.add_edge(p, idx, ());
        }
        self.id_index.insert(id, idx);
        self.slots_mut(parent).insert(position, idx);
        idx
    }

    fn attach_tree(&mut self, parent: Option<NodeIndex>, position: usize, tree: ComponentTree) {
        let ComponentTree {
            id,
            kind,
            properties,
            children,
        } = tree;
        let idx = self.attach(parent, position, ComponentNode::new(id, kind, properties));
        for (i, child) in children.into_iter().enumerate() {
            self.attach_tree(Some(idx), i, child);
        }
    }

    fn build_tree(&self, idx: NodeIndex) -> ComponentTree {
        let node = &self.graph[idx];
        ComponentTree {
            id: node.id,
            kind: node.kind.clone(),
            properties: node.properties.clone(),
            children: self
                .slots(Some(idx))
                .iter()
                .map(|&c| self.build_tree(c))
                .collect(),
        }
    }

    fn collect_preorder(&self, idx: NodeIndex, out: &mut Vec<NodeId>) {
        out.push(self.graph[idx].id);
        for &child in self.slots(Some(idx)) {
            self.collect_preorder(child, out);
        }
    }

    fn collect_preorder_indices(&self, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
        out.push(idx);
        for &child in self.slots(Some(idx)) {
            self.collect_preorder_indices(child, out);
        }
    }
}

/// Structural equality: same page id, name and component tree.
impl PartialEq for PageSchema {
    fn eq(&self, other: &Self) -> bool {
        self.to_document() == other.to_document()
    }
}

fn describe_parent(parent: Option<NodeId>) -> String {
    parent.map_or_else(|| "page".to_string(), |p| p.to_string())
}
