//! Property store: the inspector's view of the selected component.
//!
//! Reads are snapshots. Writes become `UpdateProperty` intents and go
//! through the dispatcher like every other edit.

use crate::dispatcher::Editor;
use pb_core::{AppliedChange, ComponentKind, EditError, EditIntent, NodeId, PropValue, Properties};
use std::fmt;

/// Snapshot of the selected node's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyView {
    pub node_id: NodeId,
    pub kind: ComponentKind,
    pub properties: Properties,
}

impl PropertyView {
    /// Read a property by dotted key.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        pb_core::lookup_path(&self.properties, key)
    }
}

/// Box-model property with one value per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacingGroup {
    Padding,
    Margin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];
}

impl fmt::Display for SpacingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Padding => "padding",
            Self::Margin => "margin",
        })
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        })
    }
}

impl Editor {
    /// Properties of the selected node, or `None` with nothing selected.
    pub fn inspect(&self) -> Option<PropertyView> {
        let id = self.selection()?;
        let node = self.schema().find_node(id)?;
        Some(PropertyView {
            node_id: id,
            kind: node.kind.clone(),
            properties: node.properties.clone(),
        })
    }

    /// Set a property on the selected node.
    pub fn set_selected(
        &mut self,
        key: impl Into<String>,
        value: PropValue,
    ) -> Result<AppliedChange, EditError> {
        let node_id = self.require_selection()?;
        self.apply(EditIntent::UpdateProperty {
            node_id,
            key: key.into(),
            value,
        })
    }

    /// Set a property from raw inspector text.
    pub fn set_selected_input(
        &mut self,
        key: impl Into<String>,
        raw: &str,
    ) -> Result<AppliedChange, EditError> {
        self.set_selected(key, PropValue::parse_input(raw))
    }

    /// Set one side of padding or margin, e.g. `padding.top`.
    pub fn set_selected_side(
        &mut self,
        group: SpacingGroup,
        side: Side,
        value: f64,
    ) -> Result<AppliedChange, EditError> {
        self.set_selected(format!("{group}.{side}"), PropValue::Number(value))
    }

    fn require_selection(&self) -> Result<NodeId, EditError> {
        self.selection()
            .ok_or_else(|| EditError::InvalidIntent("no component selected".into()))
    }
}
