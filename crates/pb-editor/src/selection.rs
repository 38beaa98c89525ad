//! Selection state: at most one selected node.

use pb_core::{EditError, NodeId, PageSchema};

/// The currently selected component, if any.
///
/// Never refers to a node outside the schema it was last checked against;
/// the dispatcher calls [`Selection::reconcile`] after every removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<NodeId>,
}

impl Selection {
    pub fn get(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected == Some(id)
    }

    /// Select `id`, or clear with `None`. Unknown ids leave the selection as is.
    pub fn select(&mut self, schema: &PageSchema, id: Option<NodeId>) -> Result<(), EditError> {
        if let Some(id) = id
            && !schema.contains(id)
        {
            return Err(EditError::NotFound(id));
        }
        self.selected = id;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Drop the selection if its node left the schema. Returns true when it
    /// was cleared.
    pub fn reconcile(&mut self, schema: &PageSchema) -> bool {
        match self.selected {
            Some(id) if !schema.contains(id) => {
                log::debug!("SELECTION cleared: {id} no longer exists");
                self.selected = None;
                true
            }
            _ => false,
        }
    }
}
