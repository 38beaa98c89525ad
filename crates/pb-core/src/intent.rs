//! Edit intents and applied-change records.
//!
//! Panels never mutate the page directly: they emit `EditIntent` values and
//! the dispatcher applies them. Each successful application yields an
//! `AppliedChange` carrying enough data to invert it.

use crate::id::NodeId;
use crate::model::{ComponentKind, PropValue, Properties, RemovedSubtree};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use time::OffsetDateTime;

/// A requested edit, not yet applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditIntent {
    AddComponent {
        kind: ComponentKind,
        #[serde(default)]
        properties: Properties,
        #[serde(default)]
        parent_id: Option<NodeId>,
        #[serde(default)]
        index: Option<usize>,
    },
    UpdateProperty {
        node_id: NodeId,
        key: String,
        value: PropValue,
    },
    RemoveComponent {
        node_id: NodeId,
    },
    GenerateFromPrompt {
        text: String,
        #[serde(default)]
        target_id: Option<NodeId>,
    },
}

impl EditIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::AddComponent { .. } => IntentKind::AddComponent,
            Self::UpdateProperty { .. } => IntentKind::UpdateProperty,
            Self::RemoveComponent { .. } => IntentKind::RemoveComponent,
            Self::GenerateFromPrompt { .. } => IntentKind::GenerateFromPrompt,
        }
    }

    /// Shorthand for appending a component.
    pub fn add(kind: ComponentKind, properties: Properties, parent_id: Option<NodeId>) -> Self {
        Self::AddComponent {
            kind,
            properties,
            parent_id,
            index: None,
        }
    }

    pub fn update(node_id: NodeId, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Self::UpdateProperty {
            node_id,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(node_id: NodeId) -> Self {
        Self::RemoveComponent { node_id }
    }

    pub fn generate(text: impl Into<String>, target_id: Option<NodeId>) -> Self {
        Self::GenerateFromPrompt {
            text: text.into(),
            target_id,
        }
    }

    /// Decode a list of intents from JSON (a resolver's raw answer).
    pub fn list_from_json(text: &str) -> Result<Vec<EditIntent>, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The variant tag of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    AddComponent,
    UpdateProperty,
    RemoveComponent,
    GenerateFromPrompt,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AddComponent => "add",
            Self::UpdateProperty => "update",
            Self::RemoveComponent => "remove",
            Self::GenerateFromPrompt => "generate",
        })
    }
}

/// Data needed to invert an applied change.
#[derive(Debug, Clone, PartialEq)]
pub enum Revert {
    /// Undo an add by removing the created node.
    RemoveAdded { node_id: NodeId },
    /// Undo an update by restoring (or clearing, when `None`) the old value.
    RestoreProperty {
        node_id: NodeId,
        key: String,
        previous: Option<PropValue>,
    },
    /// Undo a remove by re-inserting the subtree at its old slot.
    Reinsert(RemovedSubtree),
    /// Undo a generation by reverting its steps last to first.
    Steps(Vec<AppliedChange>),
}

/// Record of one successful `apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    pub intent_kind: IntentKind,
    /// Nodes created, changed, or removed (subtree included).
    pub affected_node_ids: SmallVec<[NodeId; 4]>,
    pub timestamp: OffsetDateTime,
    pub revert: Revert,
}

impl AppliedChange {
    pub fn new(
        intent_kind: IntentKind,
        affected_node_ids: impl IntoIterator<Item = NodeId>,
        revert: Revert,
    ) -> Self {
        Self {
            intent_kind,
            affected_node_ids: affected_node_ids.into_iter().collect(),
            timestamp: OffsetDateTime::now_utc(),
            revert,
        }
    }

    /// Combine the steps of a generation into one record.
    pub fn generation(steps: Vec<AppliedChange>) -> Self {
        let mut affected: SmallVec<[NodeId; 4]> = SmallVec::new();
        for step in &steps {
            for id in &step.affected_node_ids {
                if !affected.contains(id) {
                    affected.push(*id);
                }
            }
        }
        Self {
            intent_kind: IntentKind::GenerateFromPrompt,
            affected_node_ids: affected,
            timestamp: OffsetDateTime::now_utc(),
            revert: Revert::Steps(steps),
        }
    }

    /// The first affected node: the created node of an add.
    pub fn primary_node(&self) -> Option<NodeId> {
        self.affected_node_ids.first().copied()
    }
}
