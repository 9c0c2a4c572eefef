// ── Presentation groups ──

use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;

/// One board/device slot inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItem {
    pub board: EntityId,
    pub device: EntityId,
    #[serde(default)]
    pub order: i64,
}

/// A node of the presentation tree. `parent == EntityId::ROOT` marks a
/// top-level group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub parent: EntityId,

    /// Kind tag resolved through the layout registry.
    #[serde(default)]
    pub layout: String,

    #[serde(default)]
    pub order: i64,

    #[serde(default)]
    pub content: Vec<GroupItem>,
}

impl Group {
    pub fn new(id: EntityId, parent: EntityId, order: i64) -> Self {
        Self {
            id,
            name: None,
            parent,
            layout: String::new(),
            order,
            content: Vec::new(),
        }
    }

    /// Content sorted by `order`, then device id.
    pub fn sorted_content(&self) -> Vec<GroupItem> {
        let mut items = self.content.clone();
        items.sort_by_key(|item| (item.order, item.device));
        items
    }
}
