//! Permission-resolution engine
//!
//! Resolves what a role may see and do: visible menus, enabled buttons, field
//! flags and the department scope applied to row-level queries. Also applies a
//! submitted permission tree as one transactional grant replacement.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::entity::menu;
use crate::tree::TreeIndex;

pub mod grant;
pub mod principal;
pub mod query;
pub mod scope;
pub mod tree_builder;

pub use grant::GrantSummary;
pub use principal::{Capability, Principal};
pub use scope::{DataRange, DataScope, DataScopeOption, ScopeGrant};

/// Role authorization service
#[derive(Clone)]
pub struct PermissionService {
    db: DatabaseConnection,
    max_depth: usize,
}

impl PermissionService {
    pub fn new(db: DatabaseConnection, max_depth: usize) -> Self {
        Self { db, max_depth }
    }
}

/// One menu of a role's permission tree. Produced by the builder, submitted
/// back unchanged (with edits) to the grant applier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: i64,
    /// Full path from the root menu, "/"-joined
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isCheck", default)]
    pub is_check: bool,
    #[serde(default)]
    pub btns: Vec<ButtonEntry>,
    #[serde(default)]
    pub columns: Vec<FieldEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEntry {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "isCheck", default)]
    pub is_check: bool,
    /// Raw data range code, `None` when the role holds no grant for this button
    #[serde(default)]
    pub data_range: Option<i32>,
    /// Departments of a custom (code 4) scope
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dept: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub id: i64,
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_query: bool,
    #[serde(default)]
    pub is_create: bool,
    #[serde(default)]
    pub is_update: bool,
}

/// Bulk-load the menu hierarchy, siblings in sort order
pub async fn load_menu_index<C: ConnectionTrait>(
    conn: &C,
    max_depth: usize,
) -> Result<(TreeIndex, Vec<menu::Model>), DbErr> {
    let menus = menu::Entity::find()
        .order_by_asc(menu::Column::Sort)
        .order_by_asc(menu::Column::Id)
        .all(conn)
        .await?;
    let index = TreeIndex::build(
        menus.iter().map(|m| (m.id, m.parent_id, m.name.clone())),
        max_depth,
    );
    Ok((index, menus))
}
