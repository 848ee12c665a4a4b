//! RoleMenuPermission entity - 角色菜单授权表
//!
//! 表名: sys_role_menu_permission, (role_id, menu_id) 唯一

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_role_menu_permission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub role_id: i64,

    pub menu_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
