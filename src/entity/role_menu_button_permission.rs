//! RoleMenuButtonPermission entity - 角色按钮授权表
//!
//! 表名: sys_role_menu_button_permission
//! 同一角色同一按钮可有多条授权 (不同数据范围)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_role_menu_button_permission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub role_id: i64,

    pub menu_button_id: i64,

    /// 数据权限范围: 0=仅本人, 1=本部门及以下, 2=本部门, 3=全部, 4=自定义
    pub data_range: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
