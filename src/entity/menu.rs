//! Menu entity - 菜单表
//!
//! 表名: sys_menu

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_menu")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 菜单名称
    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// 上级菜单
    #[sea_orm(nullable)]
    pub parent_id: Option<i64>,

    pub sort: i32,

    /// 是否目录 (目录只用于分组, 不可授权)
    pub is_catalog: bool,

    /// 菜单状态
    pub status: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
