//! MenuField entity - 菜单字段表 (列权限)
//!
//! 表名: sys_menu_field

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_menu_field")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub menu_id: i64,

    /// 数据模型名
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub model: Option<String>,

    /// 字段名
    #[sea_orm(column_type = "String(Some(64))")]
    pub field_name: String,

    /// 字段显示名
    #[sea_orm(column_type = "String(Some(64))")]
    pub title: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
