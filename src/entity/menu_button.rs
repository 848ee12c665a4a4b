//! MenuButton entity - 菜单按钮表
//!
//! 表名: sys_menu_button

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_menu_button")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 所属菜单
    pub menu_id: i64,

    /// 按钮名称
    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// 权限值, 如 "dept:Create"
    #[sea_orm(column_type = "String(Some(64))")]
    pub value: String,

    /// 对应接口地址
    #[sea_orm(column_type = "String(Some(200))", nullable)]
    pub api: Option<String>,

    /// 接口请求方法
    #[sea_orm(nullable)]
    pub method: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
