//! 自定义数据范围 (data_range = 4) 的部门集合
//!
//! 表名: sys_role_menu_button_permission_dept

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_role_menu_button_permission_dept")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 所属按钮授权
    pub permission_id: i64,

    pub dept_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
