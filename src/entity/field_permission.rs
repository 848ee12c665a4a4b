//! FieldPermission entity - 字段权限表
//!
//! 表名: sys_field_permission, (role_id, field_id) 唯一

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_field_permission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub role_id: i64,

    pub field_id: i64,

    /// 可查询
    pub is_query: bool,

    /// 可新增
    pub is_create: bool,

    /// 可编辑
    pub is_update: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
