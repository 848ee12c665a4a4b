//! UsersRole entity - 用户角色关联表
//!
//! 表名: sys_users_role

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_users_role")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub users_id: i64,

    pub role_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
