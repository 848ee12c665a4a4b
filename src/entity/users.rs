//! Users entity - 用户表
//!
//! 表名: sys_users
//! 本模块只读: 用于组装当前主体与部门人数统计

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户性别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    /// 未知
    Unknown = 0,
    /// 男
    Male = 1,
    /// 女
    Female = 2,
}

impl Gender {
    /// 只识别 0/1/2, 其余编码不归入任何性别
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Gender::Unknown),
            1 => Some(Gender::Male),
            2 => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 用户名 (唯一)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub username: String,

    /// 姓名
    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// 所属部门
    #[sea_orm(nullable)]
    pub dept_id: Option<i64>,

    /// 性别: 0=未知, 1=男, 2=女
    pub gender: i32,

    /// 超级管理员
    pub is_superuser: bool,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
