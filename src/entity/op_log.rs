//! OpLog entity - 操作日志表
//!
//! 表名: sys_op_log

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 操作类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    /// 创建部门
    CreateDept,
    /// 部门上移
    MoveDeptUp,
    /// 部门下移
    MoveDeptDown,
    /// 角色授权
    AuthorizeRole,
}

impl OpType {
    /// 转换为中文显示
    pub fn to_chinese(&self) -> &'static str {
        match self {
            OpType::CreateDept => "创建部门",
            OpType::MoveDeptUp => "部门上移",
            OpType::MoveDeptDown => "部门下移",
            OpType::AuthorizeRole => "角色授权",
        }
    }
}

/// 操作结果
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    Success,
    Failed,
}

impl OpResult {
    pub fn to_chinese(&self) -> &'static str {
        match self {
            OpResult::Success => "成功",
            OpResult::Failed => "失败",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_op_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 操作时间 (Unix 时间戳)
    pub op_time: i64,

    /// 操作用户
    #[sea_orm(column_type = "String(Some(32))")]
    pub username: String,

    /// 操作类型
    #[sea_orm(column_type = "String(Some(32))")]
    pub op_type: String,

    /// 操作描述
    #[sea_orm(column_type = "Text")]
    pub op_desc: String,

    /// 操作结果
    #[sea_orm(column_type = "String(Some(16))")]
    pub result: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
