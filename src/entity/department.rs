//! Department entity - 部门表
//!
//! 表名: sys_dept

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_dept")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 部门名称
    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// 部门标识
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub key: Option<String>,

    /// 同级排序 (升序)
    pub sort: i32,

    /// 负责人
    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub owner: Option<String>,

    /// 联系电话
    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub phone: Option<String>,

    /// 部门描述
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// 部门状态: true=启用, false=禁用
    pub status: bool,

    /// 上级部门 (NULL 表示顶级部门)
    #[sea_orm(nullable)]
    pub parent_id: Option<i64>,

    /// 数据归属部门, 创建后写入自身 ID, 之后不再修改
    #[sea_orm(nullable)]
    pub dept_belong_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 自引用关系通过 TreeIndex 处理

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status_label(&self) -> &'static str {
        if self.status {
            "启用"
        } else {
            "禁用"
        }
    }
}

/// 部门精简节点 (懒加载树 / 授权下拉)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeptNode {
    pub id: i64,
    pub name: String,
    pub parent: Option<i64>,
}

impl From<Model> for DeptNode {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            parent: model.parent_id,
        }
    }
}
