//! Department tree service
//!
//! Hierarchy queries, sibling reordering, creation and the per-department user
//! summary. Recursive walks run on a [`TreeIndex`] built from one bulk fetch.

use std::collections::{BTreeSet, HashMap};

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;

use crate::entity::department::{self, DeptNode};
use crate::entity::users;
use crate::error::{AppResult, OptionExt};
use crate::permission::DataScope;
use crate::tree::TreeIndex;

pub mod ordering;
pub mod summary;

pub use ordering::{MoveOutcome, NewDepartment};
pub use summary::{DeptSummary, GenderCount, SubDeptCount};

/// Bulk-load the department hierarchy, siblings in sort order
pub async fn load_dept_index<C: ConnectionTrait>(
    conn: &C,
    max_depth: usize,
) -> Result<TreeIndex, DbErr> {
    let depts = department::Entity::find()
        .order_by_asc(department::Column::Sort)
        .order_by_asc(department::Column::Id)
        .all(conn)
        .await?;
    Ok(TreeIndex::build(
        depts.into_iter().map(|d| (d.id, d.parent_id, d.name)),
        max_depth,
    ))
}

#[derive(Clone)]
pub struct DepartmentService {
    db: DatabaseConnection,
    max_depth: usize,
}

/// Department row as listed in the management table
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentRow {
    #[serde(flatten)]
    pub dept: department::Model,
    pub parent_name: Option<String>,
    pub status_label: &'static str,
    /// Number of direct children
    pub has_children: u64,
    #[serde(rename = "hasChild")]
    pub has_child: bool,
    pub dept_user_count: u64,
}

impl DepartmentService {
    pub fn new(db: DatabaseConnection, max_depth: usize) -> Self {
        Self { db, max_depth }
    }

    pub(crate) async fn index(&self) -> AppResult<TreeIndex> {
        Ok(load_dept_index(&self.db, self.max_depth).await?)
    }

    pub async fn get(&self, dept_id: i64) -> AppResult<department::Model> {
        department::Entity::find_by_id(dept_id)
            .one(&self.db)
            .await?
            .ok_or_not_found("部门不存在")
    }

    /// Direct children ordered by sort; `None` lists the top level
    pub async fn children_of(&self, parent: Option<i64>) -> AppResult<Vec<department::Model>> {
        let query = match parent {
            Some(parent) => department::Entity::find().filter(department::Column::ParentId.eq(parent)),
            None => department::Entity::find().filter(department::Column::ParentId.is_null()),
        };
        Ok(query
            .order_by_asc(department::Column::Sort)
            .order_by_asc(department::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Every department below `dept_id`, excluding itself
    pub async fn recursive_descendants(&self, dept_id: i64) -> AppResult<BTreeSet<i64>> {
        let tree = self.index().await?;
        if !tree.contains(dept_id) {
            return Err(crate::error::AppError::NotFound("部门不存在".to_string()));
        }
        Ok(tree.descendants(dept_id)?)
    }

    pub async fn has_children(&self, dept_id: i64) -> AppResult<bool> {
        let child = department::Entity::find()
            .filter(department::Column::ParentId.eq(dept_id))
            .one(&self.db)
            .await?;
        Ok(child.is_some())
    }

    /// Enabled departments; with `parent` only its direct children (lazy loading)
    pub async fn list(&self, parent: Option<i64>) -> AppResult<Vec<DepartmentRow>> {
        let mut query = department::Entity::find().filter(department::Column::Status.eq(true));
        if let Some(parent) = parent {
            query = query.filter(department::Column::ParentId.eq(parent));
        }
        let depts = query
            .order_by_asc(department::Column::Sort)
            .order_by_asc(department::Column::Id)
            .all(&self.db)
            .await?;
        if depts.is_empty() {
            return Ok(Vec::new());
        }

        let all = department::Entity::find().all(&self.db).await?;
        let names: HashMap<i64, String> = all.iter().map(|d| (d.id, d.name.clone())).collect();
        let mut child_counts: HashMap<i64, u64> = HashMap::new();
        for d in &all {
            if let Some(parent) = d.parent_id {
                *child_counts.entry(parent).or_default() += 1;
            }
        }
        let user_counts = self.user_counts(depts.iter().map(|d| d.id)).await?;

        Ok(depts
            .into_iter()
            .map(|d| {
                let children = child_counts.get(&d.id).copied().unwrap_or(0);
                DepartmentRow {
                    parent_name: d.parent_id.and_then(|p| names.get(&p).cloned()),
                    status_label: d.status_label(),
                    has_children: children,
                    has_child: children > 0,
                    dept_user_count: user_counts.get(&d.id).copied().unwrap_or(0),
                    dept: d,
                }
            })
            .collect())
    }

    /// Enabled departments as `{id, name, parent}` in sort order
    pub async fn all_enabled(&self) -> AppResult<Vec<DeptNode>> {
        Ok(department::Entity::find()
            .filter(department::Column::Status.eq(true))
            .order_by_asc(department::Column::Sort)
            .order_by_asc(department::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(DeptNode::from)
            .collect())
    }

    /// Departments inside `scope`, optionally only the children of `parent`
    pub async fn lazy_tree(
        &self,
        scope: &DataScope,
        parent: Option<i64>,
    ) -> AppResult<Vec<DeptNode>> {
        let mut query = department::Entity::find();
        match scope {
            DataScope::All => {}
            DataScope::Departments(ids) if ids.is_empty() => return Ok(Vec::new()),
            DataScope::Departments(ids) => {
                query = query.filter(department::Column::Id.is_in(ids.iter().copied()));
            }
        }
        if let Some(parent) = parent {
            query = query.filter(department::Column::ParentId.eq(parent));
        }
        Ok(query
            .order_by_asc(department::Column::Sort)
            .order_by_asc(department::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(DeptNode::from)
            .collect())
    }

    /// Users per department for the given ids
    async fn user_counts<I>(&self, dept_ids: I) -> AppResult<HashMap<i64, u64>>
    where
        I: IntoIterator<Item = i64>,
    {
        let rows: Vec<(Option<i64>, i64)> = users::Entity::find()
            .select_only()
            .column(users::Column::DeptId)
            .column_as(users::Column::Id.count(), "total")
            .filter(users::Column::DeptId.is_in(dept_ids))
            .group_by(users::Column::DeptId)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(dept, total)| dept.map(|d| (d, total.max(0) as u64)))
            .collect())
    }
}
