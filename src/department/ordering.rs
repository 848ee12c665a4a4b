//! Sibling reordering and creation
//!
//! Both mutate the `sort` column of a sibling group, so both lock that group
//! (`SELECT ... FOR UPDATE`, ordered by id) inside one transaction.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use super::DepartmentService;
use crate::entity::department;
use crate::error::{AppError, AppResult, OptionExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved { swapped_with: i64 },
    /// Already first (or last) among its siblings
    Unchanged,
}

/// Department creation request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<bool>,
}

/// Lock every sibling under `parent`
async fn lock_siblings(
    txn: &DatabaseTransaction,
    parent: Option<i64>,
) -> AppResult<Vec<department::Model>> {
    let query = match parent {
        Some(parent) => department::Entity::find().filter(department::Column::ParentId.eq(parent)),
        None => department::Entity::find().filter(department::Column::ParentId.is_null()),
    };
    Ok(query
        .order_by_asc(department::Column::Id)
        .lock_exclusive()
        .all(txn)
        .await?)
}

impl DepartmentService {
    pub async fn move_up(&self, dept_id: i64) -> AppResult<MoveOutcome> {
        self.swap_with_neighbour(dept_id, Direction::Up).await
    }

    pub async fn move_down(&self, dept_id: i64) -> AppResult<MoveOutcome> {
        self.swap_with_neighbour(dept_id, Direction::Down).await
    }

    async fn swap_with_neighbour(&self, dept_id: i64, direction: Direction) -> AppResult<MoveOutcome> {
        let txn = self.db.begin().await?;

        let dept = department::Entity::find_by_id(dept_id)
            .one(&txn)
            .await?
            .ok_or_not_found("部门不存在")?;

        let siblings = lock_siblings(&txn, dept.parent_id).await?;
        let Some(current) = siblings.iter().find(|d| d.id == dept_id).cloned() else {
            return Err(AppError::IntegrityViolation(format!(
                "department {} moved to another parent during reorder",
                dept_id
            )));
        };

        let neighbour = match direction {
            Direction::Up => siblings
                .iter()
                .filter(|d| d.sort < current.sort)
                .max_by_key(|d| (d.sort, d.id)),
            Direction::Down => siblings
                .iter()
                .filter(|d| d.sort > current.sort)
                .min_by_key(|d| (d.sort, d.id)),
        }
        .cloned();

        let Some(neighbour) = neighbour else {
            txn.commit().await?;
            return Ok(MoveOutcome::Unchanged);
        };

        let (current_sort, neighbour_sort) = (current.sort, neighbour.sort);
        let neighbour_id = neighbour.id;

        let mut current: department::ActiveModel = current.into();
        current.sort = Set(neighbour_sort);
        current.update(&txn).await?;

        let mut neighbour: department::ActiveModel = neighbour.into();
        neighbour.sort = Set(current_sort);
        neighbour.update(&txn).await?;

        txn.commit().await?;

        tracing::debug!(dept_id, swapped_with = neighbour_id, ?direction, "department reordered");
        Ok(MoveOutcome::Moved {
            swapped_with: neighbour_id,
        })
    }

    /// Create a department under `req.parent`, or under the requester's own
    /// department when no parent is given. It is appended after its siblings.
    pub async fn create(
        &self,
        req: NewDepartment,
        requester_dept: Option<i64>,
    ) -> AppResult<department::Model> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("部门名称不能为空".to_string()));
        }
        if name.chars().count() > 64 {
            return Err(AppError::Validation("部门名称不能超过64个字符".to_string()));
        }

        let parent = req.parent.or(requester_dept);
        let txn = self.db.begin().await?;

        if let Some(parent) = parent {
            department::Entity::find_by_id(parent)
                .one(&txn)
                .await?
                .ok_or_not_found("上级部门不存在")?;
        }

        let last_sort = lock_siblings(&txn, parent)
            .await?
            .iter()
            .map(|d| d.sort)
            .max()
            .unwrap_or(0);

        let created = department::ActiveModel {
            name: Set(name),
            key: Set(req.key),
            sort: Set(last_sort + 1),
            owner: Set(req.owner),
            phone: Set(req.phone),
            description: Set(req.description),
            status: Set(req.status.unwrap_or(true)),
            parent_id: Set(parent),
            dept_belong_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let id = created.id;
        let mut belong: department::ActiveModel = created.into();
        belong.dept_belong_id = Set(Some(id));
        let created = belong.update(&txn).await?;

        txn.commit().await?;
        Ok(created)
    }
}
