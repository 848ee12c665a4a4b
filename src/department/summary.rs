//! Per-department user statistics

use std::collections::{BTreeSet, HashMap};

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;

use super::DepartmentService;
use crate::entity::users::{self, Gender};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub male: u64,
    pub female: u64,
    pub unknown: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubDeptCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeptSummary {
    pub dept_name: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub dept_user: u64,
    pub gender: GenderCount,
    pub sub_dept_map: Vec<SubDeptCount>,
}

impl DepartmentService {
    /// User count and gender breakdown of a department. With `show_all` the
    /// figures cover the whole subtree. Each direct child is always counted
    /// over its own subtree.
    pub async fn summary(&self, dept_id: Option<i64>, show_all: bool) -> AppResult<DeptSummary> {
        let Some(dept_id) = dept_id else {
            return Ok(DeptSummary::default());
        };

        let tree = self.index().await?;
        if !tree.contains(dept_id) {
            return Err(AppError::NotFound("部门不存在".to_string()));
        }
        let dept = self.get(dept_id).await?;

        let scope = if show_all {
            tree.subtree(dept_id)?
        } else {
            BTreeSet::from([dept_id])
        };

        // (dept, gender) -> users, fetched once for the whole tree
        let rows: Vec<(Option<i64>, i32, i64)> = users::Entity::find()
            .select_only()
            .column(users::Column::DeptId)
            .column(users::Column::Gender)
            .column_as(users::Column::Id.count(), "total")
            .filter(users::Column::DeptId.is_not_null())
            .group_by(users::Column::DeptId)
            .group_by(users::Column::Gender)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut per_dept: HashMap<i64, u64> = HashMap::new();
        let mut gender = GenderCount::default();
        for (dept, code, total) in rows {
            let Some(dept) = dept else { continue };
            let total = total.max(0) as u64;
            *per_dept.entry(dept).or_default() += total;
            if scope.contains(&dept) {
                match Gender::from_code(code) {
                    Some(Gender::Male) => gender.male += total,
                    Some(Gender::Female) => gender.female += total,
                    Some(Gender::Unknown) => gender.unknown += total,
                    None => {}
                }
            }
        }
        let count_in = |ids: &BTreeSet<i64>| -> u64 {
            ids.iter().map(|id| per_dept.get(id).copied().unwrap_or(0)).sum()
        };

        let mut sub_dept_map = Vec::new();
        for &child in tree.children(dept_id) {
            let subtree = tree.subtree(child)?;
            sub_dept_map.push(SubDeptCount {
                name: tree.label(child).unwrap_or_default().to_string(),
                count: count_in(&subtree),
            });
        }

        Ok(DeptSummary {
            dept_name: Some(dept.name),
            owner: dept.owner,
            description: dept.description,
            dept_user: count_in(&scope),
            gender,
            sub_dept_map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_database;
    use crate::fixtures;

    async fn seeded() -> DepartmentService {
        let db = memory_database().await;
        fixtures::dept(&db, 1, "总部", None, 1).await;
        fixtures::dept(&db, 2, "研发", Some(1), 2).await;
        fixtures::dept(&db, 3, "市场", Some(1), 1).await;
        fixtures::dept(&db, 4, "后端", Some(2), 1).await;
        fixtures::user(&db, 1, "boss", Some(1), 1, false).await;
        fixtures::user(&db, 2, "dev1", Some(2), 1, false).await;
        fixtures::user(&db, 3, "dev2", Some(4), 2, false).await;
        fixtures::user(&db, 4, "dev3", Some(4), 0, false).await;
        fixtures::user(&db, 5, "sales", Some(3), 2, false).await;
        DepartmentService::new(db, 64)
    }

    #[tokio::test]
    async fn test_empty_summary_is_zeroed() {
        let service = seeded().await;
        let summary = service.summary(None, true).await.unwrap();
        assert_eq!(summary, DeptSummary::default());
        assert_eq!(summary.dept_user, 0);
        assert!(summary.sub_dept_map.is_empty());
    }

    #[tokio::test]
    async fn test_summary_own_department_only() {
        let service = seeded().await;
        let summary = service.summary(Some(1), false).await.unwrap();
        assert_eq!(summary.dept_name.as_deref(), Some("总部"));
        assert_eq!(summary.owner.as_deref(), Some("总部负责人"));
        assert_eq!(summary.dept_user, 1);
        assert_eq!(
            summary.gender,
            GenderCount {
                male: 1,
                female: 0,
                unknown: 0
            }
        );
        // children ordered by sort, each counted over its subtree
        assert_eq!(
            summary.sub_dept_map,
            vec![
                SubDeptCount {
                    name: "市场".to_string(),
                    count: 1
                },
                SubDeptCount {
                    name: "研发".to_string(),
                    count: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_summary_whole_subtree() {
        let service = seeded().await;
        let summary = service.summary(Some(1), true).await.unwrap();
        assert_eq!(summary.dept_user, 5);
        assert_eq!(
            summary.gender,
            GenderCount {
                male: 2,
                female: 2,
                unknown: 1
            }
        );

        let leaf = service.summary(Some(4), true).await.unwrap();
        assert_eq!(leaf.dept_user, 2);
        assert!(leaf.sub_dept_map.is_empty());
    }

    #[tokio::test]
    async fn test_summary_unknown_department() {
        let service = seeded().await;
        assert!(matches!(
            service.summary(Some(404), false).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_gender_counted_but_not_bucketed() {
        let service = seeded().await;
        fixtures::user(&service.db, 6, "dev4", Some(4), 9, false).await;
        let summary = service.summary(Some(4), false).await.unwrap();
        assert_eq!(summary.dept_user, 3);
        assert_eq!(
            summary.gender,
            GenderCount {
                male: 0,
                female: 1,
                unknown: 1
            }
        );
    }
}
