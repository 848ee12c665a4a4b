//! Data-scope resolver
//!
//! Every button grant carries a data range code. A principal's effective scope
//! is the union of what each distinct code grants. "All" wins outright, and no
//! grants at all means an empty scope.

use std::collections::{BTreeMap, BTreeSet};

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use super::{Capability, PermissionService};
use crate::department::load_dept_index;
use crate::entity::department::{self, DeptNode};
use crate::entity::{role_menu_button_permission, role_menu_button_permission_dept};
use crate::error::{require, AppResult};
use crate::tree::TreeError;

/// Data range codes as stored on `RoleMenuButtonPermission.data_range`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataRange {
    /// 仅本人数据权限
    OwnOnly = 0,
    /// 本部门及以下数据权限
    DeptAndBelow = 1,
    /// 本部门数据权限
    DeptOnly = 2,
    /// 全部数据权限
    All = 3,
    /// 自定义数据权限
    Custom = 4,
}

impl DataRange {
    pub const OPTIONS: [DataRange; 5] = [
        DataRange::OwnOnly,
        DataRange::DeptAndBelow,
        DataRange::DeptOnly,
        DataRange::All,
        DataRange::Custom,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DataRange::OwnOnly),
            1 => Some(DataRange::DeptAndBelow),
            2 => Some(DataRange::DeptOnly),
            3 => Some(DataRange::All),
            4 => Some(DataRange::Custom),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            DataRange::OwnOnly => "仅本人数据权限",
            DataRange::DeptAndBelow => "本部门及以下数据权限",
            DataRange::DeptOnly => "本部门数据权限",
            DataRange::All => "全部数据权限",
            DataRange::Custom => "自定义数据权限",
        }
    }

    /// Ranges a holder of `self` may hand out when re-scoping a grant
    pub fn assignable(self) -> &'static [DataRange] {
        match self {
            DataRange::OwnOnly => &[DataRange::OwnOnly],
            DataRange::DeptAndBelow => &[DataRange::OwnOnly, DataRange::DeptAndBelow, DataRange::DeptOnly],
            DataRange::DeptOnly => &[DataRange::OwnOnly, DataRange::DeptOnly],
            DataRange::All => &[DataRange::OwnOnly, DataRange::All],
            DataRange::Custom => &[DataRange::OwnOnly, DataRange::Custom],
        }
    }
}

impl TryFrom<i32> for DataRange {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        DataRange::from_code(code).ok_or(code)
    }
}

/// Selectable option for the authorization UI
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataScopeOption {
    pub value: i32,
    pub label: &'static str,
}

impl From<DataRange> for DataScopeOption {
    fn from(range: DataRange) -> Self {
        Self {
            value: range.code(),
            label: range.label(),
        }
    }
}

/// Department filter for row-level queries
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "dept_ids", rename_all = "snake_case")]
pub enum DataScope {
    All,
    Departments(BTreeSet<i64>),
}

impl DataScope {
    pub fn empty() -> Self {
        DataScope::Departments(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DataScope::All)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DataScope::Departments(ids) if ids.is_empty())
    }

    pub fn allows(&self, dept_id: i64) -> bool {
        match self {
            DataScope::All => true,
            DataScope::Departments(ids) => ids.contains(&dept_id),
        }
    }
}

/// A button grant reduced to what scope resolution needs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeGrant {
    pub data_range: i32,
    pub custom_depts: BTreeSet<i64>,
}

/// Union the department sets granted by each distinct code.
///
/// `descendants` is only called for code 1, at most once.
pub fn resolve_scope<F>(
    dept_id: Option<i64>,
    grants: &[ScopeGrant],
    mut descendants: F,
) -> Result<DataScope, TreeError>
where
    F: FnMut(i64) -> Result<BTreeSet<i64>, TreeError>,
{
    let codes: BTreeSet<i32> = grants.iter().map(|g| g.data_range).collect();
    if codes.contains(&DataRange::All.code()) {
        return Ok(DataScope::All);
    }

    let mut depts = BTreeSet::new();
    for code in codes {
        match DataRange::from_code(code) {
            Some(DataRange::OwnOnly) | Some(DataRange::DeptOnly) => depts.extend(dept_id),
            Some(DataRange::DeptAndBelow) => {
                if let Some(dept_id) = dept_id {
                    depts.insert(dept_id);
                    depts.extend(descendants(dept_id)?);
                }
            }
            Some(DataRange::Custom) => {
                for grant in grants.iter().filter(|g| g.data_range == code) {
                    depts.extend(grant.custom_depts.iter().copied());
                }
            }
            Some(DataRange::All) => return Ok(DataScope::All),
            None => {}
        }
    }

    Ok(DataScope::Departments(depts))
}

/// Options a non-superuser may pick, capped by the highest code they hold
pub fn scope_options(granted_codes: &[i32]) -> Vec<DataScopeOption> {
    granted_codes
        .iter()
        .filter_map(|&c| DataRange::from_code(c))
        .max()
        .map(|ceiling| ceiling.assignable().iter().map(|&r| r.into()).collect())
        .unwrap_or_default()
}

impl PermissionService {
    /// Button grants held by `roles`, optionally for one button only
    pub async fn load_scope_grants(
        &self,
        roles: &BTreeSet<i64>,
        menu_button: Option<i64>,
    ) -> AppResult<Vec<ScopeGrant>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = role_menu_button_permission::Entity::find()
            .filter(role_menu_button_permission::Column::RoleId.is_in(roles.iter().copied()));
        if let Some(button_id) = menu_button {
            query = query.filter(role_menu_button_permission::Column::MenuButtonId.eq(button_id));
        }
        let rows = query
            .order_by_asc(role_menu_button_permission::Column::Id)
            .all(&self.db)
            .await?;

        let custom_ids: Vec<i64> = rows
            .iter()
            .filter(|r| r.data_range == DataRange::Custom.code())
            .map(|r| r.id)
            .collect();
        let mut custom_depts: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
        if !custom_ids.is_empty() {
            let dept_rows = role_menu_button_permission_dept::Entity::find()
                .filter(role_menu_button_permission_dept::Column::PermissionId.is_in(custom_ids))
                .all(&self.db)
                .await?;
            for row in dept_rows {
                custom_depts.entry(row.permission_id).or_default().insert(row.dept_id);
            }
        }

        Ok(rows
            .into_iter()
            .map(|r| ScopeGrant {
                data_range: r.data_range,
                custom_depts: custom_depts.remove(&r.id).unwrap_or_default(),
            })
            .collect())
    }

    /// Department filter for the principal, optionally for one button
    pub async fn resolve_data_scope(
        &self,
        capability: &Capability,
        menu_button: Option<i64>,
    ) -> AppResult<DataScope> {
        let (roles, dept_id) = match capability {
            Capability::Superuser => return Ok(DataScope::All),
            Capability::ScopedTo { roles, dept_id } => (roles, *dept_id),
        };

        let grants = self.load_scope_grants(roles, menu_button).await?;
        if grants.is_empty() {
            tracing::debug!(?roles, ?menu_button, "no button grants, empty data scope");
            return Ok(DataScope::empty());
        }

        let needs_tree = dept_id.is_some()
            && grants
                .iter()
                .any(|g| g.data_range == DataRange::DeptAndBelow.code());
        let tree = if needs_tree {
            Some(load_dept_index(&self.db, self.max_depth).await?)
        } else {
            None
        };

        let scope = resolve_scope(dept_id, &grants, |dept| match tree.as_ref() {
            Some(tree) if tree.contains(dept) => tree.descendants(dept),
            _ => {
                tracing::warn!(dept, "principal department missing from tree");
                Ok(BTreeSet::new())
            }
        })?;
        Ok(scope)
    }

    /// Data range options shown when scoping a button grant
    pub async fn data_scope_options(
        &self,
        capability: &Capability,
        menu_button: Option<i64>,
    ) -> AppResult<Vec<DataScopeOption>> {
        let roles = match capability {
            Capability::Superuser => {
                return Ok(DataRange::OPTIONS.iter().map(|&r| r.into()).collect())
            }
            Capability::ScopedTo { roles, .. } => roles,
        };
        let button_id = require(menu_button, "menu_button")?;

        let codes: Vec<i32> = self
            .load_scope_grants(roles, Some(button_id))
            .await?
            .into_iter()
            .map(|g| g.data_range)
            .collect();
        Ok(scope_options(&codes))
    }

    /// Departments the principal may attach to a custom-scope grant
    pub async fn assignable_departments(
        &self,
        capability: &Capability,
        menu_button: Option<i64>,
    ) -> AppResult<Vec<DeptNode>> {
        let scope = if capability.is_superuser() {
            DataScope::All
        } else {
            let button_id = require(menu_button, "menu_button")?;
            self.resolve_data_scope(capability, Some(button_id)).await?
        };

        let mut query = department::Entity::find();
        match &scope {
            DataScope::All => {}
            DataScope::Departments(ids) if ids.is_empty() => return Ok(Vec::new()),
            DataScope::Departments(ids) => {
                query = query.filter(department::Column::Id.is_in(ids.iter().copied()));
            }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_database;
    use crate::fixtures;
    use crate::tree::TreeIndex;

    fn grant(code: i32) -> ScopeGrant {
        ScopeGrant {
            data_range: code,
            custom_depts: BTreeSet::new(),
        }
    }

    fn no_tree(_: i64) -> Result<BTreeSet<i64>, TreeError> {
        panic!("descendants should not be needed")
    }

    fn org() -> TreeIndex {
        TreeIndex::build(
            vec![
                (1, None, "总部"),
                (2, Some(1), "研发"),
                (3, Some(2), "后端"),
                (4, Some(2), "前端"),
                (5, Some(1), "市场"),
            ],
            64,
        )
    }

    #[test]
    fn test_no_grants_is_empty_scope() {
        let scope = resolve_scope(Some(1), &[], no_tree).unwrap();
        assert!(scope.is_empty());
        assert!(!scope.allows(1));
    }

    #[test]
    fn test_dept_and_below_is_exact_subtree() {
        let tree = org();
        let scope = resolve_scope(Some(2), &[grant(1)], |d| tree.descendants(d)).unwrap();
        assert_eq!(scope, DataScope::Departments(BTreeSet::from([2, 3, 4])));
    }

    #[test]
    fn test_all_short_circuits() {
        let scope = resolve_scope(Some(2), &[grant(0), grant(3), grant(1)], no_tree).unwrap();
        assert!(scope.is_all());
        assert!(scope.allows(999));
    }

    #[test]
    fn test_codes_union_across_grants() {
        let tree = org();
        let custom = ScopeGrant {
            data_range: 4,
            custom_depts: BTreeSet::from([5]),
        };
        let scope =
            resolve_scope(Some(3), &[grant(2), custom, grant(1)], |d| tree.descendants(d)).unwrap();
        assert_eq!(scope, DataScope::Departments(BTreeSet::from([3, 5])));
    }

    #[test]
    fn test_custom_grants_merge_and_unknown_codes_ignored() {
        let a = ScopeGrant {
            data_range: 4,
            custom_depts: BTreeSet::from([7, 8]),
        };
        let b = ScopeGrant {
            data_range: 4,
            custom_depts: BTreeSet::from([9]),
        };
        let scope = resolve_scope(Some(1), &[a, b, grant(42)], no_tree).unwrap();
        assert_eq!(scope, DataScope::Departments(BTreeSet::from([7, 8, 9])));
    }

    #[test]
    fn test_own_only_without_department() {
        let scope = resolve_scope(None, &[grant(0), grant(1), grant(2)], no_tree).unwrap();
        assert!(scope.is_empty());
    }

    #[test]
    fn test_scope_options_follow_ceiling() {
        let values = |codes: &[i32]| -> Vec<i32> {
            scope_options(codes).into_iter().map(|o| o.value).collect()
        };
        assert_eq!(values(&[3]), vec![0, 3]);
        assert_eq!(values(&[1]), vec![0, 1, 2]);
        assert_eq!(values(&[0, 2]), vec![0, 2]);
        assert_eq!(values(&[0]), vec![0]);
        assert_eq!(values(&[4, 1]), vec![0, 4]);
        assert!(values(&[]).is_empty());
        assert!(values(&[17]).is_empty());
    }

    #[test]
    fn test_scope_serializes_tagged() {
        let json = serde_json::to_value(DataScope::Departments(BTreeSet::from([2, 1]))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "departments", "dept_ids": [1, 2]}));
        let json = serde_json::to_value(DataScope::All).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "all"}));
    }

    async fn seeded() -> (sea_orm::DatabaseConnection, PermissionService) {
        let db = memory_database().await;
        fixtures::dept(&db, 1, "总部", None, 1).await;
        fixtures::dept(&db, 2, "研发", Some(1), 1).await;
        fixtures::dept(&db, 3, "后端", Some(2), 1).await;
        fixtures::dept(&db, 4, "前端", Some(2), 2).await;
        fixtures::dept(&db, 5, "市场", Some(1), 2).await;
        fixtures::menu(&db, 1, "系统管理", None, true).await;
        fixtures::menu(&db, 2, "部门管理", Some(1), false).await;
        fixtures::button(&db, 11, 2, "查询", "dept:Search").await;
        fixtures::button(&db, 12, 2, "新增", "dept:Create").await;
        fixtures::role(&db, 7, "部门经理").await;
        fixtures::role(&db, 8, "审计").await;
        let service = PermissionService::new(db.clone(), 64);
        (db, service)
    }

    fn scoped(roles: &[i64], dept: i64) -> Capability {
        Capability::ScopedTo {
            roles: roles.iter().copied().collect(),
            dept_id: Some(dept),
        }
    }

    #[tokio::test]
    async fn test_superuser_always_all() {
        let (db, service) = seeded().await;
        fixtures::button_grant(&db, 7, 11, 0, &[]).await;
        let scope = service
            .resolve_data_scope(&Capability::Superuser, Some(11))
            .await
            .unwrap();
        assert_eq!(scope, DataScope::All);
    }

    #[tokio::test]
    async fn test_resolve_dept_and_below_from_store() {
        let (db, service) = seeded().await;
        fixtures::button_grant(&db, 7, 11, 1, &[]).await;
        let scope = service
            .resolve_data_scope(&scoped(&[7], 2), None)
            .await
            .unwrap();
        assert_eq!(scope, DataScope::Departments(BTreeSet::from([2, 3, 4])));
    }

    #[tokio::test]
    async fn test_resolve_filters_by_button_and_unions_roles() {
        let (db, service) = seeded().await;
        fixtures::button_grant(&db, 7, 11, 2, &[]).await;
        fixtures::button_grant(&db, 8, 11, 4, &[5]).await;
        fixtures::button_grant(&db, 8, 12, 3, &[]).await;

        let scope = service
            .resolve_data_scope(&scoped(&[7, 8], 3), Some(11))
            .await
            .unwrap();
        assert_eq!(scope, DataScope::Departments(BTreeSet::from([3, 5])));

        let scope = service
            .resolve_data_scope(&scoped(&[7, 8], 3), None)
            .await
            .unwrap();
        assert!(scope.is_all());
    }

    #[tokio::test]
    async fn test_principal_without_grants_sees_nothing() {
        let (_db, service) = seeded().await;
        let scope = service
            .resolve_data_scope(&scoped(&[7], 2), None)
            .await
            .unwrap();
        assert!(scope.is_empty());
    }

    #[tokio::test]
    async fn test_data_scope_options() {
        let (db, service) = seeded().await;
        fixtures::button_grant(&db, 7, 11, 3, &[]).await;

        let all = service
            .data_scope_options(&Capability::Superuser, None)
            .await
            .unwrap();
        assert_eq!(all.iter().map(|o| o.value).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);

        let options = service
            .data_scope_options(&scoped(&[7], 2), Some(11))
            .await
            .unwrap();
        assert_eq!(
            options,
            vec![
                DataScopeOption { value: 0, label: "仅本人数据权限" },
                DataScopeOption { value: 3, label: "全部数据权限" },
            ]
        );

        assert!(matches!(
            service.data_scope_options(&scoped(&[7], 2), None).await,
            Err(crate::error::AppError::MissingParameter("menu_button"))
        ));
    }

    #[tokio::test]
    async fn test_assignable_departments() {
        let (db, service) = seeded().await;
        fixtures::button_grant(&db, 7, 11, 1, &[]).await;

        let all = service
            .assignable_departments(&Capability::Superuser, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 5);

        let depts = service
            .assignable_departments(&scoped(&[7], 2), Some(11))
            .await
            .unwrap();
        let ids: Vec<i64> = depts.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        let none = service
            .assignable_departments(&scoped(&[7], 2), Some(12))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
