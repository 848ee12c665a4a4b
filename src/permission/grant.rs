//! Role grant replacement
//!
//! A submitted permission tree replaces the role's menu and button grants
//! wholesale and upserts its field flags. The whole write happens in one
//! transaction holding the role row lock; nothing is visible until commit.
//!
//! A caller who is not a superuser can only hand out what it holds itself:
//! its own menus, its own buttons, and ranges within its ceiling on each.

use std::collections::{BTreeMap, BTreeSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use serde::Serialize;

use super::scope::scope_options;
use super::{load_menu_index, Capability, DataRange, MenuEntry, PermissionService};
use crate::entity::{
    department, field_permission, menu, menu_button, menu_field, role,
    role_menu_button_permission, role_menu_button_permission_dept, role_menu_permission,
};
use crate::error::{AppError, AppResult, OptionExt};

/// Rows written by one grant replacement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GrantSummary {
    pub menus: u64,
    pub buttons: u64,
    pub fields: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct GrantPlan {
    /// Checked menus, ancestors not yet added
    menus: BTreeSet<i64>,
    /// button -> (data range code, custom departments)
    buttons: BTreeMap<i64, (i32, BTreeSet<i64>)>,
    /// field -> (query, create, update)
    fields: BTreeMap<i64, (bool, bool, bool)>,
}

impl GrantPlan {
    /// Validate the submitted tree without touching the database
    fn from_entries(entries: &[MenuEntry]) -> AppResult<Self> {
        let mut plan = GrantPlan::default();
        for entry in entries {
            if entry.is_check {
                plan.menus.insert(entry.id);
            }
            for btn in entry.btns.iter().filter(|b| b.is_check) {
                let code = btn.data_range.unwrap_or(DataRange::OwnOnly.code());
                let range = DataRange::try_from(code).map_err(|code| {
                    AppError::Validation(format!("无效的数据权限范围: {}", code))
                })?;
                let depts = if range == DataRange::Custom {
                    btn.dept.iter().copied().collect()
                } else {
                    BTreeSet::new()
                };
                if plan.buttons.insert(btn.id, (code, depts)).is_some() {
                    return Err(AppError::Validation(format!("按钮重复: {}", btn.id)));
                }
            }
            for col in &entry.columns {
                plan.fields
                    .insert(col.id, (col.is_query, col.is_create, col.is_update));
            }
        }
        Ok(plan)
    }

    fn custom_depts(&self) -> BTreeSet<i64> {
        self.buttons
            .values()
            .flat_map(|(_, depts)| depts.iter().copied())
            .collect()
    }
}

/// First id of `ids` with no row in `E`
async fn first_missing<E>(
    txn: &DatabaseTransaction,
    column: E::Column,
    ids: &BTreeSet<i64>,
) -> AppResult<Option<i64>>
where
    E: EntityTrait,
{
    if ids.is_empty() {
        return Ok(None);
    }
    let found: BTreeSet<i64> = E::find()
        .select_only()
        .column(column)
        .filter(column.is_in(ids.iter().copied()))
        .into_tuple::<i64>()
        .all(txn)
        .await?
        .into_iter()
        .collect();
    Ok(ids.difference(&found).next().copied())
}

impl PermissionService {
    /// Reject a plan that reaches past the caller's own grants
    async fn check_within_caller(&self, capability: &Capability, plan: &GrantPlan) -> AppResult<()> {
        let roles = match capability.roles() {
            None => return Ok(()),
            Some(roles) => roles,
        };

        if !plan.menus.is_empty() {
            let held: BTreeSet<i64> = if roles.is_empty() {
                BTreeSet::new()
            } else {
                role_menu_permission::Entity::find()
                    .select_only()
                    .column(role_menu_permission::Column::MenuId)
                    .filter(role_menu_permission::Column::RoleId.is_in(roles.iter().copied()))
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .collect()
            };
            if let Some(menu_id) = plan.menus.difference(&held).next() {
                tracing::warn!(menu_id, ?roles, "grant names a menu the caller does not hold");
                return Err(AppError::Forbidden);
            }
        }

        for (&button_id, (code, depts)) in &plan.buttons {
            let held: Vec<i32> = self
                .load_scope_grants(roles, Some(button_id))
                .await?
                .into_iter()
                .map(|g| g.data_range)
                .collect();
            if held.is_empty() {
                tracing::warn!(button_id, ?roles, "grant names a button the caller does not hold");
                return Err(AppError::Forbidden);
            }
            if !scope_options(&held).iter().any(|o| o.value == *code) {
                tracing::warn!(button_id, code, ?held, "data range above the caller's ceiling");
                return Err(AppError::Forbidden);
            }
            if depts.is_empty() {
                continue;
            }
            let scope = self.resolve_data_scope(capability, Some(button_id)).await?;
            if let Some(dept_id) = depts.iter().find(|&&d| !scope.allows(d)) {
                tracing::warn!(button_id, dept_id, "custom department outside the caller's scope");
                return Err(AppError::Forbidden);
            }
        }
        Ok(())
    }

    pub async fn apply_role_permission(
        &self,
        capability: &Capability,
        role_id: i64,
        entries: Vec<MenuEntry>,
    ) -> AppResult<GrantSummary> {
        let plan = GrantPlan::from_entries(&entries)?;
        // reads through the pool, so it must finish before the transaction opens
        self.check_within_caller(capability, &plan).await?;

        let txn = self.db.begin().await?;

        role::Entity::find_by_id(role_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_not_found("角色不存在")?;

        let button_ids: BTreeSet<i64> = plan.buttons.keys().copied().collect();
        let field_ids: BTreeSet<i64> = plan.fields.keys().copied().collect();
        if let Some(id) = first_missing::<menu::Entity>(&txn, menu::Column::Id, &plan.menus).await? {
            return Err(AppError::NotFound(format!("菜单不存在: {}", id)));
        }
        if let Some(id) =
            first_missing::<menu_button::Entity>(&txn, menu_button::Column::Id, &button_ids).await?
        {
            return Err(AppError::NotFound(format!("按钮不存在: {}", id)));
        }
        if let Some(id) =
            first_missing::<menu_field::Entity>(&txn, menu_field::Column::Id, &field_ids).await?
        {
            return Err(AppError::NotFound(format!("字段不存在: {}", id)));
        }
        if let Some(id) =
            first_missing::<department::Entity>(&txn, department::Column::Id, &plan.custom_depts())
                .await?
        {
            return Err(AppError::NotFound(format!("部门不存在: {}", id)));
        }

        // drop the previous grants
        let old_grants: Vec<i64> = role_menu_button_permission::Entity::find()
            .select_only()
            .column(role_menu_button_permission::Column::Id)
            .filter(role_menu_button_permission::Column::RoleId.eq(role_id))
            .into_tuple()
            .all(&txn)
            .await?;
        if !old_grants.is_empty() {
            role_menu_button_permission_dept::Entity::delete_many()
                .filter(role_menu_button_permission_dept::Column::PermissionId.is_in(old_grants))
                .exec(&txn)
                .await?;
        }
        role_menu_button_permission::Entity::delete_many()
            .filter(role_menu_button_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await?;
        role_menu_permission::Entity::delete_many()
            .filter(role_menu_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await?;

        // a checked menu grants its whole ancestor chain
        let mut granted_menus = BTreeSet::new();
        if !plan.menus.is_empty() {
            let (index, _) = load_menu_index(&txn, self.max_depth).await?;
            for &menu_id in &plan.menus {
                granted_menus.extend(index.ancestors(menu_id)?);
            }
        }
        if !granted_menus.is_empty() {
            role_menu_permission::Entity::insert_many(granted_menus.iter().map(|&menu_id| {
                role_menu_permission::ActiveModel {
                    role_id: Set(role_id),
                    menu_id: Set(menu_id),
                    ..Default::default()
                }
            }))
            .exec_without_returning(&txn)
            .await?;
        }

        for (&button_id, (code, depts)) in &plan.buttons {
            let grant = role_menu_button_permission::ActiveModel {
                role_id: Set(role_id),
                menu_button_id: Set(button_id),
                data_range: Set(*code),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            if depts.is_empty() {
                continue;
            }
            role_menu_button_permission_dept::Entity::insert_many(depts.iter().map(|&dept_id| {
                role_menu_button_permission_dept::ActiveModel {
                    permission_id: Set(grant.id),
                    dept_id: Set(dept_id),
                    ..Default::default()
                }
            }))
            .exec_without_returning(&txn)
            .await?;
        }

        let existing: BTreeMap<i64, field_permission::Model> = if field_ids.is_empty() {
            BTreeMap::new()
        } else {
            field_permission::Entity::find()
                .filter(field_permission::Column::RoleId.eq(role_id))
                .filter(field_permission::Column::FieldId.is_in(field_ids.iter().copied()))
                .all(&txn)
                .await?
                .into_iter()
                .map(|f| (f.field_id, f))
                .collect()
        };
        for (&field_id, &(is_query, is_create, is_update)) in &plan.fields {
            match existing.get(&field_id) {
                Some(current) => {
                    let mut active: field_permission::ActiveModel = current.clone().into();
                    active.is_query = Set(is_query);
                    active.is_create = Set(is_create);
                    active.is_update = Set(is_update);
                    active.update(&txn).await?;
                }
                None => {
                    field_permission::ActiveModel {
                        role_id: Set(role_id),
                        field_id: Set(field_id),
                        is_query: Set(is_query),
                        is_create: Set(is_create),
                        is_update: Set(is_update),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                }
            }
        }

        txn.commit().await?;

        let summary = GrantSummary {
            menus: granted_menus.len() as u64,
            buttons: plan.buttons.len() as u64,
            fields: plan.fields.len() as u64,
        };
        tracing::info!(role_id, ?summary, "role grants replaced");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_database;
    use crate::fixtures;
    use crate::permission::{ButtonEntry, FieldEntry};
    use sea_orm::{DatabaseConnection, QueryOrder};

    async fn seeded() -> (DatabaseConnection, PermissionService) {
        let db = memory_database().await;
        fixtures::menu(&db, 1, "系统管理", None, true).await;
        fixtures::menu(&db, 2, "组织架构", Some(1), true).await;
        fixtures::menu(&db, 3, "部门管理", Some(2), false).await;
        fixtures::menu(&db, 4, "岗位管理", Some(2), false).await;
        fixtures::button(&db, 11, 3, "查询", "dept:list").await;
        fixtures::button(&db, 12, 3, "新增", "dept:add").await;
        fixtures::field(&db, 21, 3, "name", "部门名称").await;
        fixtures::dept(&db, 5, "研发", None, 1).await;
        fixtures::dept(&db, 6, "市场", None, 2).await;
        fixtures::role(&db, 7, "运营").await;
        let service = PermissionService::new(db.clone(), 64);
        (db, service)
    }

    fn button(id: i64, data_range: Option<i32>, dept: Vec<i64>) -> ButtonEntry {
        ButtonEntry {
            id,
            name: String::new(),
            value: String::new(),
            is_check: true,
            data_range,
            dept,
        }
    }

    fn entry(id: i64, btns: Vec<ButtonEntry>) -> MenuEntry {
        MenuEntry {
            id,
            name: String::new(),
            is_check: true,
            btns,
            columns: Vec::new(),
        }
    }

    async fn menu_rows(db: &DatabaseConnection) -> Vec<(i64, i64)> {
        role_menu_permission::Entity::find()
            .order_by_asc(role_menu_permission::Column::MenuId)
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.role_id, r.menu_id))
            .collect()
    }

    async fn button_rows(db: &DatabaseConnection) -> Vec<(i64, i64, i32)> {
        role_menu_button_permission::Entity::find()
            .order_by_asc(role_menu_button_permission::Column::MenuButtonId)
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.role_id, r.menu_button_id, r.data_range))
            .collect()
    }

    #[tokio::test]
    async fn test_checked_menu_grants_ancestor_chain() {
        let (db, service) = seeded().await;
        let summary = service
            .apply_role_permission(&Capability::Superuser, 7, vec![entry(3, vec![button(11, Some(1), vec![])])])
            .await
            .unwrap();

        assert_eq!(
            summary,
            GrantSummary {
                menus: 3,
                buttons: 1,
                fields: 0
            }
        );
        assert_eq!(menu_rows(&db).await, vec![(7, 1), (7, 2), (7, 3)]);
        assert_eq!(button_rows(&db).await, vec![(7, 11, 1)]);
    }

    #[tokio::test]
    async fn test_shared_ancestors_written_once() {
        let (db, service) = seeded().await;
        service
            .apply_role_permission(
                &Capability::Superuser,
                7,
                vec![entry(3, vec![]), entry(4, vec![])],
            )
            .await
            .unwrap();
        assert_eq!(menu_rows(&db).await, vec![(7, 1), (7, 2), (7, 3), (7, 4)]);
    }

    #[tokio::test]
    async fn test_replacement_is_idempotent() {
        let (db, service) = seeded().await;
        let mut tree = vec![entry(
            3,
            vec![button(11, Some(4), vec![5, 6, 5]), button(12, None, vec![6])],
        )];
        tree[0].columns.push(FieldEntry {
            id: 21,
            field_name: "name".to_string(),
            title: "部门名称".to_string(),
            is_query: true,
            is_create: false,
            is_update: true,
        });

        let first = service
            .apply_role_permission(&Capability::Superuser, 7, tree.clone())
            .await
            .unwrap();
        let menus = menu_rows(&db).await;
        let buttons = button_rows(&db).await;
        let second = service
            .apply_role_permission(&Capability::Superuser, 7, tree)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(menu_rows(&db).await, menus);
        assert_eq!(button_rows(&db).await, vec![(7, 11, 4), (7, 12, 0)]);
        assert_eq!(buttons, button_rows(&db).await);

        // custom departments deduplicated, non-custom list ignored
        let depts = role_menu_button_permission_dept::Entity::find().all(&db).await.unwrap();
        assert_eq!(depts.len(), 2);

        let fields = field_permission::Entity::find().all(&db).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].is_query && fields[0].is_update && !fields[0].is_create);
    }

    #[tokio::test]
    async fn test_unknown_button_rolls_back() {
        let (db, service) = seeded().await;
        service
            .apply_role_permission(&Capability::Superuser, 7, vec![entry(3, vec![button(11, Some(1), vec![])])])
            .await
            .unwrap();

        let result = service
            .apply_role_permission(&Capability::Superuser, 7, vec![entry(4, vec![button(99, Some(0), vec![])])])
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(menu_rows(&db).await, vec![(7, 1), (7, 2), (7, 3)]);
        assert_eq!(button_rows(&db).await, vec![(7, 11, 1)]);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (_db, service) = seeded().await;
        let out_of_range = service
            .apply_role_permission(&Capability::Superuser, 7, vec![entry(3, vec![button(11, Some(9), vec![])])])
            .await;
        assert!(matches!(out_of_range, Err(AppError::Validation(_))));

        let unknown_role = service
            .apply_role_permission(&Capability::Superuser, 99, vec![entry(3, vec![])])
            .await;
        assert!(matches!(unknown_role, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_submission_clears_grants() {
        let (db, service) = seeded().await;
        service
            .apply_role_permission(&Capability::Superuser, 7, vec![entry(3, vec![button(11, Some(1), vec![])])])
            .await
            .unwrap();
        let summary = service
            .apply_role_permission(&Capability::Superuser, 7, Vec::new())
            .await
            .unwrap();
        assert_eq!(summary, GrantSummary::default());
        assert!(menu_rows(&db).await.is_empty());
        assert!(button_rows(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_button_rejected() {
        let (db, service) = seeded().await;
        let result = service
            .apply_role_permission(
                &Capability::Superuser,
                7,
                vec![entry(3, vec![button(11, Some(1), vec![]), button(11, Some(3), vec![])])],
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(button_rows(&db).await.is_empty());
    }

    /// Role 8 holds menu 3 and button 11 at code 1; role 9 holds button 11
    /// as a custom range over department 5.
    async fn seeded_caller() -> (DatabaseConnection, PermissionService) {
        let (db, service) = seeded().await;
        fixtures::role(&db, 8, "主管").await;
        fixtures::role(&db, 9, "专员").await;
        fixtures::menu_grant(&db, 8, 3).await;
        fixtures::menu_grant(&db, 9, 3).await;
        fixtures::button_grant(&db, 8, 11, 1, &[]).await;
        fixtures::button_grant(&db, 9, 11, 4, &[5]).await;
        (db, service)
    }

    fn caller(roles: &[i64]) -> Capability {
        Capability::ScopedTo {
            roles: roles.iter().copied().collect(),
            dept_id: Some(5),
        }
    }

    async fn role_seven(db: &DatabaseConnection) -> Vec<(i64, i64, i32)> {
        button_rows(db).await.into_iter().filter(|r| r.0 == 7).collect()
    }

    #[tokio::test]
    async fn test_scoped_caller_within_own_grants() {
        let (db, service) = seeded_caller().await;
        service
            .apply_role_permission(&caller(&[8]), 7, vec![entry(3, vec![button(11, Some(2), vec![])])])
            .await
            .unwrap();
        assert_eq!(role_seven(&db).await, vec![(7, 11, 2)]);
    }

    #[tokio::test]
    async fn test_scoped_caller_menu_outside_own() {
        let (db, service) = seeded_caller().await;
        let result = service
            .apply_role_permission(&caller(&[8]), 7, vec![entry(4, vec![])])
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
        assert!(!menu_rows(&db).await.iter().any(|r| r.0 == 7));
    }

    #[tokio::test]
    async fn test_scoped_caller_button_not_held() {
        let (db, service) = seeded_caller().await;
        let result = service
            .apply_role_permission(&caller(&[8]), 7, vec![entry(3, vec![button(12, Some(0), vec![])])])
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
        assert!(role_seven(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_scoped_caller_range_above_ceiling() {
        let (db, service) = seeded_caller().await;
        for code in [3, 4] {
            let result = service
                .apply_role_permission(
                    &caller(&[8]),
                    7,
                    vec![entry(3, vec![button(11, Some(code), vec![5])])],
                )
                .await;
            assert!(matches!(result, Err(AppError::Forbidden)), "code {}", code);
        }
        assert!(role_seven(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_scoped_caller_custom_departments_within_scope() {
        let (db, service) = seeded_caller().await;
        let outside = service
            .apply_role_permission(&caller(&[9]), 7, vec![entry(3, vec![button(11, Some(4), vec![5, 6])])])
            .await;
        assert!(matches!(outside, Err(AppError::Forbidden)));
        assert!(role_seven(&db).await.is_empty());

        service
            .apply_role_permission(&caller(&[9]), 7, vec![entry(3, vec![button(11, Some(4), vec![5])])])
            .await
            .unwrap();
        assert_eq!(role_seven(&db).await, vec![(7, 11, 4)]);
    }
}
