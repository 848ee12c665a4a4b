//! Role permission tree
//!
//! Assembles, for one target role, every menu the caller may hand out with the
//! role's current menu, button and field grants marked on it.

use std::collections::{BTreeSet, HashMap};

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::{load_menu_index, ButtonEntry, Capability, FieldEntry, MenuEntry, PermissionService};
use crate::entity::{
    field_permission, menu_button, menu_field, role, role_menu_button_permission,
    role_menu_permission,
};
use crate::error::{AppResult, OptionExt};

impl PermissionService {
    pub async fn build_role_permission(
        &self,
        role_id: i64,
        capability: &Capability,
    ) -> AppResult<Vec<MenuEntry>> {
        role::Entity::find_by_id(role_id)
            .one(&self.db)
            .await?
            .ok_or_not_found("角色不存在")?;

        let (index, menus) = load_menu_index(&self.db, self.max_depth).await?;

        let visible: Option<BTreeSet<i64>> = match capability.roles() {
            None => None,
            Some(roles) if roles.is_empty() => Some(BTreeSet::new()),
            Some(roles) => Some(
                role_menu_permission::Entity::find()
                    .filter(role_menu_permission::Column::RoleId.is_in(roles.iter().copied()))
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(|g| g.menu_id)
                    .collect(),
            ),
        };

        let mut candidates: Vec<_> = menus
            .into_iter()
            .filter(|m| m.status && !m.is_catalog)
            .filter(|m| visible.as_ref().map_or(true, |v| v.contains(&m.id)))
            .collect();
        candidates.sort_by_key(|m| m.id);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let menu_ids: Vec<i64> = candidates.iter().map(|m| m.id).collect();

        let checked: BTreeSet<i64> = role_menu_permission::Entity::find()
            .filter(role_menu_permission::Column::RoleId.eq(role_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|g| g.menu_id)
            .collect();

        let buttons = menu_button::Entity::find()
            .filter(menu_button::Column::MenuId.is_in(menu_ids.clone()))
            .order_by_asc(menu_button::Column::Id)
            .all(&self.db)
            .await?;

        // first grant by id wins when a role holds several for one button
        let mut button_ranges: HashMap<i64, i32> = HashMap::new();
        for grant in role_menu_button_permission::Entity::find()
            .filter(role_menu_button_permission::Column::RoleId.eq(role_id))
            .order_by_asc(role_menu_button_permission::Column::Id)
            .all(&self.db)
            .await?
        {
            button_ranges.entry(grant.menu_button_id).or_insert(grant.data_range);
        }

        let fields = menu_field::Entity::find()
            .filter(menu_field::Column::MenuId.is_in(menu_ids))
            .order_by_asc(menu_field::Column::Id)
            .all(&self.db)
            .await?;
        let field_flags: HashMap<i64, field_permission::Model> = field_permission::Entity::find()
            .filter(field_permission::Column::RoleId.eq(role_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|f| (f.field_id, f))
            .collect();

        let mut btns_by_menu: HashMap<i64, Vec<ButtonEntry>> = HashMap::new();
        for b in buttons {
            let data_range = button_ranges.get(&b.id).copied();
            btns_by_menu.entry(b.menu_id).or_default().push(ButtonEntry {
                id: b.id,
                name: b.name,
                value: b.value,
                is_check: data_range.is_some(),
                data_range,
                dept: Vec::new(),
            });
        }

        let mut columns_by_menu: HashMap<i64, Vec<FieldEntry>> = HashMap::new();
        for f in fields {
            let flags = field_flags.get(&f.id);
            columns_by_menu.entry(f.menu_id).or_default().push(FieldEntry {
                id: f.id,
                field_name: f.field_name,
                title: f.title,
                is_query: flags.map_or(false, |p| p.is_query),
                is_create: flags.map_or(false, |p| p.is_create),
                is_update: flags.map_or(false, |p| p.is_update),
            });
        }

        let mut entries = Vec::with_capacity(candidates.len());
        for m in candidates {
            entries.push(MenuEntry {
                id: m.id,
                name: index.path_label(m.id, "/")?,
                is_check: checked.contains(&m.id),
                btns: btns_by_menu.remove(&m.id).unwrap_or_default(),
                columns: columns_by_menu.remove(&m.id).unwrap_or_default(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_database;
    use crate::error::AppError;
    use crate::fixtures;

    async fn seeded() -> PermissionService {
        let db = memory_database().await;
        fixtures::menu(&db, 1, "系统管理", None, true).await;
        fixtures::menu(&db, 2, "用户管理", Some(1), false).await;
        fixtures::menu(&db, 3, "部门管理", Some(1), false).await;
        fixtures::menu(&db, 4, "日志", None, false).await;
        fixtures::button(&db, 11, 2, "新增", "user:add").await;
        fixtures::button(&db, 12, 2, "删除", "user:delete").await;
        fixtures::button(&db, 13, 3, "新增", "dept:add").await;
        fixtures::field(&db, 21, 2, "username", "用户名").await;
        fixtures::field(&db, 22, 2, "phone", "电话").await;
        fixtures::role(&db, 7, "运营").await;
        fixtures::role(&db, 8, "管理员").await;
        fixtures::menu_grant(&db, 7, 1).await;
        fixtures::menu_grant(&db, 7, 2).await;
        fixtures::button_grant(&db, 7, 11, 1, &[]).await;
        fixtures::button_grant(&db, 7, 11, 3, &[]).await;
        fixtures::field_grant(&db, 7, 21, (true, false, true)).await;
        fixtures::menu_grant(&db, 8, 3).await;
        PermissionService::new(db, 64)
    }

    #[tokio::test]
    async fn test_superuser_sees_every_leaf_menu() {
        let service = seeded().await;
        let tree = service
            .build_role_permission(7, &Capability::Superuser)
            .await
            .unwrap();

        let ids: Vec<i64> = tree.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        let users = &tree[0];
        assert_eq!(users.name, "系统管理/用户管理");
        assert!(users.is_check);
        assert_eq!(users.btns.len(), 2);
        assert!(users.btns[0].is_check);
        assert_eq!(users.btns[0].data_range, Some(1));
        assert!(!users.btns[1].is_check);
        assert_eq!(users.btns[1].data_range, None);

        assert_eq!(users.columns.len(), 2);
        assert!(users.columns[0].is_query && users.columns[0].is_update);
        assert!(!users.columns[0].is_create);
        assert!(!users.columns[1].is_query);

        assert!(!tree[1].is_check);
        assert!(tree[2].btns.is_empty());
    }

    #[tokio::test]
    async fn test_scoped_caller_limited_to_own_menus() {
        let service = seeded().await;
        let caller = Capability::ScopedTo {
            roles: BTreeSet::from([8]),
            dept_id: None,
        };
        let tree = service.build_role_permission(7, &caller).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 3);
        assert_eq!(tree[0].name, "系统管理/部门管理");
        assert!(!tree[0].is_check);

        let roleless = Capability::ScopedTo {
            roles: BTreeSet::new(),
            dept_id: None,
        };
        assert!(service.build_role_permission(7, &roleless).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_role() {
        let service = seeded().await;
        assert!(matches!(
            service.build_role_permission(99, &Capability::Superuser).await,
            Err(AppError::NotFound(_))
        ));
    }
}
