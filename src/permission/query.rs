//! Read-only lookups used by the role authorization page

use std::collections::{BTreeMap, BTreeSet};

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

use super::{Capability, PermissionService};
use crate::entity::{menu_button, role_menu_button_permission, role_menu_permission};
use crate::error::{require, AppResult};

/// A button grant joined with its button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfiguredButton {
    pub id: i64,
    pub data_range: i32,
    pub menu_button: i64,
    #[serde(rename = "menu_button__name")]
    pub name: String,
    #[serde(rename = "menu_button__value")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignableButton {
    pub id: i64,
    pub name: String,
}

impl PermissionService {
    async fn buttons_of_menu(&self, menu_id: i64) -> AppResult<BTreeMap<i64, menu_button::Model>> {
        Ok(menu_button::Entity::find()
            .filter(menu_button::Column::MenuId.eq(menu_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect())
    }

    /// Button grants configured under `menu_id`. A superuser sees every
    /// role's grants unless `role` narrows them; anyone else must name a role.
    pub async fn menu_buttons_configured(
        &self,
        capability: &Capability,
        menu_id: i64,
        role: Option<i64>,
    ) -> AppResult<Vec<ConfiguredButton>> {
        let role = if capability.is_superuser() {
            role
        } else {
            Some(require(role, "role")?)
        };

        let buttons = self.buttons_of_menu(menu_id).await?;
        if buttons.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = role_menu_button_permission::Entity::find().filter(
            role_menu_button_permission::Column::MenuButtonId.is_in(buttons.keys().copied()),
        );
        if let Some(role) = role {
            query = query.filter(role_menu_button_permission::Column::RoleId.eq(role));
        }
        let grants = query
            .order_by_asc(role_menu_button_permission::Column::Id)
            .all(&self.db)
            .await?;

        Ok(grants
            .into_iter()
            .filter_map(|g| {
                buttons.get(&g.menu_button_id).map(|b| ConfiguredButton {
                    id: g.id,
                    data_range: g.data_range,
                    menu_button: b.id,
                    name: b.name.clone(),
                    value: b.value.clone(),
                })
            })
            .collect())
    }

    /// Buttons under `menu_id` the caller may grant to others: all of them
    /// for a superuser, otherwise those the caller's own roles hold.
    pub async fn assignable_buttons(
        &self,
        capability: &Capability,
        menu_id: i64,
    ) -> AppResult<Vec<AssignableButton>> {
        let buttons = self.buttons_of_menu(menu_id).await?;

        let held: Option<BTreeSet<i64>> = match capability.roles() {
            None => None,
            Some(roles) if roles.is_empty() || buttons.is_empty() => Some(BTreeSet::new()),
            Some(roles) => Some(
                role_menu_button_permission::Entity::find()
                    .select_only()
                    .column(role_menu_button_permission::Column::MenuButtonId)
                    .filter(role_menu_button_permission::Column::RoleId.is_in(roles.iter().copied()))
                    .filter(
                        role_menu_button_permission::Column::MenuButtonId
                            .is_in(buttons.keys().copied()),
                    )
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .collect(),
            ),
        };

        Ok(buttons
            .into_values()
            .filter(|b| held.as_ref().map_or(true, |h| h.contains(&b.id)))
            .map(|b| AssignableButton {
                id: b.id,
                name: b.name,
            })
            .collect())
    }

    /// Distinct menu ids granted to a role
    pub async fn role_menu_ids(&self, role_id: i64) -> AppResult<Vec<i64>> {
        let ids: BTreeSet<i64> = role_menu_permission::Entity::find()
            .select_only()
            .column(role_menu_permission::Column::MenuId)
            .filter(role_menu_permission::Column::RoleId.eq(role_id))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();
        Ok(ids.into_iter().collect())
    }
}
