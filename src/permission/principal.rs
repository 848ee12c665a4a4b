//! Authenticated principal
//!
//! The superuser check happens once, when the principal is loaded. Everything
//! downstream receives a [`Capability`] instead of re-reading the flag.

use std::collections::BTreeSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entity::{users, users_role};
use crate::error::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capability {
    Superuser,
    ScopedTo {
        roles: BTreeSet<i64>,
        dept_id: Option<i64>,
    },
}

impl Capability {
    pub fn is_superuser(&self) -> bool {
        matches!(self, Capability::Superuser)
    }

    /// Role ids of a scoped principal, `None` for a superuser
    pub fn roles(&self) -> Option<&BTreeSet<i64>> {
        match self {
            Capability::Superuser => None,
            Capability::ScopedTo { roles, .. } => Some(roles),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub dept_id: Option<i64>,
    pub capability: Capability,
}

impl Principal {
    /// Load an active user and the roles assigned to them
    pub async fn load<C: ConnectionTrait>(conn: &C, user_id: i64) -> AppResult<Self> {
        let user = users::Entity::find_by_id(user_id)
            .one(conn)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)?;

        let capability = if user.is_superuser {
            Capability::Superuser
        } else {
            let roles = users_role::Entity::find()
                .filter(users_role::Column::UsersId.eq(user.id))
                .all(conn)
                .await?
                .into_iter()
                .map(|r| r.role_id)
                .collect();
            Capability::ScopedTo {
                roles,
                dept_id: user.dept_id,
            }
        };

        Ok(Self {
            user_id: user.id,
            username: user.username,
            dept_id: user.dept_id,
            capability,
        })
    }
}
