//! Role authorization handlers

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;

use crate::entity::department::DeptNode;
use crate::entity::op_log::{OpResult, OpType};
use crate::error::{require, AppResult};
use crate::handlers::audit::service::log_operation;
use crate::handlers::params::{empty_as_none, ApiJson, ApiPath, ApiQuery};
use crate::permission::query::{AssignableButton, ConfiguredButton};
use crate::permission::{DataScope, DataScopeOption, GrantSummary, MenuEntry, Principal};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub role: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MenuButtonQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub menu_button: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub menu: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub role: Option<i64>,
}

/// GET /api/permission/role_permission
pub async fn role_permission(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> AppResult<Json<ApiResponse<Vec<MenuEntry>>>> {
    let role = require(query.role, "role")?;
    let tree = state
        .permissions
        .build_role_permission(role, &principal.capability)
        .await?;
    Ok(Json(ApiResponse::success(tree)))
}

/// PUT /api/permission/role_permission/:role
pub async fn set_role_permission(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(role): ApiPath<i64>,
    ApiJson(entries): ApiJson<Vec<MenuEntry>>,
) -> AppResult<Json<ApiResponse<GrantSummary>>> {
    let result = state
        .permissions
        .apply_role_permission(&principal.capability, role, entries)
        .await;
    let op_result = if result.is_ok() {
        OpResult::Success
    } else {
        OpResult::Failed
    };
    log_operation(
        &principal.username,
        OpType::AuthorizeRole,
        format!("角色ID: {}", role),
        op_result,
    );
    let summary = result?;
    Ok(Json(ApiResponse {
        code: true,
        message: "授权成功".to_string(),
        data: Some(summary),
    }))
}

/// GET /api/permission/data_scope
pub async fn data_scope(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<MenuButtonQuery>,
) -> AppResult<Json<ApiResponse<Vec<DataScopeOption>>>> {
    let options = state
        .permissions
        .data_scope_options(&principal.capability, query.menu_button)
        .await?;
    Ok(Json(ApiResponse::success(options)))
}

/// GET /api/permission/role_to_dept_all
pub async fn role_to_dept_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<MenuButtonQuery>,
) -> AppResult<Json<ApiResponse<Vec<DeptNode>>>> {
    let depts = state
        .permissions
        .assignable_departments(&principal.capability, query.menu_button)
        .await?;
    Ok(Json(ApiResponse::success(depts)))
}

/// GET /api/permission/menu_to_button
pub async fn menu_to_button(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<MenuQuery>,
) -> AppResult<Json<ApiResponse<Vec<ConfiguredButton>>>> {
    let menu = require(query.menu, "menu")?;
    let buttons = state
        .permissions
        .menu_buttons_configured(&principal.capability, menu, query.role)
        .await?;
    Ok(Json(ApiResponse::success(buttons)))
}

/// GET /api/permission/role_menu_get_button
pub async fn role_menu_get_button(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<MenuQuery>,
) -> AppResult<Json<ApiResponse<Vec<AssignableButton>>>> {
    let menu = require(query.menu, "menu")?;
    let buttons = state
        .permissions
        .assignable_buttons(&principal.capability, menu)
        .await?;
    Ok(Json(ApiResponse::success(buttons)))
}

/// GET /api/permission/role_to_menu
pub async fn role_to_menu(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    let role = require(query.role, "role")?;
    let ids = state.permissions.role_menu_ids(role).await?;
    Ok(Json(ApiResponse::success(ids)))
}

/// GET /api/permission/scope
pub async fn data_scope_of_caller(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<MenuButtonQuery>,
) -> AppResult<Json<ApiResponse<DataScope>>> {
    let scope = state
        .permissions
        .resolve_data_scope(&principal.capability, query.menu_button)
        .await?;
    Ok(Json(ApiResponse::success(scope)))
}
