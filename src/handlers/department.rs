//! Department handlers
//!
//! Listing, lazy tree, reordering, creation and the department summary

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;

use crate::department::{DepartmentRow, DeptSummary, MoveOutcome, NewDepartment};
use crate::entity::department::{self, DeptNode};
use crate::entity::op_log::{OpResult, OpType};
use crate::error::{require, AppResult};
use crate::handlers::audit::service::log_operation;
use crate::handlers::params::{empty_as_none, flag, ApiJson, ApiQuery};
use crate::permission::Principal;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ParentQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeptIdRequest {
    pub dept_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeptInfoQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dept_id: Option<i64>,
    #[serde(default, deserialize_with = "flag")]
    pub show_all: bool,
}

fn op_result<T>(result: &AppResult<T>) -> OpResult {
    if result.is_ok() {
        OpResult::Success
    } else {
        OpResult::Failed
    }
}

/// GET /api/dept
pub async fn list_departments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ParentQuery>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentRow>>>> {
    let rows = state.departments.list(query.parent).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// POST /api/dept
pub async fn create_department(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<NewDepartment>,
) -> AppResult<Json<ApiResponse<department::Model>>> {
    let name = req.name.clone();
    let result = state.departments.create(req, principal.dept_id).await;
    log_operation(
        &principal.username,
        OpType::CreateDept,
        format!("部门名称: {}", name),
        op_result(&result),
    );
    Ok(Json(ApiResponse::success(result?)))
}

/// GET /api/dept/dept_lazy_tree
///
/// Superusers see every department, everyone else only their data scope.
pub async fn dept_lazy_tree(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<ParentQuery>,
) -> AppResult<Json<ApiResponse<Vec<DeptNode>>>> {
    let scope = state
        .permissions
        .resolve_data_scope(&principal.capability, None)
        .await?;
    let nodes = state.departments.lazy_tree(&scope, query.parent).await?;
    Ok(Json(ApiResponse::success(nodes)))
}

/// GET /api/dept/all_dept
pub async fn all_departments(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<DeptNode>>>> {
    let nodes = state.departments.all_enabled().await?;
    Ok(Json(ApiResponse::success(nodes)))
}

/// POST /api/dept/move_up
pub async fn move_up(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<DeptIdRequest>,
) -> AppResult<Json<ApiResponse<MoveOutcome>>> {
    let dept_id = require(req.dept_id, "dept_id")?;
    let result = state.departments.move_up(dept_id).await;
    log_operation(
        &principal.username,
        OpType::MoveDeptUp,
        format!("部门ID: {}", dept_id),
        op_result(&result),
    );
    Ok(Json(ApiResponse::success(result?)))
}

/// POST /api/dept/move_down
pub async fn move_down(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<DeptIdRequest>,
) -> AppResult<Json<ApiResponse<MoveOutcome>>> {
    let dept_id = require(req.dept_id, "dept_id")?;
    let result = state.departments.move_down(dept_id).await;
    log_operation(
        &principal.username,
        OpType::MoveDeptDown,
        format!("部门ID: {}", dept_id),
        op_result(&result),
    );
    Ok(Json(ApiResponse::success(result?)))
}

/// GET /api/dept/dept_info
pub async fn dept_info(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DeptInfoQuery>,
) -> AppResult<Json<ApiResponse<DeptSummary>>> {
    let summary = state
        .departments
        .summary(query.dept_id, query.show_all)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}
