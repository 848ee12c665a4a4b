use axum::{
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::auth_layer;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Department routes
        .route(
            "/dept",
            get(handlers::department::list_departments).post(handlers::department::create_department),
        )
        .route("/dept/dept_lazy_tree", get(handlers::department::dept_lazy_tree))
        .route("/dept/all_dept", get(handlers::department::all_departments))
        .route("/dept/move_up", post(handlers::department::move_up))
        .route("/dept/move_down", post(handlers::department::move_down))
        .route("/dept/dept_info", get(handlers::department::dept_info))
        // Role authorization routes
        .route("/permission/role_permission", get(handlers::permission::role_permission))
        .route(
            "/permission/role_permission/:role",
            put(handlers::permission::set_role_permission),
        )
        .route("/permission/data_scope", get(handlers::permission::data_scope))
        .route("/permission/role_to_dept_all", get(handlers::permission::role_to_dept_all))
        .route("/permission/menu_to_button", get(handlers::permission::menu_to_button))
        .route(
            "/permission/role_menu_get_button",
            get(handlers::permission::role_menu_get_button),
        )
        .route("/permission/role_to_menu", get(handlers::permission::role_to_menu))
        .route("/permission/scope", get(handlers::permission::data_scope_of_caller))
        // Audit log routes
        .route("/oplog/query", get(handlers::audit::query_oplog));

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}
