use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::department::DepartmentService;
use crate::permission::PermissionService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<Config>,
    pub departments: DepartmentService,
    pub permissions: PermissionService,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let max_depth = config.tree.max_depth;
        Self {
            departments: DepartmentService::new(db.clone(), max_depth),
            permissions: PermissionService::new(db.clone(), max_depth),
            db,
            config: Arc::new(config),
        }
    }
}
