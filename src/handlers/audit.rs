//! Audit log handlers
//!
//! Implements operation log query and the background writer behind it

use axum::{extract::State, response::Json, Extension};
use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::entity::op_log;
use crate::error::{AppError, AppResult};
use crate::handlers::params::ApiQuery;
use crate::permission::Principal;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Query parameters for log pagination
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Log response
#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub id: i64,
    #[serde(rename = "opTime")]
    pub op_time: i64,
    pub username: String,
    #[serde(rename = "opType")]
    pub op_type: String,
    #[serde(rename = "opDesc")]
    pub op_desc: String,
    pub result: String,
}

impl From<op_log::Model> for LogResponse {
    fn from(m: op_log::Model) -> Self {
        Self {
            id: m.id,
            op_time: m.op_time,
            username: m.username,
            op_type: m.op_type,
            op_desc: m.op_desc,
            result: m.result,
        }
    }
}

/// Query response with pagination
#[derive(Debug, Serialize)]
pub struct LogQueryResponse {
    pub logs: Vec<LogResponse>,
    pub total: u64,
}

/// GET /api/oplog/query
pub async fn query_oplog(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<LogQuery>,
) -> AppResult<Json<ApiResponse<LogQueryResponse>>> {
    // only superusers read the audit trail
    if !principal.capability.is_superuser() {
        return Err(AppError::Forbidden);
    }

    let page = query.page.max(1) as u64;
    let page_size = query.page_size.clamp(1, 100) as u64;
    let offset = (page - 1) * page_size;

    let logs = op_log::Entity::find()
        .order_by_desc(op_log::Column::Id)
        .offset(offset)
        .limit(page_size)
        .all(&state.db)
        .await?
        .into_iter()
        .map(LogResponse::from)
        .collect();
    let total = op_log::Entity::find().count(&state.db).await?;

    Ok(Json(ApiResponse::success(LogQueryResponse { logs, total })))
}

/// Service for adding operation logs
pub mod service {
    use sea_orm::{ActiveModelTrait, Set};
    use tokio::sync::mpsc;

    use crate::entity::op_log::{self, OpResult, OpType};

    /// Log entry to be added
    #[derive(Debug, Clone)]
    pub struct LogEntry {
        pub username: String,
        pub op_type: OpType,
        pub op_desc: String,
        pub result: OpResult,
    }

    impl LogEntry {
        fn into_active_model(self, op_time: i64) -> op_log::ActiveModel {
            op_log::ActiveModel {
                op_time: Set(op_time),
                username: Set(self.username),
                op_type: Set(self.op_type.to_chinese().to_string()),
                op_desc: Set(self.op_desc),
                result: Set(self.result.to_chinese().to_string()),
                ..Default::default()
            }
        }
    }

    /// Global log channel
    static LOG_TX: std::sync::OnceLock<mpsc::Sender<LogEntry>> = std::sync::OnceLock::new();

    /// Initialize the audit log service
    /// This function is idempotent - calling it multiple times is safe
    pub fn init(db: sea_orm::DatabaseConnection) {
        if LOG_TX.get().is_some() {
            tracing::debug!("Audit log service already initialized, skipping");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<LogEntry>(200);
        if LOG_TX.set(tx).is_err() {
            tracing::debug!("Audit log service initialized by another thread");
            return;
        }

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let now = chrono::Utc::now().timestamp();
                if let Err(e) = entry.into_active_model(now).insert(&db).await {
                    tracing::error!("Failed to log operation: {}", e);
                }
            }
        });
    }

    /// Add an operation log entry
    pub fn add_log(entry: LogEntry) {
        if let Some(tx) = LOG_TX.get() {
            if tx.try_send(entry).is_err() {
                tracing::warn!("Log channel is full, operation log dropped");
            }
        } else {
            tracing::warn!(
                "Audit log service not initialized, log dropped: {} - {}",
                entry.op_type.to_chinese(),
                entry.op_desc
            );
        }
    }

    pub fn log_operation(username: &str, op_type: OpType, op_desc: impl Into<String>, result: OpResult) {
        add_log(LogEntry {
            username: username.to_string(),
            op_type,
            op_desc: op_desc.into(),
            result,
        });
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::db::memory_database;
        use sea_orm::EntityTrait;

        #[tokio::test]
        async fn test_entry_persists_chinese_labels() {
            let db = memory_database().await;
            let entry = LogEntry {
                username: "admin".to_string(),
                op_type: OpType::AuthorizeRole,
                op_desc: "角色 7 授权".to_string(),
                result: OpResult::Success,
            };
            entry.into_active_model(1_700_000_000).insert(&db).await.unwrap();

            let rows = op_log::Entity::find().all(&db).await.unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].op_type, "角色授权");
            assert_eq!(rows[0].result, "成功");
            assert_eq!(rows[0].op_time, 1_700_000_000);
        }
    }
}
