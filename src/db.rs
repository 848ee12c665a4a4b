use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{
    department, field_permission, menu, menu_button, menu_field, op_log, role,
    role_menu_button_permission, role_menu_button_permission_dept, role_menu_permission, users,
    users_role,
};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);

    let mut opt = ConnectOptions::new(&database_url);
    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Create every table and unique index that does not exist yet
pub async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    // Reference data
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(department::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(menu::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(menu_button::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(menu_field::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(role::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(users::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(users_role::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(op_log::Entity)).await?;

    // Grants
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(role_menu_permission::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(role_menu_button_permission::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(role_menu_button_permission_dept::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(field_permission::Entity)).await?;

    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("uk_role_menu_permission_role_menu")
            .table(role_menu_permission::Entity)
            .col(role_menu_permission::Column::RoleId)
            .col(role_menu_permission::Column::MenuId)
            .unique()
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("uk_field_permission_role_field")
            .table(field_permission::Entity)
            .col(field_permission::Column::RoleId)
            .col(field_permission::Column::FieldId)
            .unique()
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_role_menu_button_permission_role")
            .table(role_menu_button_permission::Entity)
            .col(role_menu_button_permission::Column::RoleId)
            .to_owned(),
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// In-memory SQLite with the full schema, for tests
#[cfg(test)]
pub(crate) async fn memory_database() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    // one connection, otherwise every pooled connection gets its own empty database
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");
    auto_migrate(&db).await.expect("migrate sqlite");
    db
}
