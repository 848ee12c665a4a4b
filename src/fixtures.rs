//! Row builders for database-backed tests

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entity::{
    department, field_permission, menu, menu_button, menu_field, role,
    role_menu_button_permission, role_menu_button_permission_dept, role_menu_permission, users,
    users_role,
};

pub async fn dept(
    db: &DatabaseConnection,
    id: i64,
    name: &str,
    parent: Option<i64>,
    sort: i32,
) -> department::Model {
    department::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        key: Set(None),
        sort: Set(sort),
        owner: Set(Some(format!("{name}负责人"))),
        phone: Set(None),
        description: Set(Some(format!("{name}描述"))),
        status: Set(true),
        parent_id: Set(parent),
        dept_belong_id: Set(Some(id)),
    }
    .insert(db)
    .await
    .expect("insert dept")
}

pub async fn menu(
    db: &DatabaseConnection,
    id: i64,
    name: &str,
    parent: Option<i64>,
    is_catalog: bool,
) -> menu::Model {
    menu::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        parent_id: Set(parent),
        sort: Set(id as i32),
        is_catalog: Set(is_catalog),
        status: Set(true),
    }
    .insert(db)
    .await
    .expect("insert menu")
}

pub async fn button(db: &DatabaseConnection, id: i64, menu_id: i64, name: &str, value: &str) {
    menu_button::ActiveModel {
        id: Set(id),
        menu_id: Set(menu_id),
        name: Set(name.to_string()),
        value: Set(value.to_string()),
        api: Set(None),
        method: Set(None),
    }
    .insert(db)
    .await
    .expect("insert button");
}

pub async fn field(db: &DatabaseConnection, id: i64, menu_id: i64, field_name: &str, title: &str) {
    menu_field::ActiveModel {
        id: Set(id),
        menu_id: Set(menu_id),
        model: Set(None),
        field_name: Set(field_name.to_string()),
        title: Set(title.to_string()),
    }
    .insert(db)
    .await
    .expect("insert field");
}

pub async fn role(db: &DatabaseConnection, id: i64, name: &str) {
    role::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        key: Set(format!("role_{id}")),
        status: Set(true),
        sort: Set(id as i32),
    }
    .insert(db)
    .await
    .expect("insert role");
}

pub async fn user(
    db: &DatabaseConnection,
    id: i64,
    username: &str,
    dept_id: Option<i64>,
    gender: i32,
    is_superuser: bool,
) {
    users::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        name: Set(username.to_string()),
        dept_id: Set(dept_id),
        gender: Set(gender),
        is_superuser: Set(is_superuser),
        is_active: Set(true),
    }
    .insert(db)
    .await
    .expect("insert user");
}

pub async fn user_role(db: &DatabaseConnection, users_id: i64, role_id: i64) {
    users_role::ActiveModel {
        users_id: Set(users_id),
        role_id: Set(role_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user role");
}

pub async fn menu_grant(db: &DatabaseConnection, role_id: i64, menu_id: i64) {
    role_menu_permission::ActiveModel {
        role_id: Set(role_id),
        menu_id: Set(menu_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert menu grant");
}

/// Button grant plus its custom department rows; returns the grant id
pub async fn button_grant(
    db: &DatabaseConnection,
    role_id: i64,
    menu_button_id: i64,
    data_range: i32,
    depts: &[i64],
) -> i64 {
    let grant = role_menu_button_permission::ActiveModel {
        role_id: Set(role_id),
        menu_button_id: Set(menu_button_id),
        data_range: Set(data_range),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert button grant");

    for dept_id in depts {
        role_menu_button_permission_dept::ActiveModel {
            permission_id: Set(grant.id),
            dept_id: Set(*dept_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert grant dept");
    }
    grant.id
}

pub async fn field_grant(
    db: &DatabaseConnection,
    role_id: i64,
    field_id: i64,
    flags: (bool, bool, bool),
) {
    field_permission::ActiveModel {
        role_id: Set(role_id),
        field_id: Set(field_id),
        is_query: Set(flags.0),
        is_create: Set(flags.1),
        is_update: Set(flags.2),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert field grant");
}
