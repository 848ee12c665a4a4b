//! Entity module - SeaORM 实体定义
//!
//! 包含所有数据库表对应的实体模型

pub mod department;
pub mod field_permission;
pub mod menu;
pub mod menu_button;
pub mod menu_field;
pub mod op_log;
pub mod role;
pub mod role_menu_button_permission;
pub mod role_menu_button_permission_dept;
pub mod role_menu_permission;
pub mod users;
pub mod users_role;
