//! Rolegate - role-based access control backend
//!
//! Department trees, menu/button/field grants per role and the data-scope
//! resolution that decides which departments' rows a principal may see.

pub mod config;
pub mod db;
pub mod department;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod permission;
pub mod routes;
pub mod state;
pub mod tree;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
