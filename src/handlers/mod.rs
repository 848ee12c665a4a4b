//! Request handlers module

pub mod audit;
pub mod department;
pub mod params;
pub mod permission;
