//! Persistence exports.

mod json_store;
pub mod models;
mod repository;

pub use models::*;
pub use repository::PolicyStore;
