//! Repository module - data access layer.

mod policy_repository;

pub use policy_repository::PolicyStore;
