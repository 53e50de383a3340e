//! Persisted models.

pub mod policy;

pub use policy::{PolicyDocument, PolicyList, PolicySet};
