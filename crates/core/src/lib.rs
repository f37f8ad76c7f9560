//! Domain foundation building blocks shared by every stockroom crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod revision;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ItemId, PurchaseId, SupplierId};
pub use revision::{ExpectedRevision, Revision};
