//! Data access for the tagging core. Each sub-module owns one concern; write
//! operations open their own transaction on the `DatabaseConnection` they are
//! given, helpers generic over `ConnectionTrait` run on whatever they receive.

pub mod association_service;
pub mod error;
pub mod identity;
pub mod tag_service;
pub mod user_service;
pub mod vm_service;

pub use error::{ServiceError, ServiceResult};
