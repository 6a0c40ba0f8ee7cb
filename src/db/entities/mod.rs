//! SeaORM entities for the tagging schema.
//!
//! `users` is read-mostly reference data, `tags` and `vms` are the two sides of
//! the `vm_tags` junction table.

pub mod tag;
pub mod user;
pub mod vm;
pub mod vm_tag;

