//! Domain model for collection points and the item catalog.
//!
//! # Responsibility
//! - Define the records shared by repositories, services and the API layer.
//! - Validate and normalize caller input before any unit of work opens.
//!
//! # Invariants
//! - Output records never carry the credential or its hash.
//! - Contact identities are compared in normalized (trimmed, lowercase) form.

pub mod item;
pub mod point;
