//! Credential hashing and access-token primitives.
//!
//! Both are seams: services depend on the traits, not on bcrypt or HMAC.

pub mod credential;
pub mod token;
