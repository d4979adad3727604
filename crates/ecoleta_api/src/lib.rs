//! Use-case API for the points directory.
//!
//! # Responsibility
//! - Expose stable, request-level handlers that an HTTP framework can mount
//!   as `GET/POST/PUT /points`, `GET /points/:id`, `POST /sessions` and
//!   `GET /items`.
//! - Parse raw transport fields once, at this boundary.
//! - Map core errors onto the `{status, body}` envelope contract.
//!
//! # Invariants
//! - Handlers never panic and always return an envelope.
//! - Credential values and hashes never appear in a response body.

pub mod api;
mod context;
mod request;
mod response;

pub use api::{create_point, create_session, index_points, list_items, show_point, update_point};
pub use context::{ApiContext, ApiSetupError};
pub use request::{PointForm, PointUpdateForm, PointsQuery, SessionForm, UploadedFile};
pub use response::ApiResponse;
