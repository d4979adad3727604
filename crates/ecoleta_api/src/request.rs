//! Raw request shapes as delivered by the transport.
//!
//! Every field is an optional string; parsing happens in the handlers.

use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// `GET /points` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PointsQuery {
    pub city: Option<String>,
    pub uf: Option<String>,
    /// Comma-separated item ids.
    pub items: Option<String>,
    #[serde(rename = "ignoreItems")]
    pub ignore_items: Option<String>,
    #[serde(rename = "returnItems")]
    pub return_items: Option<String>,
}

/// Text fields of the `POST /points` and `PUT /points` forms.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PointForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub whatsapp: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    /// Comma-separated item ids.
    pub items: Option<String>,
}

impl Debug for PointForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointForm")
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("city", &self.city)
            .field("uf", &self.uf)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

/// `PUT /points` form: the point fields plus the lookup identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PointUpdateForm {
    pub originalemail: Option<String>,
    #[serde(flatten)]
    pub fields: PointForm,
}

/// `POST /sessions` form.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Debug for SessionForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionForm").finish_non_exhaustive()
    }
}

/// One uploaded file part.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

impl Debug for UploadedFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("original_name", &self.original_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
