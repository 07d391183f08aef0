//! HTTP error surface: the API error type and its RFC 7807 body.

pub mod error;
pub mod problem;
