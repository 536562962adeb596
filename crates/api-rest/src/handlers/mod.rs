//! HTTP handlers, one module per record component.
//!
//! Handlers take the body as raw JSON and decode it with
//! [`dialysis_core::decode_json`] so a malformed body is reported with the path of the
//! offending field.

pub mod analytics;
pub mod emergency;
pub mod health;
pub mod patients;
pub mod readings;
pub mod reports;
pub mod sessions;
