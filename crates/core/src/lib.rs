//! # Dialysis Core
//!
//! Core business logic for the dialysis record service.
//!
//! This crate contains the record model and the operations over it:
//! - patients, sessions, readings and reports stored in a [`DocumentStore`]
//! - session and report identifier generation
//! - boundary validation of request bodies
//! - the analytics aggregation over a patient's readings
//!
//! **No API concerns**: HTTP routing, status codes and response shapes belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod repositories;
pub mod validation;

pub use config::ServiceConfig;
pub use dialysis_store::{Connectivity, DocumentStore};
pub use error::{RecordError, RecordResult};
pub use repositories::{ensure_indexes, RecordServices};
pub use validation::{decode_json, NonEmptyText};
