//! Shared types for the Mesa reservation client
//!
//! DTOs, domain models, the error taxonomy and pagination types used
//! across the data layer. This crate performs no I/O.

pub mod error;
pub mod models;
pub mod request;
pub mod response;

// Re-exports
pub use error::{ClientError, ClientResult, ErrorKind};
pub use serde::{Deserialize, Serialize};
