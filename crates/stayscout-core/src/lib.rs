//! Core domain model for stayscout.
//!
//! This crate defines the cleaned listing record, the SQLite schema
//! that holds it, and the checkpoint file that tracks how far the
//! indexing pipeline has progressed.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod checkpoint;
pub mod error;
pub mod model;
pub mod schema;

pub use checkpoint::CheckpointFile;
pub use error::{Error, Result};
pub use model::Listing;
pub use schema::Database;
