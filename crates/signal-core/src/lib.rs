//! Core types and services for the campus signal mapper.
//!
//! No HTTP or database dependencies live here. The crate owns the geofence,
//! the sample record and its validation rules, the
//! [`SampleStore`](store::SampleStore) abstraction, and the ingest, query and
//! live services built on top of it. Storage backends and transports depend on it.

pub mod error;
pub mod geofence;
pub mod live;
pub mod payload;
pub mod pipeline;
pub mod query;
pub mod sample;
pub mod store;

pub use error::{Error, IngestError, Rejection, Result};
