//! Harbor Core - shared abstractions for the Harbor document-store client
//!
//! This crate provides the small set of types that feature crates depend on
//! without depending on each other:
//!
//! - `Namespace` - `database.collection` target addressing
//! - `AppEvent` / `AppEventSink` - the application-wide notification bus seam
//! - `CoreError` - common error type

mod error;
mod events;
mod namespace;

pub use error::{CoreError, Result};
pub use events::{AppEvent, AppEventSink};
pub use namespace::Namespace;
