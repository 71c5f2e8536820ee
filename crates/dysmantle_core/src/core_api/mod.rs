//! Host-facing API surface: the engine, open sessions, and the data and
//! error types they exchange.

mod engine;
mod error;
mod types;

pub use engine::{Engine, Session};
pub use error::{CoreError, CoreErrorCode};
pub use types::{AttributeEntry, NodeEntry, RegionSpan, Snapshot};

pub use crate::document::rules::AttributeKind;
