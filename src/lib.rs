//! Client side of the Cassandra relation.
//!
//! Aggregates the connection details a Cassandra cluster publishes over a
//! relation, tracks whether any usable details exist through an
//! `available` flag, and renders them into a `cqlshrc` file.

pub mod config;
pub mod cqlshrc;
pub mod details;
pub mod endpoint;
pub mod error;
pub mod flags;
pub mod ini;
pub mod source;
pub mod types;

pub use cqlshrc::{CqlshrcWriter, RenderOutcome};
pub use details::{CassandraDetails, DetailsList};
pub use endpoint::CassandraEndpoint;
pub use error::{EndpointError, Result};
pub use flags::{EndpointFlags, FlagRegistry};
pub use source::{RelationSource, RelationSnapshot};
pub use types::{Event, RawData, Relation, Unit};
