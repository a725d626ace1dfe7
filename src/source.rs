//! Where relation data comes from.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EndpointError, Result};
use crate::types::Relation;

/// The transport seam: yields the relations currently bound to the
/// endpoint, in the transport's own order.
pub trait RelationSource {
    fn relations(&self) -> &[Relation];
}

/// A point-in-time copy of relation state, typically read from a JSON file
/// the hosting framework keeps current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSnapshot {
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl RelationSnapshot {
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// Reads a snapshot from `path`. A missing file means no relations.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(EndpointError::io("read snapshot", path, e)),
        };
        serde_json::from_str(&raw).map_err(|source| EndpointError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl RelationSource for RelationSnapshot {
    fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

impl RelationSource for Vec<Relation> {
    fn relations(&self) -> &[Relation] {
        self
    }
}
