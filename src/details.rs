//! Typed Cassandra connection details built from relation data.

use std::collections::BTreeSet;
use std::ops::Index;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::types::{RawData, Relation};

/// Connection details published by one relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CassandraDetails {
    pub relation_id: String,
    /// `None` or empty when authentication is disabled.
    pub username: Option<String>,
    pub password: Option<String>,
    pub cluster_name: Option<String>,
    pub datacenter: Option<String>,
    pub rack: Option<String>,
    pub native_transport_port: Option<u16>,
    pub rpc_port: Option<u16>,
    /// Addresses of the currently joined units.
    pub hosts: BTreeSet<String>,
}

impl CassandraDetails {
    /// Builds a record for `relation`, or `None` if it has not published a
    /// `username` yet.
    pub fn from_relation(relation: &Relation) -> Option<Self> {
        let raw = relation.received();
        if !raw.contains_key("username") {
            debug!("Relation {} has no username yet, skipping", relation.relation_id);
            return None;
        }

        let text = |key: &str| raw.get(key).map(str::to_string);
        let hosts = relation
            .units
            .iter()
            .filter_map(|unit| unit.data.get("host"))
            .map(str::to_string)
            .collect();

        Some(Self {
            relation_id: relation.relation_id.clone(),
            username: text("username"),
            password: text("password"),
            cluster_name: text("cluster_name"),
            datacenter: text("datacenter"),
            rack: text("rack"),
            native_transport_port: port(&raw, "native_transport_port", &relation.relation_id),
            rpc_port: port(&raw, "rpc_port", &relation.relation_id),
            hosts,
        })
    }

    /// Username and password, if authentication is enabled.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => {
                Some((user, self.password.as_deref().unwrap_or_default()))
            }
            _ => None,
        }
    }
}

fn port(raw: &RawData, key: &str, relation_id: &str) -> Option<u16> {
    let value = raw.get(key)?;
    match value.trim().parse() {
        Ok(port) => Some(port),
        Err(_) => {
            warn!("Ignoring invalid {} {:?} on relation {}", key, value, relation_id);
            None
        }
    }
}

/// Details for every relation that has published them, in transport
/// order. Indexable by position or by relation id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsList {
    entries: IndexMap<String, CassandraDetails>,
}

impl DetailsList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&CassandraDetails> {
        self.get_index(0)
    }

    pub fn get_index(&self, index: usize) -> Option<&CassandraDetails> {
        self.entries.get_index(index).map(|(_, d)| d)
    }

    pub fn get(&self, relation_id: &str) -> Option<&CassandraDetails> {
        self.entries.get(relation_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CassandraDetails> {
        self.entries.values()
    }
}

impl FromIterator<CassandraDetails> for DetailsList {
    fn from_iter<I: IntoIterator<Item = CassandraDetails>>(iter: I) -> Self {
        let mut entries = IndexMap::new();
        for details in iter {
            if entries.contains_key(&details.relation_id) {
                warn!("Duplicate relation id {}, keeping the first", details.relation_id);
                continue;
            }
            entries.insert(details.relation_id.clone(), details);
        }
        Self { entries }
    }
}

impl Index<usize> for DetailsList {
    type Output = CassandraDetails;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl Index<&str> for DetailsList {
    type Output = CassandraDetails;

    fn index(&self, relation_id: &str) -> &Self::Output {
        &self.entries[relation_id]
    }
}

impl<'a> IntoIterator for &'a DetailsList {
    type Item = &'a CassandraDetails;
    type IntoIter = indexmap::map::Values<'a, String, CassandraDetails>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;

    fn data(pairs: &[(&str, &str)]) -> RawData {
        pairs.iter().copied().collect()
    }

    #[test]
    fn relation_without_username_is_skipped() {
        let rel = Relation::new("db:0").with_unit(Unit::new(
            "cassandra/0",
            data(&[("host", "10.0.0.1"), ("password", "x")]),
        ));
        assert_eq!(CassandraDetails::from_relation(&rel), None);
    }

    #[test]
    fn fields_copied_from_merged_data() {
        let rel = Relation::new("db:3")
            .with_application_data(data(&[("cluster_name", "main")]))
            .with_unit(Unit::new(
                "cassandra/0",
                data(&[
                    ("username", "cassandra"),
                    ("password", "secret"),
                    ("datacenter", "dc1"),
                    ("rack", "r1"),
                    ("native_transport_port", "9042"),
                    ("rpc_port", "9160"),
                    ("host", "10.0.0.1"),
                ]),
            ))
            .with_unit(Unit::new("cassandra/1", data(&[("host", "10.0.0.2")])))
            .with_unit(Unit::new("cassandra/2", RawData::new()));

        let details = CassandraDetails::from_relation(&rel).unwrap();
        assert_eq!(details.relation_id, "db:3");
        assert_eq!(details.credentials(), Some(("cassandra", "secret")));
        assert_eq!(details.cluster_name.as_deref(), Some("main"));
        assert_eq!(details.datacenter.as_deref(), Some("dc1"));
        assert_eq!(details.rack.as_deref(), Some("r1"));
        assert_eq!(details.native_transport_port, Some(9042));
        assert_eq!(details.rpc_port, Some(9160));
        assert_eq!(
            details.hosts.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["10.0.0.1", "10.0.0.2"]
        );
    }

    #[test]
    fn empty_username_disables_auth() {
        let rel = Relation::new("db:0").with_unit(Unit::new(
            "cassandra/0",
            data(&[("username", ""), ("host", "10.0.0.1")]),
        ));
        let details = CassandraDetails::from_relation(&rel).unwrap();
        assert_eq!(details.username.as_deref(), Some(""));
        assert_eq!(details.credentials(), None);
    }

    #[test]
    fn malformed_port_is_absent() {
        let rel = Relation::new("db:0").with_unit(Unit::new(
            "cassandra/0",
            data(&[("username", "u"), ("native_transport_port", "nine")]),
        ));
        let details = CassandraDetails::from_relation(&rel).unwrap();
        assert_eq!(details.native_transport_port, None);
        assert!(details.hosts.is_empty());
    }

    #[test]
    fn list_indexing() {
        let list: DetailsList = ["db:0", "db:1", "db:0"]
            .iter()
            .map(|id| CassandraDetails {
                relation_id: id.to_string(),
                ..Default::default()
            })
            .collect();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].relation_id, "db:0");
        assert_eq!(list["db:1"].relation_id, "db:1");
        assert!(list.get("db:2").is_none());
        assert_eq!(list.first().map(|d| d.relation_id.as_str()), Some("db:0"));
        assert_eq!((&list).into_iter().count(), 2);
    }
}
