//! Raw shapes delivered by the relation transport.
//!
//! The transport hands over flat string maps: one per joined remote unit
//! and one for the relation as a whole. Nothing here is validated; typing
//! happens when [`crate::details`] records are built from these bags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A flat bag of string keys to string values as published by one side
/// of a relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawData(BTreeMap<String, String>);

impl RawData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RawData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One remote unit currently joined to a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit name, e.g. `cassandra/0`.
    pub name: String,
    #[serde(default)]
    pub data: RawData,
}

impl Unit {
    pub fn new(name: impl Into<String>, data: RawData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A relation bound to this endpoint, with the units presently joined.
///
/// Units that have departed are simply absent from `units`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub relation_id: String,
    /// Relation-level data, shadowed by anything a unit publishes.
    #[serde(default)]
    pub application_data: RawData,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Relation {
    pub fn new(relation_id: impl Into<String>) -> Self {
        Self {
            relation_id: relation_id.into(),
            application_data: RawData::new(),
            units: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_application_data(mut self, data: RawData) -> Self {
        self.application_data = data;
        self
    }

    /// Merged view of everything received on this relation.
    ///
    /// For a key published by several units the lowest-ordered unit wins.
    /// Relation-level data only fills keys no unit has published.
    pub fn received(&self) -> RawData {
        let mut merged = self.application_data.clone();
        for unit in self.units.iter().rev() {
            for (key, value) in unit.data.iter() {
                merged.insert(key, value);
            }
        }
        merged
    }
}

/// A notification from the hosting framework about this endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A remote unit joined one of the relations.
    Joined,
    /// Remote data changed. `keys` names the keys whose values changed.
    Changed {
        #[serde(default)]
        keys: Vec<String>,
    },
    /// A remote unit or a whole relation went away.
    Departed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> RawData {
        pairs.iter().copied().collect()
    }

    #[test]
    fn lowest_unit_takes_precedence() {
        let rel = Relation::new("db:0")
            .with_unit(Unit::new("cassandra/0", data(&[("username", "first")])))
            .with_unit(Unit::new(
                "cassandra/1",
                data(&[("username", "second"), ("rack", "r1")]),
            ));

        let merged = rel.received();
        assert_eq!(merged.get("username"), Some("first"));
        assert_eq!(merged.get("rack"), Some("r1"));
    }

    #[test]
    fn application_data_fills_gaps_only() {
        let rel = Relation::new("db:0")
            .with_application_data(data(&[("cluster_name", "app"), ("rack", "app-rack")]))
            .with_unit(Unit::new("cassandra/0", data(&[("rack", "unit-rack")])));

        let merged = rel.received();
        assert_eq!(merged.get("cluster_name"), Some("app"));
        assert_eq!(merged.get("rack"), Some("unit-rack"));
    }

    #[test]
    fn event_wire_format() {
        let event: Event =
            serde_json::from_str(r#"{"event":"changed","keys":["host"]}"#).unwrap();
        assert_eq!(
            event,
            Event::Changed {
                keys: vec!["host".into()]
            }
        );

        let event: Event = serde_json::from_str(r#"{"event":"departed"}"#).unwrap();
        assert_eq!(event, Event::Departed);

        let event: Event = serde_json::from_str(r#"{"event":"changed"}"#).unwrap();
        assert_eq!(event, Event::Changed { keys: vec![] });
    }
}
