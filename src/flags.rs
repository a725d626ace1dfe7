//! Named boolean flags and the triggers attached to them.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

/// What a trigger does once its flag becomes set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    Set(String),
    Clear(String),
}

/// The set of currently raised flags.
///
/// Triggers fire on the unset → set transition of their flag only, so
/// setting a flag that is already set is a no-op.
#[derive(Debug, Default)]
pub struct FlagRegistry {
    active: BTreeSet<String>,
    triggers: BTreeMap<String, Vec<TriggerAction>>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, flag: &str) -> bool {
        self.active.contains(flag)
    }

    pub fn set(&mut self, flag: &str) {
        if !self.active.insert(flag.to_string()) {
            return;
        }
        debug!("Flag set: {}", flag);

        let actions = self.triggers.get(flag).cloned().unwrap_or_default();
        for action in actions {
            match action {
                TriggerAction::Set(target) => self.set(&target),
                TriggerAction::Clear(target) => self.clear(&target),
            }
        }
    }

    pub fn clear(&mut self, flag: &str) {
        if self.active.remove(flag) {
            debug!("Flag cleared: {}", flag);
        }
    }

    pub fn toggle(&mut self, flag: &str, value: bool) {
        if value {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    pub fn register_trigger(&mut self, when: &str, action: TriggerAction) {
        self.triggers
            .entry(when.to_string())
            .or_default()
            .push(action);
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }
}

/// Flag names derived from the endpoint's configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFlags {
    prefix: String,
    pub available: String,
    pub joined: String,
    pub changed: String,
    pub departed: String,
}

impl EndpointFlags {
    pub fn new(endpoint_name: &str) -> Self {
        let prefix = format!("endpoint.{}", endpoint_name);
        Self {
            available: format!("{}.available", prefix),
            joined: format!("{}.joined", prefix),
            changed: format!("{}.changed", prefix),
            departed: format!("{}.departed", prefix),
            prefix,
        }
    }

    /// `endpoint.<name>.changed.<key>`
    pub fn changed_key(&self, key: &str) -> String {
        format!("{}.changed.{}", self.prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names() {
        let flags = EndpointFlags::new("mydb");
        assert_eq!(flags.available, "endpoint.mydb.available");
        assert_eq!(flags.changed, "endpoint.mydb.changed");
        assert_eq!(flags.departed, "endpoint.mydb.departed");
        assert_eq!(flags.changed_key("host"), "endpoint.mydb.changed.host");
    }

    #[test]
    fn toggle_follows_value() {
        let mut registry = FlagRegistry::new();
        registry.toggle("a", true);
        assert!(registry.is_set("a"));
        registry.toggle("a", false);
        assert!(!registry.is_set("a"));
        registry.clear("a");
        assert!(!registry.is_set("a"));
    }

    #[test]
    fn trigger_fires_on_transition_only() {
        let mut registry = FlagRegistry::new();
        registry.register_trigger("changed", TriggerAction::Clear("configured".into()));

        registry.set("changed");
        registry.set("configured");
        // Already set: trigger must not fire again.
        registry.set("changed");
        assert!(registry.is_set("configured"));

        registry.clear("changed");
        registry.set("changed");
        assert!(!registry.is_set("configured"));
    }

    #[test]
    fn triggers_chain() {
        let mut registry = FlagRegistry::new();
        registry.register_trigger("a", TriggerAction::Set("b".into()));
        registry.register_trigger("b", TriggerAction::Set("c".into()));
        registry.set("a");
        assert_eq!(registry.active().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
