//! The requires side of the Cassandra relation.
//!
//! Typical use from the hosting framework:
//!
//! ```no_run
//! use cassandra_endpoint::{CassandraEndpoint, CqlshrcWriter, Event, FlagRegistry, RelationSnapshot};
//! use cassandra_endpoint::flags::TriggerAction;
//!
//! # fn main() -> anyhow::Result<()> {
//! let snapshot = RelationSnapshot::load("relations.json".as_ref())?;
//! let mut endpoint = CassandraEndpoint::new("mydb", snapshot);
//! let mut flags = FlagRegistry::new();
//! flags.register_trigger(
//!     &endpoint.flags().changed,
//!     TriggerAction::Clear("myapp.configured".into()),
//! );
//!
//! endpoint.handle(&Event::Changed { keys: vec!["host".into()] }, &mut flags);
//! if flags.is_set(&endpoint.flags().available) && !flags.is_set("myapp.configured") {
//!     endpoint.write_cqlshrc(&CqlshrcWriter::for_account("root")?)?;
//!     flags.set("myapp.configured");
//! }
//! # Ok(())
//! # }
//! ```

use log::{debug, info};

use crate::cqlshrc::{CqlshrcWriter, RenderOutcome};
use crate::details::{CassandraDetails, DetailsList};
use crate::error::Result;
use crate::flags::{EndpointFlags, FlagRegistry};
use crate::source::RelationSource;
use crate::types::Event;

type Action<S> = fn(&CassandraEndpoint<S>, &mut FlagRegistry);

/// A handler runs when its flag is set at dispatch time.
struct Handler<S> {
    name: &'static str,
    when: String,
    action: Action<S>,
}

pub struct CassandraEndpoint<S> {
    name: String,
    flags: EndpointFlags,
    source: S,
    handlers: Vec<Handler<S>>,
}

impl<S: RelationSource> CassandraEndpoint<S> {
    pub fn new(endpoint_name: impl Into<String>, source: S) -> Self {
        let name = endpoint_name.into();
        let flags = EndpointFlags::new(&name);
        let handlers = vec![
            Handler {
                name: "server_changed",
                when: flags.changed_key("host"),
                action: Self::server_changed as Action<S>,
            },
            Handler {
                name: "server_departed",
                when: flags.departed.clone(),
                action: Self::server_departed as Action<S>,
            },
            Handler {
                name: "changed",
                when: flags.changed.clone(),
                action: Self::changed as Action<S>,
            },
        ];
        Self {
            name,
            flags,
            source,
            handlers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> &EndpointFlags {
        &self.flags
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Swaps in fresh transport state, e.g. after the framework reloaded it.
    pub fn replace_source(&mut self, source: S) -> S {
        std::mem::replace(&mut self.source, source)
    }

    /// Details for every relation that has published a username.
    ///
    /// Recomputed from the source on every call.
    pub fn details(&self) -> DetailsList {
        self.source
            .relations()
            .iter()
            .filter_map(CassandraDetails::from_relation)
            .collect()
    }

    /// Raises `available` iff at least one relation has published details.
    pub fn set_available(&self, registry: &mut FlagRegistry) {
        let count = self.details().len();
        let was = registry.is_set(&self.flags.available);
        registry.toggle(&self.flags.available, count > 0);
        if was != (count > 0) {
            info!(
                "Endpoint {} is now {} ({} relation(s) with details)",
                self.name,
                if count > 0 { "available" } else { "unavailable" },
                count
            );
        }
    }

    /// Raises the flags for `event`, then runs the handler table.
    pub fn handle(&self, event: &Event, registry: &mut FlagRegistry) {
        debug!("Endpoint {} received {:?}", self.name, event);
        match event {
            Event::Joined => registry.set(&self.flags.joined),
            Event::Changed { keys } => {
                registry.set(&self.flags.changed);
                for key in keys {
                    registry.set(&self.flags.changed_key(key));
                }
            }
            Event::Departed => registry.set(&self.flags.departed),
        }
        self.dispatch(registry);
    }

    /// Runs, in order, every handler whose flag is currently set.
    pub fn dispatch(&self, registry: &mut FlagRegistry) {
        for handler in &self.handlers {
            if registry.is_set(&handler.when) {
                debug!("Running handler {} for {}", handler.name, handler.when);
                (handler.action)(self, registry);
            }
        }
    }

    /// Renders the first relation's details through `writer`.
    pub fn write_cqlshrc(&self, writer: &CqlshrcWriter) -> Result<RenderOutcome> {
        writer.write(&self.details())
    }

    fn server_changed(&self, registry: &mut FlagRegistry) {
        self.set_available(registry);
        registry.clear(&self.flags.changed_key("host"));
    }

    fn server_departed(&self, registry: &mut FlagRegistry) {
        self.set_available(registry);
    }

    // Consumers react to `changed` through triggers, so it is reset here.
    fn changed(&self, registry: &mut FlagRegistry) {
        registry.clear(&self.flags.changed);
    }
}
