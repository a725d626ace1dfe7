//! Daemon that keeps a cqlshrc in step with the Cassandra relation.
//!
//! Reads newline-delimited JSON events on stdin, e.g.
//! `{"event":"changed","keys":["host"]}`, reloads the relation snapshot
//! for each one and re-renders the file when availability changes.

use std::future::Future;
use std::io;
use std::path::Path;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;

use cassandra_endpoint::config::Config;
use cassandra_endpoint::flags::TriggerAction;
use cassandra_endpoint::{
    CassandraEndpoint, CqlshrcWriter, Event, FlagRegistry, RelationSnapshot, RelationSource,
};

/// Raised once the current details have been rendered.
const CONFIGURED: &str = "cqlshrc.configured";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting cassandra-endpoint with config: {:?}", cfg);

    let writer = match &cfg.cqlshrc_path {
        Some(path) => CqlshrcWriter::at(path),
        None => CqlshrcWriter::for_account(&cfg.owner)?,
    };
    info!("Rendering to {}", writer.path().display());

    let snapshot = RelationSnapshot::load(&cfg.relation_state)?;
    let mut endpoint = CassandraEndpoint::new(cfg.endpoint_name.clone(), snapshot);
    let mut flags = FlagRegistry::new();
    flags.register_trigger(
        &endpoint.flags().changed,
        TriggerAction::Clear(CONFIGURED.into()),
    );

    // Starting up counts as a recomputation. The file left by a previous run
    // is not trusted, so force one render either way.
    endpoint.set_available(&mut flags);
    mark_stale(&endpoint, &mut flags);
    reconcile(&endpoint, &mut flags, &writer);

    let (event_tx, event_rx) = mpsc::channel(128);
    let reader_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<Event>(&line) {
                    Ok(event) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed event {:?}: {}", line, e),
                },
                Ok(None) => {
                    info!("Event stream closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read events: {}", e);
                    break;
                }
            }
        }
    });

    event_loop(
        &mut endpoint,
        &mut flags,
        &writer,
        &cfg.relation_state,
        event_rx,
        signal::ctrl_c(),
    )
    .await;

    reader_handle.abort();
    info!("Shutdown complete.");
    Ok(())
}

/// Handles events one at a time until `shutdown` resolves.
///
/// The end of the event stream does not stop the loop.
async fn event_loop<F>(
    endpoint: &mut CassandraEndpoint<RelationSnapshot>,
    flags: &mut FlagRegistry,
    writer: &CqlshrcWriter,
    relation_state: &Path,
    mut event_rx: mpsc::Receiver<Event>,
    shutdown: F,
) where
    F: Future<Output = io::Result<()>>,
{
    tokio::pin!(shutdown);
    let mut events_open = true;

    loop {
        tokio::select! {
            event = event_rx.recv(), if events_open => {
                let Some(event) = event else {
                    info!("No more events, waiting for shutdown");
                    events_open = false;
                    continue;
                };
                match RelationSnapshot::load(relation_state) {
                    Ok(snapshot) => {
                        endpoint.replace_source(snapshot);
                    }
                    Err(e) => {
                        error!("Keeping previous relation state: {}", e);
                    }
                }
                apply_event(endpoint, flags, &event);
                reconcile(endpoint, flags, writer);
            }
            res = &mut shutdown => {
                match res {
                    Ok(()) => info!("Received Ctrl+C, shutting down..."),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                }
                break;
            }
        }
    }
}

/// Dispatches `event` and marks the file stale when it may no longer match.
///
/// A departure can take away the rendered host without touching `changed`,
/// and `departed` stays raised, so its trigger would only fire once.
fn apply_event<S: RelationSource>(
    endpoint: &CassandraEndpoint<S>,
    flags: &mut FlagRegistry,
    event: &Event,
) {
    endpoint.handle(event, flags);
    if matches!(event, Event::Departed) {
        mark_stale(endpoint, flags);
    }
}

/// Makes the next `reconcile` render (or remove) whatever the current state.
fn mark_stale<S: RelationSource>(endpoint: &CassandraEndpoint<S>, flags: &mut FlagRegistry) {
    let available = flags.is_set(&endpoint.flags().available);
    flags.toggle(CONFIGURED, !available);
}

/// Renders when the endpoint gains details the file does not reflect yet,
/// and removes the file once the endpoint loses them.
fn reconcile<S: RelationSource>(
    endpoint: &CassandraEndpoint<S>,
    flags: &mut FlagRegistry,
    writer: &CqlshrcWriter,
) {
    let available = flags.is_set(&endpoint.flags().available);
    let configured = flags.is_set(CONFIGURED);
    if available == configured {
        debug!("Nothing to reconcile (available={})", available);
        return;
    }

    match endpoint.write_cqlshrc(writer) {
        Ok(outcome) => {
            info!("cqlshrc reconciled: {:?}", outcome);
            flags.toggle(CONFIGURED, available);
        }
        Err(e) => error!("Failed to render cqlshrc: {}", e),
    }
}
