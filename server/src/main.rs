use std::sync::Arc;

use anyhow::Context;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
    sync::broadcast,
    task::JoinSet,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{registry::RoomRegistry, storage::SnapshotStore};

mod registry;
mod session;
mod storage;

const DEFAULT_PORT: u16 = 8080;

/// Port to listen on, the `PORT` environment variable overrides the default.
fn configured_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Snapshot persistence is opt-in, rooms stay purely in memory unless
/// `SNAPSHOT_DIR` points at a usable directory.
fn configured_store() -> Option<Arc<SnapshotStore>> {
    let dir = std::env::var("SNAPSHOT_DIR").ok()?;
    let store = SnapshotStore::open(&dir).expect("could not open the snapshot directory");

    info!("persisting room snapshots under {}", dir);
    Some(Arc::new(store))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("server=info")),
        )
        .init();

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let room_registry = Arc::new(RoomRegistry::new(configured_store()));

    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to create interrupt signal stream");
    let port = configured_port();
    let server = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("could not bind to the port");
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    info!("listening on port {}", port);
    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                info!("server interrupted, gracefully shutting down");
                quit_tx.send(()).context("failed to send quit signal").unwrap();
                break;
            }
            Ok((socket, _)) = server.accept() => {
                join_set.spawn(session::handle_user_session(Arc::clone(&room_registry), quit_rx.resubscribe(), socket));
            }
        }
    }

    while join_set.join_next().await.is_some() {}
    info!("server shut down");
}
