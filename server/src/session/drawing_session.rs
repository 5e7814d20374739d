use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use comms::{
    command::UserCommand,
    event::{self, Event, Participant},
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::{AbortHandle, JoinSet},
};
use tracing::{debug, warn};

use crate::registry::{DrawingRoom, RoomRegistry};

/// [DrawingSession] carries one connection's state across all the rooms it
/// has joined: the assigned participant identity, a handle and forwarder
/// task per joined room, and the mpsc channel the forwarders aggregate the
/// room broadcasts into.
pub(super) struct DrawingSession {
    session_id: String,
    participant: Participant,
    room_registry: Arc<RoomRegistry>,
    joined_rooms: HashMap<String, (Arc<Mutex<DrawingRoom>>, AbortHandle)>,
    join_set: JoinSet<()>,
    mpsc_tx: mpsc::Sender<Event>,
    mpsc_rx: mpsc::Receiver<Event>,
}

impl DrawingSession {
    pub fn new(
        session_id: &str,
        participant: Participant,
        room_registry: Arc<RoomRegistry>,
    ) -> Self {
        let (mpsc_tx, mpsc_rx) = mpsc::channel(100);

        DrawingSession {
            session_id: String::from(session_id),
            participant,
            room_registry,
            joined_rooms: HashMap::new(),
            join_set: JoinSet::new(),
            mpsc_tx,
            mpsc_rx,
        }
    }

    /// Handle a user command in the context of the rooms this session joined.
    pub async fn handle_user_command(&mut self, cmd: UserCommand) -> anyhow::Result<()> {
        match cmd {
            UserCommand::JoinRoom(cmd) => {
                if self.joined_rooms.contains_key(&cmd.room) {
                    return Err(anyhow::anyhow!("already joined room '{}'", &cmd.room));
                }

                let room = self.room_registry.get_or_create(&cmd.room).await;
                let (broadcast_rx, snapshot) = {
                    let mut room = room.lock().await;
                    room.join(self.participant.clone())
                };

                // spawn a task to forward events broadcast in the room to the
                // user's mpsc channel, hence the user receives events from all
                // of their rooms via a single channel
                let abort_handle = self.join_set.spawn({
                    let mpsc_tx = self.mpsc_tx.clone();
                    let room = Arc::clone(&room);
                    let participant_id = self.participant.id.clone();

                    async move {
                        // hand the authoritative snapshot to the user before
                        // anything else, every broadcast queued behind it
                        // applies cleanly on top
                        if mpsc_tx.send(Event::RoomSnapshot(snapshot)).await.is_err() {
                            return;
                        }

                        forward_room_events(broadcast_rx, mpsc_tx, room, participant_id).await;
                    }
                });

                // store the room handle and the abort handle, used to interact
                // with the room and to cancel the forwarder on leave
                self.joined_rooms
                    .insert(cmd.room.clone(), (room, abort_handle));
            }
            UserCommand::CommitOperation(cmd) => {
                if let Some(room) = self.joined_room(&cmd.room) {
                    let result = room.lock().await.commit(cmd.operation, &self.participant);

                    if let Err(rejection) = result {
                        debug!(
                            "session {} had an operation rejected: {}",
                            self.session_id, rejection
                        );

                        // the session loop is this channel's only drainer, a
                        // blocking send against a full channel could never
                        // complete here; shed the notice instead
                        let reply = Event::OperationRejected(event::OperationRejectedReplyEvent {
                            room: cmd.room,
                            reason: rejection.to_string(),
                        });
                        if let Err(e) = self.mpsc_tx.try_send(reply) {
                            warn!(
                                "session {} dropped a rejection notice: {}",
                                self.session_id, e
                            );
                        }
                    }
                }
            }
            UserCommand::UndoLast(cmd) => {
                if let Some(room) = self.joined_room(&cmd.room) {
                    room.lock().await.undo();
                }
            }
            UserCommand::RedoLast(cmd) => {
                if let Some(room) = self.joined_room(&cmd.room) {
                    room.lock().await.redo();
                }
            }
            UserCommand::ClearCanvas(cmd) => {
                if let Some(room) = self.joined_room(&cmd.room) {
                    room.lock().await.clear();
                }
            }
            UserCommand::MoveCursor(cmd) => {
                if let Some(room) = self.joined_room(&cmd.room) {
                    room.lock()
                        .await
                        .publish_cursor(&self.participant, cmd.x, cmd.y);
                }
            }
            UserCommand::LeaveRoom(cmd) => {
                // remove the room from the joined set and stop its forwarder
                if let Some(joined) = self.joined_rooms.remove(&cmd.room) {
                    self.cleanup_room(joined).await;
                }
            }
            UserCommand::Quit(_) => {}
        }

        Ok(())
    }

    /// Leave all the rooms the user is currently participating in
    pub async fn leave_all_rooms(&mut self) {
        // drain the joined rooms to a variable, necessary to avoid borrowing self
        let drained = self.joined_rooms.drain().collect::<Vec<_>>();

        for (_, joined) in drained {
            self.cleanup_room(joined).await;
        }
    }

    /// Receive an event that may have originated from any of the rooms the user is actively participating in
    pub async fn recv(&mut self) -> anyhow::Result<Event> {
        self.mpsc_rx
            .recv()
            .await
            .context("could not recv from the aggregated event channel")
    }

    /// Look up a joined room by slug. Commands referencing a room this
    /// session never joined are dropped with a warning.
    fn joined_room(&self, slug: &str) -> Option<&Arc<Mutex<DrawingRoom>>> {
        let room = self.joined_rooms.get(slug).map(|(room, _)| room);

        if room.is_none() {
            warn!(
                "session {} referenced room '{}' without joining it",
                self.session_id, slug
            );
        }

        room
    }

    /// Remove the user from the room and stop forwarding its broadcasts.
    async fn cleanup_room(&mut self, (room, abort_handle): (Arc<Mutex<DrawingRoom>>, AbortHandle)) {
        room.lock().await.leave(&self.participant.id);

        abort_handle.abort();
    }
}

/// Forward events broadcast in a room into the session's aggregate channel.
///
/// The author's own operation broadcasts are dropped here; the committing
/// client has already rendered the operation locally. A receiver that lags
/// behind the room does not silently lose operations, it is handed a fresh
/// snapshot to re-render from; broadcasts already folded into that snapshot
/// are discarded rather than applied a second time.
async fn forward_room_events(
    mut broadcast_rx: broadcast::Receiver<Event>,
    mpsc_tx: mpsc::Sender<Event>,
    room: Arc<Mutex<DrawingRoom>>,
    participant_id: String,
) {
    loop {
        match broadcast_rx.recv().await {
            Ok(Event::OperationCommitted(event))
                if event.operation.author_id() == participant_id =>
            {
                // the author's own commit, nothing to forward
            }
            Ok(event) => {
                if mpsc_tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(
                    "a session lagged {} events behind its room, resyncing with a snapshot",
                    skipped
                );

                // every broadcast is published under the room lock, so
                // draining the receiver while holding it leaves nothing
                // queued that the snapshot does not already contain
                let snapshot = {
                    let room = room.lock().await;
                    loop {
                        match broadcast_rx.try_recv() {
                            Ok(_) => {}
                            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                            Err(broadcast::error::TryRecvError::Empty)
                            | Err(broadcast::error::TryRecvError::Closed) => break,
                        }
                    }
                    room.snapshot()
                };

                if mpsc_tx.send(Event::RoomSnapshot(snapshot)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
