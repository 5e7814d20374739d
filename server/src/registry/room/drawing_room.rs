use std::sync::Arc;

use comms::{
    event::{self, Event, Participant},
    operation::{InvalidOperation, Operation},
};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::storage::SnapshotStore;

use super::{operation_log::OperationLog, roster::ParticipantRoster};

const BROADCAST_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug)]
/// [DrawingRoom] owns one room's operation history, its participants and the
/// primary broadcast channel.
///
/// All mutations happen under the room lock and publish their events before
/// the lock is released, so receivers observe broadcasts in the exact order
/// the operations were applied.
pub struct DrawingRoom {
    slug: String,
    log: OperationLog,
    roster: ParticipantRoster,
    broadcast_tx: broadcast::Sender<Event>,
    save_tx: Option<mpsc::UnboundedSender<Vec<Operation>>>,
}

impl DrawingRoom {
    pub fn new(slug: &str, store: Option<Arc<SnapshotStore>>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        DrawingRoom {
            slug: String::from(slug),
            log: OperationLog::new(),
            roster: ParticipantRoster::new(),
            broadcast_tx,
            save_tx: store.map(|store| spawn_room_saver(slug, store)),
        }
    }

    /// Replace the room's history with a previously stored sequence.
    /// Only meaningful before the room is handed out to any session.
    pub fn restore_history(&mut self, operations: Vec<Operation>) {
        self.log.restore(operations);
    }

    /// Add a participant to the room and broadcast the updated roster.
    ///
    /// # Returns
    ///
    /// - A broadcast receiver for the events published in this room; it is
    ///   subscribed before the roster changes, so the join's own presence
    ///   update is the first thing it yields
    /// - The snapshot the joining client must render before applying any
    ///   further broadcasts
    pub fn join(
        &mut self,
        participant: Participant,
    ) -> (broadcast::Receiver<Event>, event::RoomSnapshotEvent) {
        let broadcast_rx = self.broadcast_tx.subscribe();

        self.roster.add(participant);
        self.broadcast_presence();

        (broadcast_rx, self.snapshot())
    }

    /// Remove a participant from the room and broadcast the updated roster.
    pub fn leave(&mut self, participant_id: &str) {
        self.roster.remove(participant_id);
        self.broadcast_presence();
    }

    /// Validate, stamp and append an operation, then broadcast it to the
    /// whole room. A rejected operation never reaches the history and is
    /// never broadcast; what to tell the author is the caller's call.
    pub fn commit(
        &mut self,
        operation: Operation,
        author: &Participant,
    ) -> Result<Operation, InvalidOperation> {
        operation.validate()?;

        let operation = operation.stamped(&author.id);
        self.log.append(operation.clone());

        let _ = self
            .broadcast_tx
            .send(Event::OperationCommitted(event::OperationBroadcastEvent {
                room: self.slug.clone(),
                operation: operation.clone(),
            }));
        self.schedule_save();

        Ok(operation)
    }

    /// Undo the most recently committed operation. The full snapshot is
    /// broadcast even when there was nothing to undo, so every client
    /// re-renders from the authoritative state either way.
    pub fn undo(&mut self) -> Option<Operation> {
        let undone = self.log.undo_last();

        self.broadcast_snapshot();
        if undone.is_some() {
            self.schedule_save();
        }

        undone
    }

    /// Re-apply the most recently undone operation. Broadcasts the full
    /// snapshot even when the redo buffer was empty.
    pub fn redo(&mut self) -> Option<Operation> {
        let redone = self.log.redo_last();

        self.broadcast_snapshot();
        if redone.is_some() {
            self.schedule_save();
        }

        redone
    }

    /// Wipe the canvas and both history buffers, then tell the whole room.
    pub fn clear(&mut self) {
        self.log.clear();

        let _ = self
            .broadcast_tx
            .send(Event::CanvasCleared(event::CanvasClearedBroadcastEvent {
                room: self.slug.clone(),
            }));
        self.schedule_save();
    }

    /// Relay a participant's cursor position to everyone in the room, the
    /// sender included. Cursor traffic never touches the history.
    pub fn publish_cursor(&self, participant: &Participant, x: f64, y: f64) {
        let _ = self
            .broadcast_tx
            .send(Event::CursorMoved(event::CursorBroadcastEvent {
                room: self.slug.clone(),
                participant: participant.clone(),
                x,
                y,
            }));
    }

    /// The authoritative state a client needs to render the room from scratch.
    pub fn snapshot(&self) -> event::RoomSnapshotEvent {
        event::RoomSnapshotEvent {
            room: self.slug.clone(),
            operations: self.log.operations().to_vec(),
            participants: self.roster.list(),
        }
    }

    fn broadcast_presence(&self) {
        let _ = self
            .broadcast_tx
            .send(Event::PresenceUpdate(event::PresenceBroadcastEvent {
                room: self.slug.clone(),
                participants: self.roster.list(),
            }));
    }

    fn broadcast_snapshot(&self) {
        let _ = self.broadcast_tx.send(Event::RoomSnapshot(self.snapshot()));
    }

    /// Queue the committed history for the room's writer task, the room
    /// lock is never held across file I/O. Failures are logged and the
    /// in-memory state stands.
    fn schedule_save(&self) {
        if let Some(save_tx) = &self.save_tx {
            let _ = save_tx.send(self.log.operations().to_vec());
        }
    }
}

/// One writer task per room works off the queued histories in order, so the
/// last state change always wins on disk. A burst of queued states is
/// collapsed to its newest entry before writing.
fn spawn_room_saver(
    slug: &str,
    store: Arc<SnapshotStore>,
) -> mpsc::UnboundedSender<Vec<Operation>> {
    let (save_tx, mut save_rx) = mpsc::unbounded_channel::<Vec<Operation>>();
    let slug = String::from(slug);

    tokio::spawn(async move {
        while let Some(mut operations) = save_rx.recv().await {
            while let Ok(newer) = save_rx.try_recv() {
                operations = newer;
            }

            if let Err(e) = store.save(&slug, &operations).await {
                warn!("could not persist room '{}': {:#}", slug, e);
            }
        }
    });

    save_tx
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use comms::operation::{Point, StrokeOperation, StrokeTool};

    use super::*;

    fn participant(id: &str) -> Participant {
        Participant {
            id: id.to_string(),
            display_name: format!("user {}", id),
            color: "#ef4444".to_string(),
        }
    }

    fn stroke() -> Operation {
        Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Brush,
            color: "#3b82f6".to_string(),
            width_px: 4.0,
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
            author_id: String::new(),
        })
    }

    #[tokio::test]
    async fn commit_stamps_the_author_and_broadcasts_to_the_room() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut observer_rx, _) = room.join(participant("u2"));
        // drain the observer's own join presence update
        observer_rx.recv().await.unwrap();

        let committed = room.commit(stroke(), &author).unwrap();

        assert_eq!(committed.author_id(), "u1");
        assert_eq!(room.snapshot().operations, vec![committed.clone()]);

        match observer_rx.recv().await.unwrap() {
            Event::OperationCommitted(event) => {
                assert_eq!(event.room, "alpha");
                assert_eq!(event.operation, committed);
            }
            other => panic!("expected an operation broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_operations_reach_neither_the_history_nor_the_room() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut observer_rx, _) = room.join(participant("u2"));
        observer_rx.recv().await.unwrap();

        let empty_stroke = Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Brush,
            color: "#3b82f6".to_string(),
            width_px: 4.0,
            points: Vec::new(),
            author_id: String::new(),
        });

        let result = room.commit(empty_stroke, &author);

        assert_eq!(result, Err(InvalidOperation::EmptyStroke));
        assert!(room.snapshot().operations.is_empty());
        assert!(matches!(
            observer_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn undo_and_redo_broadcast_full_snapshots() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut rx, _) = room.join(author.clone());
        rx.recv().await.unwrap();

        let committed = room.commit(stroke(), &author).unwrap();
        rx.recv().await.unwrap();

        assert_eq!(room.undo(), Some(committed.clone()));
        match rx.recv().await.unwrap() {
            Event::RoomSnapshot(snapshot) => assert!(snapshot.operations.is_empty()),
            other => panic!("expected a snapshot broadcast, got {:?}", other),
        }

        assert_eq!(room.redo(), Some(committed.clone()));
        match rx.recv().await.unwrap() {
            Event::RoomSnapshot(snapshot) => {
                assert_eq!(snapshot.operations, vec![committed]);
            }
            other => panic!("expected a snapshot broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn undo_on_an_empty_room_still_broadcasts_the_snapshot() {
        let mut room = DrawingRoom::new("alpha", None);
        let (mut rx, _) = room.join(participant("u1"));
        rx.recv().await.unwrap();

        assert_eq!(room.undo(), None);

        match rx.recv().await.unwrap() {
            Event::RoomSnapshot(snapshot) => assert!(snapshot.operations.is_empty()),
            other => panic!("expected a snapshot broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn clear_wipes_the_history_and_notifies_the_room() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut rx, _) = room.join(author.clone());
        rx.recv().await.unwrap();

        room.commit(stroke(), &author).unwrap();
        rx.recv().await.unwrap();

        room.clear();

        assert!(room.snapshot().operations.is_empty());
        match rx.recv().await.unwrap() {
            Event::CanvasCleared(event) => assert_eq!(event.room, "alpha"),
            other => panic!("expected a clear broadcast, got {:?}", other),
        }

        // nothing to redo after a clear
        assert_eq!(room.redo(), None);
    }

    #[tokio::test]
    async fn joining_yields_the_snapshot_and_everyone_gets_the_presence_update() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut first_rx, first_snapshot) = room.join(author.clone());

        assert!(first_snapshot.operations.is_empty());
        assert_eq!(first_snapshot.participants.len(), 1);

        room.commit(stroke(), &author).unwrap();

        let (_, second_snapshot) = room.join(participant("u2"));
        assert_eq!(second_snapshot.operations.len(), 1);
        assert_eq!(second_snapshot.participants.len(), 2);

        // the first participant sees: own join, the commit, the second join
        match first_rx.recv().await.unwrap() {
            Event::PresenceUpdate(event) => assert_eq!(event.participants.len(), 1),
            other => panic!("expected a presence update, got {:?}", other),
        }
        first_rx.recv().await.unwrap();
        match first_rx.recv().await.unwrap() {
            Event::PresenceUpdate(event) => assert_eq!(event.participants.len(), 2),
            other => panic!("expected a presence update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn leaving_broadcasts_the_shrunk_roster() {
        let mut room = DrawingRoom::new("alpha", None);
        let (mut rx, _) = room.join(participant("u1"));
        rx.recv().await.unwrap();
        room.join(participant("u2"));
        rx.recv().await.unwrap();

        room.leave("u2");

        match rx.recv().await.unwrap() {
            Event::PresenceUpdate(event) => {
                assert_eq!(event.participants.len(), 1);
                assert_eq!(event.participants[0].id, "u1");
            }
            other => panic!("expected a presence update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cursor_relay_reaches_the_room_without_touching_the_history() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut rx, _) = room.join(author.clone());
        rx.recv().await.unwrap();

        room.publish_cursor(&author, 12.0, 34.0);

        match rx.recv().await.unwrap() {
            Event::CursorMoved(event) => {
                assert_eq!(event.participant.id, "u1");
                assert_eq!((event.x, event.y), (12.0, 34.0));
            }
            other => panic!("expected a cursor broadcast, got {:?}", other),
        }
        assert!(room.snapshot().operations.is_empty());
    }

    #[tokio::test]
    async fn broadcasts_arrive_in_apply_order() {
        let mut room = DrawingRoom::new("alpha", None);
        let author = participant("u1");
        let (mut rx, _) = room.join(author.clone());
        rx.recv().await.unwrap();

        let first = room.commit(stroke(), &author).unwrap();
        room.undo();
        let second = room.commit(stroke(), &author).unwrap();

        match rx.recv().await.unwrap() {
            Event::OperationCommitted(event) => assert_eq!(event.operation, first),
            other => panic!("expected an operation broadcast, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            Event::RoomSnapshot(snapshot) => assert!(snapshot.operations.is_empty()),
            other => panic!("expected a snapshot broadcast, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            Event::OperationCommitted(event) => assert_eq!(event.operation, second),
            other => panic!("expected an operation broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_burst_of_changes_settles_the_store_on_the_final_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SnapshotStore::open(dir.path()).unwrap());
        let mut room = DrawingRoom::new("alpha", Some(Arc::clone(&store)));
        let author = participant("u1");

        // every change queues a save; the writer works them off in order,
        // so whatever happened last is what the store must end up holding
        for _ in 0..3 {
            room.commit(stroke(), &author).unwrap();
        }
        room.clear();

        let mut stored = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stored = store.load("alpha").await.unwrap();
            if stored == Some(Vec::new()) {
                break;
            }
        }
        assert_eq!(stored, Some(Vec::new()));

        // no save queued before the clear may land after it
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.load("alpha").await.unwrap(), Some(Vec::new()));
    }
}
