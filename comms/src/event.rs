use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// One connected user's identity and display attributes within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque connection identity, assigned by the server.
    pub id: String,
    /// Name shown next to the user's cursor and in the roster.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Color used for the user's cursor and roster entry.
    pub color: String,
}

/// The server has accepted the connection and assigned it an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInitReplyEvent {
    /// The id of the session created for this connection.
    #[serde(rename = "s")]
    pub session_id: String,
    /// The participant identity assigned to this connection.
    #[serde(rename = "u")]
    pub participant: Participant,
}

/// The full authoritative state of a room.
/// Sent as a reply on join; broadcast to the whole room after an undo or redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshotEvent {
    /// The slug of the room the snapshot describes.
    #[serde(rename = "r")]
    pub room: String,
    /// Committed operations in apply order; replaying them over an empty
    /// canvas reproduces the room's visual state.
    #[serde(rename = "ops")]
    pub operations: Vec<Operation>,
    /// Everyone currently in the room.
    #[serde(rename = "users")]
    pub participants: Vec<Participant>,
}

/// An operation has been appended to a room's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationBroadcastEvent {
    /// The slug of the room the operation was committed to.
    #[serde(rename = "r")]
    pub room: String,
    /// The committed operation, author already stamped.
    #[serde(rename = "op")]
    pub operation: Operation,
}

/// The set of participants in a room has changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceBroadcastEvent {
    /// The slug of the room whose roster changed.
    #[serde(rename = "r")]
    pub room: String,
    /// The room's full roster after the change.
    #[serde(rename = "users")]
    pub participants: Vec<Participant>,
}

/// A room's canvas and history have been wiped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasClearedBroadcastEvent {
    /// The slug of the room that was cleared.
    #[serde(rename = "r")]
    pub room: String,
}

/// A participant moved their cursor on a room's canvas. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorBroadcastEvent {
    /// The slug of the room the cursor is hovering over.
    #[serde(rename = "r")]
    pub room: String,
    /// Who moved, with the attributes needed to render the cursor.
    #[serde(rename = "u")]
    pub participant: Participant,
    pub x: f64,
    pub y: f64,
}

/// The server rejected an operation before it reached the room's history.
/// Sent only to the session that submitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRejectedReplyEvent {
    /// The slug of the room the operation targeted.
    #[serde(rename = "r")]
    pub room: String,
    /// Human-readable reason for the rejection.
    #[serde(rename = "m")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
/// Events that can be sent to the client
/// Events may concern different users and rooms, the recipient is a single drawing session
pub enum Event {
    SessionInit(SessionInitReplyEvent),
    RoomSnapshot(RoomSnapshotEvent),
    OperationCommitted(OperationBroadcastEvent),
    PresenceUpdate(PresenceBroadcastEvent),
    CanvasCleared(CanvasClearedBroadcastEvent),
    CursorMoved(CursorBroadcastEvent),
    OperationRejected(OperationRejectedReplyEvent),
}
