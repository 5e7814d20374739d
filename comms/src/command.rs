use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// User Command for joining a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomCommand {
    // The room to join.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command for leaving a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomCommand {
    // The room to leave.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command for committing a drawing operation to a room's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOperationCommand {
    // The room whose canvas the operation draws on.
    #[serde(rename = "r")]
    pub room: String,
    // The operation to commit. Its author is assigned by the server.
    #[serde(rename = "op")]
    pub operation: Operation,
}

/// User Command for undoing the most recently committed operation in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoLastCommand {
    // The room whose history to undo.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command for re-applying the most recently undone operation in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedoLastCommand {
    // The room whose history to redo.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command for wiping a room's canvas, history included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearCanvasCommand {
    // The room whose canvas to clear.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command reporting the sender's cursor position on a room's canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCursorCommand {
    // The room the cursor is hovering over.
    #[serde(rename = "r")]
    pub room: String,
    pub x: f64,
    pub y: f64,
}

/// User Command for quitting the whole drawing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuitCommand;

/// A user command which can be sent to the server by a single user session.
/// All commands are processed in the context of the sync server paired with an individual user session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "snake_case")]
pub enum UserCommand {
    JoinRoom(JoinRoomCommand),
    LeaveRoom(LeaveRoomCommand),
    CommitOperation(CommitOperationCommand),
    UndoLast(UndoLastCommand),
    RedoLast(RedoLastCommand),
    ClearCanvas(ClearCanvasCommand),
    MoveCursor(MoveCursorCommand),
    Quit(QuitCommand),
}
