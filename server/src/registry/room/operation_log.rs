use comms::operation::Operation;

/// Ordered history of everything drawn in one room.
///
/// Undo and redo are global to the room: there is one shared history, not a
/// per-author one. Any append invalidates the redo buffer, even when the new
/// operation comes from a different author than the undone ones. Clients rely
/// on this exact rule to stay convergent, so it is not something to "fix".
#[derive(Debug, Default)]
pub struct OperationLog {
    committed: Vec<Operation>,
    undone: Vec<Operation>,
}

impl OperationLog {
    pub fn new() -> Self {
        OperationLog::default()
    }

    /// Committed operations in apply order.
    pub fn operations(&self) -> &[Operation] {
        &self.committed
    }

    /// Append a new committed operation. Any pending redo history is
    /// invalidated by new work.
    pub fn append(&mut self, operation: Operation) {
        self.committed.push(operation);
        self.undone.clear();
    }

    /// Remove the most recently committed operation and park it for redo.
    /// Returns [None] when there is nothing to undo.
    pub fn undo_last(&mut self) -> Option<Operation> {
        let operation = self.committed.pop()?;
        self.undone.push(operation.clone());

        Some(operation)
    }

    /// Re-apply the most recently undone operation.
    /// Returns [None] when there is nothing to redo.
    pub fn redo_last(&mut self) -> Option<Operation> {
        let operation = self.undone.pop()?;
        self.committed.push(operation.clone());

        Some(operation)
    }

    /// Wipe both the committed history and the redo buffer.
    /// There is no undo of a clear.
    pub fn clear(&mut self) {
        self.committed.clear();
        self.undone.clear();
    }

    /// Replace the committed history with a previously stored sequence.
    /// Used when a room is rebuilt from the snapshot store.
    pub fn restore(&mut self, operations: Vec<Operation>) {
        self.committed = operations;
        self.undone.clear();
    }
}
