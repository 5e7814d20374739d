use comms::event::Participant;

/// [ParticipantRoster] keeps track of who is currently in a room.
///
/// Entries are kept in insertion order so that two snapshots taken back to
/// back list everyone in the same order.
#[derive(Debug, Default)]
pub struct ParticipantRoster {
    participants: Vec<Participant>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        ParticipantRoster::default()
    }

    /// Add a participant to the roster. Re-adding an existing id keeps its
    /// place and overwrites the display attributes; some transports reuse
    /// identities across reconnects.
    pub fn add(&mut self, participant: Participant) {
        match self
            .participants
            .iter_mut()
            .find(|existing| existing.id == participant.id)
        {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    /// Remove the participant with the given id. Removing an id that is not
    /// present does nothing.
    pub fn remove(&mut self, id: &str) {
        self.participants.retain(|participant| participant.id != id);
    }

    /// Everyone currently present, in insertion order.
    pub fn list(&self) -> Vec<Participant> {
        self.participants.clone()
    }
}
