mod drawing_room;
mod operation_log;
mod roster;

pub use self::drawing_room::DrawingRoom;
