use std::pin::Pin;

use tokio_stream::Stream;

/// Frame delimiter of the wire protocol; every command and event is a single
/// JSON document terminated by this sequence.
pub const NEW_LINE: &[u8; 2] = b"\r\n";

/// A heap-allocated stream of protocol items read from one TCP half.
pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;
