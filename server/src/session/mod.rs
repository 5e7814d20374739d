use std::sync::Arc;

use comms::{command::UserCommand, event, transport};
use nanoid::nanoid;
use tokio::{net::TcpStream, sync::broadcast};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::registry::RoomRegistry;

use self::drawing_session::DrawingSession;

mod drawing_session;
mod identity;

/// Given a tcp stream and the room registry, handles the user session
/// until the user quits the session, or the tcp stream is closed for some reason, or the server shuts down
pub async fn handle_user_session(
    room_registry: Arc<RoomRegistry>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let session_id = nanoid!();
    // There is no login system, each connection gets a fresh random identity
    let participant = identity::assign();
    // Split the tcp stream into a command stream and an event writer with better ergonomics
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);

    info!(
        "session {} connected as '{}'",
        session_id, participant.display_name
    );

    // Welcoming the user with the identity their session was assigned
    event_writer
        .write(&event::Event::SessionInit(event::SessionInitReplyEvent {
            session_id: session_id.clone(),
            participant: participant.clone(),
        }))
        .await?;

    // Drawing Session will abstract the session handling logic for multiple rooms
    let mut drawing_session = DrawingSession::new(&session_id, participant, room_registry);

    loop {
        tokio::select! {
            cmd = commands.next() => match cmd {
                // If the user closes the tcp stream, or sends a quit cmd
                // We need to cleanup resources in a way that the other users are notified about the user's departure
                None | Some(Ok(UserCommand::Quit(_))) => {
                    drawing_session.leave_all_rooms().await;
                    break;
                }
                // Handle a valid user command in the context of the drawing session.
                // A failure here still has to release the participant from
                // every roster, presence must not leak
                Some(Ok(cmd)) => {
                    if let Err(e) = drawing_session.handle_user_command(cmd).await {
                        drawing_session.leave_all_rooms().await;
                        return Err(e);
                    }
                }
                // A malformed line must not corrupt any room state or take the
                // server down, skip it and keep the session alive
                Some(Err(e)) => {
                    warn!("session {} sent an unreadable command: {:#}", session_id, e);
                }
            },
            // Aggregated events from the joined rooms are sent to the user
            Ok(event) = drawing_session.recv() => {
                if let Err(e) = event_writer.write(&event).await {
                    drawing_session.leave_all_rooms().await;
                    return Err(e);
                }
            }
            // If the server is shutting down, we can just close the tcp streams
            // and exit the session handler. Since the server is shutting down,
            // we don't need to notify other users about the user's departure or cleanup resources
            Ok(_) = quit_rx.recv() => {
                drop(event_writer);
                debug!("gracefully shutting down user tcp stream");
                break;
            }
        }
    }

    info!("session {} disconnected", session_id);

    Ok(())
}
