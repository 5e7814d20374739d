use std::time::Duration;

use comms::{
    command::{CommitOperationCommand, JoinRoomCommand, UndoLastCommand, UserCommand},
    event::Event,
    operation::{Operation, Point, StrokeOperation, StrokeTool},
    transport,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpStream, task::JoinSet};
use tokio_stream::StreamExt;

/// Sketch Bots for the Whiteboard Server
///
/// Generates synthetic load with bots that join rooms and draw random strokes,
/// occasionally undoing their latest work. The number of bots, the rooms joined
/// per bot and the drawing pace can be configured.
///
/// !IMPORTANT! Be sure to check and configure your socket limits, before you run the bots

const SERVER_ADDR: &str = "localhost:8080";
// Rooms are created lazily on the first join, any slug works
const ROOM_SLUGS: &[&str] = &[
    "sprint-retro",
    "design-review",
    "daily-standup",
    "brainstorm",
    "roadmap",
    "architecture",
    "onboarding",
    "ux-lab",
];
const STROKE_COLORS: &[&str] = &["#ef4444", "#22c55e", "#3b82f6", "#eab308", "#a855f7"];

/// Load Configuration
// The number of bots to spawn, distributed across the load increments
const LOAD_INCREMENTS: &str = r#"[
    { "bot_count": 300, "after": { "secs": 30, "nanos": 0 }, "steps": 30 },
    { "bot_count": 600, "after": { "secs": 60, "nanos": 0 }, "steps": 30 }
]"#;
// How many rooms a bot should join, this affects the total tokio task count
const NUMBER_OF_ROOMS_TO_JOIN: usize = 3;
// How many milliseconds to wait between each stroke
const BOT_DRAW_DELAY_MILLIS: u64 = 5_000;
// One in this many strokes is followed by an undo
const UNDO_EVERY: u64 = 8;

/// [RotatingIterator] is a simple iterator that rotates through a list of items
/// and starts from the beginning when the end is reached.
struct RotatingIterator<T> {
    items: Vec<T>,
    current: usize,
}

impl<T> RotatingIterator<T> {
    fn new(items: Vec<T>) -> Self {
        Self { items, current: 0 }
    }
}

impl<T: Clone> Iterator for RotatingIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.get(self.current).cloned();
        self.current = (self.current + 1) % self.items.len();
        item
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoadIncrements {
    bot_count: usize,
    after: Duration,
    steps: usize,
}

/// A short random polyline wandering from a random starting point.
fn random_stroke<R: Rng>(rng: &mut R) -> Operation {
    let mut x = rng.gen_range(0.0..1280.0);
    let mut y = rng.gen_range(0.0..720.0);
    let points = (0..rng.gen_range(2..16))
        .map(|_| {
            x += rng.gen_range(-20.0..20.0);
            y += rng.gen_range(-20.0..20.0);
            Point { x, y }
        })
        .collect();

    Operation::Stroke(StrokeOperation {
        tool: StrokeTool::Brush,
        color: String::from(STROKE_COLORS[rng.gen_range(0..STROKE_COLORS.len())]),
        width_px: rng.gen_range(1.0..8.0),
        points,
        author_id: String::new(),
    })
}

async fn spawn_single_bot(rooms_to_join: Vec<String>) -> anyhow::Result<()> {
    let result = spawn_single_bot_raw(rooms_to_join).await;

    match result.as_ref() {
        Ok(_) => println!("exited without problems"),
        Err(err) => println!("some error occurred = {}", err),
    }

    result
}

async fn spawn_single_bot_raw(rooms_to_join: Vec<String>) -> anyhow::Result<()> {
    let tcp_stream = TcpStream::connect(SERVER_ADDR).await?;
    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);

    let _init_event = match event_stream.next().await {
        Some(Ok(Event::SessionInit(init_event))) => init_event,
        _ => return Err(anyhow::anyhow!("server did not send the session init")),
    };

    for room_slug in rooms_to_join.iter() {
        command_writer
            .write(&UserCommand::JoinRoom(JoinRoomCommand {
                room: String::from(room_slug),
            }))
            .await?;
    }

    let join_handle = tokio::spawn({
        let mut rng = StdRng::from_entropy();
        let mut rooms_iterator = RotatingIterator::new(rooms_to_join);
        let to_sleep = Duration::from_millis(BOT_DRAW_DELAY_MILLIS);

        async move {
            // sleep initially for a time to distribute the drawing times
            tokio::time::sleep(Duration::from_millis(
                rng.gen_range(1..BOT_DRAW_DELAY_MILLIS),
            ))
            .await;

            loop {
                let room_slug = rooms_iterator.next().unwrap();
                let _ = command_writer
                    .write(&UserCommand::CommitOperation(CommitOperationCommand {
                        room: room_slug.clone(),
                        operation: random_stroke(&mut rng),
                    }))
                    .await;

                if rng.gen_range(0..UNDO_EVERY) == 0 {
                    let _ = command_writer
                        .write(&UserCommand::UndoLast(UndoLastCommand { room: room_slug }))
                        .await;
                }

                tokio::time::sleep(to_sleep).await;
            }
        }
    });

    while event_stream.next().await.is_some() {}

    join_handle.abort();
    Ok(())
}

#[tokio::main]
async fn main() {
    let load_increments: Vec<LoadIncrements> =
        serde_json::from_str(LOAD_INCREMENTS).expect("could not parse the load increments");

    let mut room_iterator =
        RotatingIterator::new(ROOM_SLUGS.iter().map(|slug| String::from(*slug)).collect());
    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();

    let mut current: usize = 0;
    for li in load_increments {
        let diff = li.bot_count - current;
        let sleep_duration =
            Duration::from_millis((li.after.as_millis() / li.steps as u128) as u64);
        let to_increment = diff / li.steps;

        for _ in 0..li.steps {
            for _ in 0..to_increment {
                let rooms_to_join = room_iterator.by_ref().take(NUMBER_OF_ROOMS_TO_JOIN).collect();

                join_set.spawn(spawn_single_bot(rooms_to_join));
            }

            current += to_increment;
            println!("total bots: {}", current);
            tokio::time::sleep(sleep_duration).await;
        }
    }

    while join_set.join_next().await.is_some() {}
}
