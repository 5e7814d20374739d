use comms::event::Participant;
use nanoid::nanoid;
use rand::Rng;

/// Cursor and roster colors handed out to new sessions.
const PALETTE: [&str; 5] = ["#ef4444", "#22c55e", "#3b82f6", "#eab308", "#a855f7"];

/// Parts of the generated guest names.
const NAME_TONES: [&str; 8] = [
    "Amber", "Coral", "Indigo", "Jade", "Ochre", "Olive", "Slate", "Teal",
];
const NAME_ANIMALS: [&str; 8] = [
    "Badger", "Crane", "Fox", "Heron", "Lynx", "Otter", "Swift", "Wren",
];

/// Build a fresh participant identity for a new connection.
/// There is no login system; the display attributes are random picks.
pub fn assign() -> Participant {
    let mut rng = rand::thread_rng();

    Participant {
        id: nanoid!(),
        display_name: format!(
            "{} {}",
            pick(&NAME_TONES, &mut rng),
            pick(&NAME_ANIMALS, &mut rng)
        ),
        color: pick(&PALETTE, &mut rng),
    }
}

fn pick<R: Rng>(items: &[&str], rng: &mut R) -> String {
    String::from(items[rng.gen_range(0..items.len())])
}
