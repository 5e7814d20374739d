use std::path::PathBuf;

use anyhow::Context;
use comms::operation::Operation;
use nanoid::nanoid;
use tokio::fs;

/// [SnapshotStore] is the best-effort persistence of committed operations.
///
/// Every room maps to one JSON file holding its committed sequence; the undo
/// buffer and the participant roster are never stored. Writes land in a
/// uniquely named temp file first and are renamed into place, so concurrent
/// saves of the same room and crashes mid-write both leave a complete file
/// behind.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at the given directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("could not create snapshot directory {:?}", dir))?;

        Ok(SnapshotStore { dir })
    }

    /// Persist the committed operations of a room, replacing any previous
    /// snapshot stored for the same slug.
    pub async fn save(&self, slug: &str, operations: &[Operation]) -> anyhow::Result<()> {
        let serialized =
            serde_json::to_vec(operations).context("could not serialize the operations")?;
        let path = self.room_path(slug);
        let tmp_path = self.dir.join(format!("{}.{}.tmp", file_stem(slug), nanoid!(8)));

        fs::write(&tmp_path, serialized)
            .await
            .with_context(|| format!("could not write snapshot file {:?}", tmp_path))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("could not move the snapshot into place at {:?}", path))?;

        Ok(())
    }

    /// Load the stored operations of a room. Returns [None] when the room
    /// has never been persisted.
    pub async fn load(&self, slug: &str) -> anyhow::Result<Option<Vec<Operation>>> {
        let path = self.room_path(slug);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("could not read snapshot file {:?}", path))
            }
        };

        let operations = serde_json::from_slice(&bytes)
            .with_context(|| format!("snapshot file {:?} holds malformed data", path))?;

        Ok(Some(operations))
    }

    fn room_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(slug)))
    }
}

/// Room slugs come straight off the wire; reduce them to a character set that
/// cannot escape the snapshot directory or clash with path syntax. Slugs that
/// collide after the reduction share a file, acceptable for a best-effort
/// store.
fn file_stem(slug: &str) -> String {
    slug.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
