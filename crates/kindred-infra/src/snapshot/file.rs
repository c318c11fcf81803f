//! File-backed snapshot store.
//!
//! One JSON file per conversation stream under a data directory, named by
//! a sanitized form of the stream key. Saves write a `.tmp` sibling and
//! rename it into place so a crash mid-write can never leave a torn
//! snapshot; loads treat anything unreadable (absent, unparseable, wrong
//! schema version) as the empty default, with a warning.

use kindred_core::engagement::snapshot::SnapshotStore;
use kindred_types::engagement::{EngagementSnapshot, StreamId, SNAPSHOT_VERSION};
use kindred_types::error::SnapshotError;
use tracing::{debug, warn};

use std::path::{Path, PathBuf};

/// Snapshot store writing one versioned JSON blob per stream.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// save, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic snapshot path for a stream.
    ///
    /// Stream keys may contain path-hostile characters (platform prefixes
    /// like `qq:`, group ids with slashes); everything outside
    /// `[A-Za-z0-9_-]` maps to `_`.
    pub fn path_for(&self, stream: &StreamId) -> PathBuf {
        let safe: String = stream
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    async fn save(
        &self,
        stream: &StreamId,
        snapshot: &EngagementSnapshot,
    ) -> Result<(), SnapshotError> {
        let path = self.path_for(stream);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SnapshotError::Serialize(e.to_string()))?;

        // Write-then-rename keeps the previous snapshot intact until the
        // new one is fully on disk.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(stream = %stream, path = %path.display(), "saved engagement snapshot");
        Ok(())
    }

    async fn load(&self, stream: &StreamId) -> EngagementSnapshot {
        let path = self.path_for(stream);
        load_or_default(&path).await
    }
}

/// Read and validate one snapshot file, degrading to empty on any problem.
async fn load_or_default(path: &Path) -> EngagementSnapshot {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return EngagementSnapshot::empty();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read snapshot, starting empty");
            return EngagementSnapshot::empty();
        }
    };

    let snapshot: EngagementSnapshot = match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "malformed snapshot, starting empty");
            return EngagementSnapshot::empty();
        }
    };

    if snapshot.version != SNAPSHOT_VERSION {
        warn!(
            path = %path.display(),
            found = snapshot.version,
            expected = SNAPSHOT_VERSION,
            "snapshot schema version mismatch, starting empty"
        );
        return EngagementSnapshot::empty();
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kindred_types::engagement::{ActivitySegment, PersonId};

    fn sample_snapshot() -> EngagementSnapshot {
        let mut snapshot = EngagementSnapshot::empty();
        snapshot.persons.insert(
            PersonId::new("qq:10001"),
            vec![ActivitySegment {
                start_time: Utc.timestamp_opt(0, 0).unwrap(),
                end_time: Utc.timestamp_opt(120, 0).unwrap(),
                last_message_time: Utc.timestamp_opt(110, 0).unwrap(),
                message_count: 14,
            }],
        );
        snapshot.last_processed_message_time = Some(Utc.timestamp_opt(110, 0).unwrap());
        snapshot
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let stream = StreamId::new("group-42");
        let snapshot = sample_snapshot();

        store.save(&stream, &snapshot).await.unwrap();
        let loaded = store.load(&stream).await;

        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_empty_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let stream = StreamId::new("group-42");

        store.save(&stream, &EngagementSnapshot::empty()).await.unwrap();

        assert_eq!(store.load(&stream).await, EngagementSnapshot::empty());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        let loaded = store.load(&StreamId::new("never-saved")).await;

        assert_eq!(loaded, EngagementSnapshot::empty());
    }

    #[tokio::test]
    async fn test_malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let stream = StreamId::new("corrupt");

        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(store.path_for(&stream), b"{ not json")
            .await
            .unwrap();

        assert_eq!(store.load(&stream).await, EngagementSnapshot::empty());
    }

    #[tokio::test]
    async fn test_version_mismatch_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let stream = StreamId::new("future");

        let mut snapshot = sample_snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let json = serde_json::to_vec(&snapshot).unwrap();
        tokio::fs::write(store.path_for(&stream), json).await.unwrap();

        assert_eq!(store.load(&stream).await, EngagementSnapshot::empty());
    }

    #[tokio::test]
    async fn test_save_leaves_no_tmp_residue() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let stream = StreamId::new("group-42");

        store.save(&stream, &sample_snapshot()).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["group-42.json".to_string()]);
    }

    #[tokio::test]
    async fn test_streams_map_to_distinct_sanitized_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        let a = store.path_for(&StreamId::new("qq:10001"));
        let b = store.path_for(&StreamId::new("discord/guild#7"));

        assert_eq!(a.file_name().unwrap(), "qq_10001.json");
        assert_eq!(b.file_name().unwrap(), "discord_guild_7.json");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let stream = StreamId::new("group-42");

        store.save(&stream, &sample_snapshot()).await.unwrap();
        store.save(&stream, &EngagementSnapshot::empty()).await.unwrap();

        assert_eq!(store.load(&stream).await, EngagementSnapshot::empty());
    }
}
