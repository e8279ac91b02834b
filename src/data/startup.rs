use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::player::{PlayerError, StartupEntry};

/// The JSON list of sessions to recreate when the bot starts.
#[derive(Debug)]
pub struct StartupFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StartupFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry in the file. A missing file is an empty list.
    pub async fn load(&self) -> Result<Vec<StartupEntry>, PlayerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PlayerError::Startup(format!(
                    "can't read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            PlayerError::Startup(format!("can't parse {}: {}", self.path.display(), e))
        })
    }

    /// Add `entry`, replacing any entry for the same voice channel.
    pub async fn save_entry(&self, entry: StartupEntry) -> Result<(), PlayerError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await?;
        match entries
            .iter()
            .position(|existing| existing.voice_channel_id == entry.voice_channel_id)
        {
            Some(index) => entries[index] = entry,
            None => entries.push(entry),
        }

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| PlayerError::Startup(format!("can't serialize entries: {}", e)))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            PlayerError::Startup(format!("can't write {}: {}", self.path.display(), e))
        })?;

        tracing::info!(
            "startup list {} now has {} entries",
            self.path.display(),
            entries.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{ChannelId, RoleId};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn entry(voice: u64, log: Option<u64>) -> StartupEntry {
        StartupEntry {
            voice_channel_id: ChannelId::new(voice),
            log_channel_id: log.map(ChannelId::new),
            role_permissions: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = StartupFile::new(dir.path().join("startup.json"));

        assert!(file.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_are_appended_and_replaced() {
        let dir = tempdir().unwrap();
        let file = StartupFile::new(dir.path().join("startup.json"));

        file.save_entry(entry(1, Some(10))).await.unwrap();
        file.save_entry(entry(2, None)).await.unwrap();
        file.save_entry(entry(1, Some(11))).await.unwrap();

        assert_eq!(
            file.load().await.unwrap(),
            vec![entry(1, Some(11)), entry(2, None)]
        );
    }

    #[tokio::test]
    async fn reads_hand_written_lists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("startup.json");
        std::fs::write(
            &path,
            r#"[
                {"voice_channel_id": 1, "log_channel_id": 10},
                {"voice_channel_id": 2, "log_channel_id": null,
                 "role_permissions": {"skip": [5]}}
            ]"#,
        )
        .unwrap();

        let entries = StartupFile::new(&path).load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entry(1, Some(10)));
        assert!(entries[1].role_permissions["skip"].contains(&RoleId::new(5)));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("startup.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            StartupFile::new(&path).load().await,
            Err(PlayerError::Startup(_))
        ));
    }
}
