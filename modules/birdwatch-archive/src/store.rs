use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use birdwatch_common::{checkpoint_name, Conversation, RetrievalStatus};

use crate::error::Result;

/// Durable snapshot storage for conversations. One JSON document per
/// checkpoint name; each write replaces the previous snapshot under the
/// same name.
///
/// Writes go through a temp file and a rename, so a reader never observes
/// a partially written document.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a checkpoint name resolves to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Write a full snapshot under `name`, superseding any prior one.
    pub async fn write(&self, name: &str, conversation: &Conversation) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(name);
        let tmp = self.dir.join(format!("{name}.json.tmp"));
        let body = serde_json::to_vec_pretty(conversation)?;

        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), bytes = body.len(), "Checkpoint written");
        Ok(path)
    }

    /// Caller-facing persistence entry point. Idempotent for a completed
    /// conversation that already has a checkpoint on disk: the existing
    /// location is returned and nothing is rewritten. Anything else gets a
    /// fresh snapshot.
    pub async fn persist(&self, conversation: &Conversation) -> Result<PathBuf> {
        if conversation.status == RetrievalStatus::Completed {
            if let Some(name) = &conversation.checkpoint_name {
                let path = self.path_for(name);
                if tokio::fs::try_exists(&path).await? {
                    debug!(path = %path.display(), "Already checkpointed, returning existing location");
                    return Ok(path);
                }
            }
        }

        let name = conversation
            .checkpoint_name
            .clone()
            .unwrap_or_else(|| checkpoint_name(&conversation.query, Utc::now()));
        let path = self.write(&name, conversation).await?;
        info!(path = %path.display(), "Conversation persisted");
        Ok(path)
    }

    /// Load a snapshot back from disk.
    pub async fn load(&self, path: &Path) -> Result<Conversation> {
        let body = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdwatch_common::{ConversationEntry, SearchKind};
    use twitterapi_client::{SearchMode, Tweet};

    fn completed_conversation(name: &str) -> Conversation {
        let mut conversation = Conversation::new("rust", SearchKind::Hashtag, SearchMode::Latest);
        conversation.tweets = vec![ConversationEntry::root(Tweet {
            id: Some("1".to_string()),
            text: "hello".to_string(),
            ..Tweet::default()
        })];
        conversation.recompute_totals();
        conversation.status = RetrievalStatus::Completed;
        conversation.checkpoint_name = Some(name.to_string());
        conversation
    }

    #[tokio::test]
    async fn write_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let conversation = completed_conversation("rust_20240301_120000");

        let path = store.write("rust_20240301_120000", &conversation).await.unwrap();
        let loaded = store.load(&path).await.unwrap();

        assert_eq!(loaded.query, "rust");
        assert_eq!(loaded.total_main_tweets, 1);
        assert_eq!(loaded.status, RetrievalStatus::Completed);
    }

    #[tokio::test]
    async fn write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let conversation = completed_conversation("a");

        store.write("a", &conversation).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["a.json"]);
    }

    #[tokio::test]
    async fn persist_is_idempotent_for_completed_conversations() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let conversation = completed_conversation("b");

        let first = store.persist(&conversation).await.unwrap();
        let second = store.persist(&conversation).await.unwrap();

        assert_eq!(first, second);
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn persist_writes_when_not_yet_checkpointed() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut conversation = completed_conversation("c");
        conversation.checkpoint_name = None;

        let path = store.persist(&conversation).await.unwrap();
        assert!(path.exists());
    }
}
