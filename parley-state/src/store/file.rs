//! File-based record store implementation

use super::{newest_first, SessionRecord};
use crate::{RecordStore, StateError, StateResult};
use async_trait::async_trait;
use parley_core::{Message, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, trace, warn};

/// File-based record store implementation
///
/// Each session and its messages are stored as one JSON document named by
/// the session id. Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Create a new file store at the given path
    ///
    /// The directory will be created if it doesn't exist.
    pub fn new(base_path: impl AsRef<Path>) -> StateResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| StateError::storage(format!("Failed to create directory: {}", e)))?;

        debug!("Initialized file store at: {:?}", base_path);
        Ok(Self {
            base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Get the file path for a session. Ids that could escape the store
    /// directory are reported as not found.
    fn file_path(&self, session_id: &str) -> StateResult<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StateError::NotFound(session_id.to_string()));
        }
        Ok(self.base_path.join(format!("{}.json", session_id)))
    }

    async fn read_record(&self, session_id: &str) -> StateResult<SessionRecord> {
        let path = self.file_path(session_id)?;
        trace!("Loading session {} from file: {:?}", session_id, path);

        match fs::read_to_string(&path).await {
            Ok(json) => {
                let record: SessionRecord = serde_json::from_str(&json)?;
                if record.session.id != session_id {
                    error!(
                        "ID mismatch in file {:?}: expected {}, got {}",
                        path, session_id, record.session.id
                    );
                    return Err(StateError::invalid_state(
                        "ID mismatch: file contains a different session",
                    ));
                }
                Ok(record)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StateError::NotFound(session_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, record: &SessionRecord) -> StateResult<()> {
        let path = self.file_path(&record.session.id)?;
        let json = serde_json::to_string_pretty(record)?;

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &path).await?;
        trace!("Wrote session {} to file: {:?}", record.session.id, path);
        Ok(())
    }

    async fn list_records(&self) -> StateResult<Vec<SessionRecord>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(json) => match serde_json::from_str::<SessionRecord>(&json) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Failed to parse session file {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read session file {:?}: {}", path, e),
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn create_session(&self) -> StateResult<Session> {
        let session = Session::new();
        let _guard = self.write_lock.lock().await;
        self.write_record(&SessionRecord::new(session.clone()))
            .await?;
        debug!(session_id = %session.id, "Created session file");
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> StateResult<Session> {
        Ok(self.read_record(session_id).await?.session)
    }

    async fn set_session_title(&self, session_id: &str, title: &str) -> StateResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(session_id).await?;
        record.session.title = title.to_string();
        self.write_record(&record).await
    }

    async fn save_message(&self, message: Message) -> StateResult<Message> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(&message.session_id).await?;
        record.messages.push(message.clone());
        self.write_record(&record).await?;
        Ok(message)
    }

    async fn list_sessions(&self) -> StateResult<Vec<Session>> {
        let mut sessions: Vec<_> = self
            .list_records()
            .await?
            .into_iter()
            .map(|r| r.session)
            .collect();
        newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn list_messages(&self, session_id: &str) -> StateResult<Vec<Message>> {
        Ok(self.read_record(session_id).await?.sorted_messages())
    }
}
