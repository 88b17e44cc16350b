//! Append-only JSON-lines journal backing the in-memory store.
//!
//! Every successful create under the memory backend appends one line:
//!
//! ```text
//! {"id":1,"short_url":"aB3xY9","original_url":"https://example.com","user_id":"4f1c..."}
//! ```
//!
//! The file is replayed once at startup. Replay stops at the first line that
//! does not parse and the file is cut there so that new appends start on a
//! clean line. An unterminated last line is a torn write and is simply
//! dropped. Anything else is corruption: the whole file is first copied to a
//! `.corrupt-<timestamp>` sibling so later records can still be recovered by
//! hand.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::domain::repositories::StoreError;

/// A single journaled create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "id")]
    pub sequence: u64,
    pub short_url: String,
    pub original_url: String,
    #[serde(default)]
    pub user_id: String,
}

/// Byte sink the journal writes through.
#[async_trait]
pub trait JournalFile: Send + Sync {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    async fn sync_data(&mut self) -> std::io::Result<()>;

    /// Cuts the file to `len` bytes and moves the write cursor there.
    async fn truncate_to(&mut self, len: u64) -> std::io::Result<()>;
}

#[async_trait]
impl JournalFile for File {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await?;
        self.flush().await
    }

    async fn sync_data(&mut self) -> std::io::Result<()> {
        File::sync_data(self).await
    }

    async fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len).await?;
        self.seek(SeekFrom::Start(len)).await?;
        Ok(())
    }
}

/// Handle for appending to the journal.
///
/// `len` always marks the end of the last complete, synced record. A failed
/// append is rolled back to it; if the rollback fails too the log refuses
/// every further append.
#[derive(Debug)]
pub struct RecoveryLog<F = File> {
    path: PathBuf,
    file: F,
    len: u64,
    poisoned: bool,
}

impl RecoveryLog<File> {
    /// Opens (creating if needed) the journal at `path` and returns every
    /// event that replays cleanly, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Journal`] if the file cannot be read, backed up,
    /// repaired or opened for appending. Malformed content is never an error.
    pub async fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<LogEvent>), StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let (events, valid_len) = parse_events(&bytes);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await?;

        if valid_len < bytes.len() {
            let rest = &bytes[valid_len..];

            if rest.contains(&b'\n') {
                let backup = backup_path(&path);
                write_backup(&backup, &bytes).await?;
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    kept_events = events.len(),
                    discarded_bytes = rest.len(),
                    "Recovery log is corrupt, original saved before truncating"
                );
            } else {
                warn!(
                    path = %path.display(),
                    kept_events = events.len(),
                    discarded_bytes = rest.len(),
                    "Recovery log ends in a torn record, truncating"
                );
            }

            file.set_len(valid_len as u64).await?;
        }

        let mut len = file.seek(SeekFrom::End(0)).await?;
        if valid_len > 0 && bytes[valid_len - 1] != b'\n' {
            AsyncWriteExt::write_all(&mut file, b"\n").await?;
            File::sync_data(&file).await?;
            len += 1;
        }

        info!(path = %path.display(), events = events.len(), "Recovery log opened");

        Ok((Self::with_file(path, file, len), events))
    }
}

impl<F: JournalFile> RecoveryLog<F> {
    /// Wraps an already positioned `file` whose first `len` bytes are
    /// complete records.
    pub fn with_file(path: PathBuf, file: F, len: u64) -> Self {
        Self {
            path,
            file,
            len,
            poisoned: false,
        }
    }

    /// Appends one event and syncs it to stable storage before returning.
    ///
    /// # Errors
    ///
    /// On a write or sync failure the partial record is cut off again and the
    /// error is returned. Fails immediately once a rollback has failed.
    pub async fn append(&mut self, event: &LogEvent) -> Result<(), StoreError> {
        if self.poisoned {
            return Err(std::io::Error::other("recovery log disabled after a failed rollback").into());
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        if let Err(e) = self.write_record(&line).await {
            if let Err(rollback) = self.file.truncate_to(self.len).await {
                error!(
                    path = %self.path.display(),
                    "Failed to roll back partial record, disabling recovery log: {}",
                    rollback
                );
                self.poisoned = true;
            }
            return Err(e.into());
        }

        self.len += line.len() as u64;

        Ok(())
    }

    async fn write_record(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line).await?;
        self.file.sync_data().await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length of the journal up to the last complete record.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
    path.with_file_name(name)
}

async fn write_backup(backup: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(backup).await?;
    AsyncWriteExt::write_all(&mut file, bytes).await?;
    file.sync_all().await
}


/// Parses newline-delimited events from the start of `bytes`.
///
/// Returns the parsed events and the length of the prefix they occupy. Blank
/// lines are skipped. Parsing stops at the first malformed line, which covers
/// both a torn trailing write and corruption further up.
pub fn parse_events(bytes: &[u8]) -> (Vec<LogEvent>, usize) {
    let mut events = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let (line, next) = match bytes[offset..].iter().position(|&b| b == b'\n') {
            Some(pos) => (&bytes[offset..offset + pos], offset + pos + 1),
            None => (&bytes[offset..], bytes.len()),
        };

        if line.iter().all(u8::is_ascii_whitespace) {
            offset = next;
            continue;
        }

        match serde_json::from_slice::<LogEvent>(line) {
            Ok(event) => events.push(event),
            Err(_) => break,
        }

        offset = next;
    }

    (events, offset)
}
