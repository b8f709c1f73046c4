use crate::prelude::{StoreError, StoreResult};
use crate::store::feed::ChangeFeed;
use crate::store::record::{AnalysisRecord, Cursor};
use crate::store::rows::RowSet;
use crate::store::AnalysisStore;
use crate::telemetry::log::LogManager;
use log::error;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tokio::sync::broadcast;

/// Append-only table persisted as one JSON object per line.
pub struct JsonLinesStore {
    file: Mutex<File>,
    rows: RwLock<RowSet>,
    feed: ChangeFeed,
    logger: LogManager,
}

impl JsonLinesStore {
    /// Opens `path`, creating it if missing, and loads existing rows.
    ///
    /// A last line without its newline is an interrupted append; it is cut
    /// from the file instead of failing the open.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let logger = LogManager::new("store");
        let mut rows = Vec::new();
        if path.exists() {
            let contents = fs::read(path)?;
            let complete = contents
                .iter()
                .rposition(|&byte| byte == b'\n')
                .map_or(0, |at| at + 1);
            if complete < contents.len() {
                logger.warn(&format!(
                    "discarding {} bytes of an unfinished row in {}",
                    contents.len() - complete,
                    path.display()
                ));
                OpenOptions::new()
                    .write(true)
                    .open(path)?
                    .set_len(complete as u64)?;
            }
            for line in contents[..complete].split(|&byte| byte == b'\n') {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                rows.push(serde_json::from_slice::<AnalysisRecord>(line)?);
            }
        }

        logger.record(&format!(
            "loaded {} rows from {}",
            rows.len(),
            path.display()
        ));

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            rows: RwLock::new(RowSet::from_unsorted(rows)),
            feed: ChangeFeed::new(),
            logger,
        })
    }
}

/// Runs `write` against the file and syncs it; on failure the file is cut
/// back to its previous length so no fragment is left for the next append.
fn append_or_rollback<F>(file: &mut File, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let length = file.metadata()?.len();
    let outcome = write(&mut *file).and_then(|()| file.sync_data());
    if let Err(err) = outcome {
        if let Err(truncate_err) = file.set_len(length) {
            error!("rolling back failed append: {}", truncate_err);
        }
        return Err(err);
    }
    Ok(())
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("store lock poisoned".into())
}

impl AnalysisStore for JsonLinesStore {
    fn insert(&self, record: AnalysisRecord) -> StoreResult<AnalysisRecord> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        {
            let mut file = self.file.lock().map_err(|_| poisoned())?;
            append_or_rollback(&mut file, |file| file.write_all(line.as_bytes()))?;
        }
        self.rows
            .write()
            .map_err(|_| poisoned())?
            .insert(record.clone());
        let delivered = self.feed.publish(record.clone());
        self.logger.record(&format!(
            "inserted {} (notified {})",
            record.id, delivered
        ));
        Ok(record)
    }

    fn recent(&self, limit: usize) -> StoreResult<Vec<AnalysisRecord>> {
        Ok(self.rows.read().map_err(|_| poisoned())?.recent(limit))
    }

    fn page(&self, before: Option<&Cursor>, limit: usize) -> StoreResult<Vec<AnalysisRecord>> {
        Ok(self.rows.read().map_err(|_| poisoned())?.page(before, limit))
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.rows.read().map_err(|_| poisoned())?.len())
    }

    fn subscribe(&self) -> broadcast::Receiver<AnalysisRecord> {
        self.feed.subscribe()
    }
}
