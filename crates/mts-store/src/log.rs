use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Take, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::lock::TopicLock;
use crate::scan;

/// Flush/sync strategy for appends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::OsDefault
    }
}

/// Append-only log backing a single topic.
///
/// On-disk format:
/// ```text
/// <record>\n
/// <record>\n
/// ...
/// ```
///
/// Appends hold the topic's write lock for the duration of one `write_all`
/// of `record + "\n"`. Readers take the read lock while they measure the
/// file, so they only ever see whole records.
///
/// A failed append truncates the file back to its previous length. If the
/// file still ends in an unterminated fragment (a crash, an external
/// writer), the next append terminates it first so records never merge.
pub struct TopicLog {
    topic: String,
    path: PathBuf,
    lock: TopicLock,
    sync_mode: SyncMode,
}

impl TopicLog {
    /// Handle for `topic` stored at `path`. Does not touch the filesystem.
    pub fn new(topic: impl Into<String>, path: PathBuf, lock: TopicLock, sync_mode: SyncMode) -> Self {
        Self {
            topic: topic.into(),
            path,
            lock,
            sync_mode,
        }
    }

    /// Topic name this log belongs to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the empty log file. Fails if it already exists; never truncates.
    pub fn create(&self) -> StoreResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                // The file is being created, so a missing entry means the
                // root directory itself is gone.
                io::ErrorKind::NotFound => StoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("store root directory missing for {}", self.path.display()),
                )),
                _ => self.classify(e),
            })?;

        if self.sync_mode == SyncMode::EveryWrite {
            file.sync_all().map_err(|e| self.classify(e))?;
        }

        info!(topic = %self.topic, path = %self.path.display(), "topic created");
        Ok(())
    }

    /// Append one record followed by a newline terminator.
    ///
    /// The record must be non-empty and must not contain `\n`.
    pub fn append(&self, record: &[u8]) -> StoreResult<()> {
        validate_record(record)?;

        let _guard = self
            .lock
            .write()
            .map_err(|_| StoreError::poisoned("topic"))?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.classify(e))?;
        let pre_len = file.metadata().map_err(|e| self.classify(e))?.len();

        let mut line = Vec::with_capacity(record.len() + 2);
        if !ends_with_newline(&mut file, pre_len).map_err(|e| self.classify(e))? {
            warn!(topic = %self.topic, len = pre_len, "terminating unterminated trailing record");
            line.push(b'\n');
        }
        line.extend_from_slice(record);
        line.push(b'\n');

        write_line(&mut file, pre_len, &line, self.sync_mode == SyncMode::EveryWrite)
            .map_err(|e| self.classify(e))?;

        debug!(topic = %self.topic, bytes = line.len(), "record appended");
        Ok(())
    }

    /// Stream the whole log from the start.
    ///
    /// The stream ends at the length observed when it was opened; records
    /// appended afterwards are not included. Each call reopens the file.
    pub fn read_all(&self) -> StoreResult<TopicReader> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| StoreError::poisoned("topic"))?;

        let file = File::open(&self.path).map_err(|e| self.classify(e))?;
        let len = file.metadata().map_err(|e| self.classify(e))?.len();

        debug!(topic = %self.topic, len, "reading full topic");
        Ok(TopicReader {
            inner: BufReader::new(file).take(len),
            len,
        })
    }

    /// The last record, trimmed of surrounding whitespace.
    ///
    /// Uses a backward scan, so the cost depends on the length of the last
    /// record only.
    pub fn read_last(&self) -> StoreResult<Vec<u8>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| StoreError::poisoned("topic"))?;

        let mut file = File::open(&self.path).map_err(|e| self.classify(e))?;
        let len = file.metadata().map_err(|e| self.classify(e))?.len();

        let line = scan::read_last_line(&mut file, len)
            .map_err(|e| self.classify(e))?
            .ok_or_else(|| StoreError::EmptyTopic {
                topic: self.topic.clone(),
            })?;

        debug!(topic = %self.topic, len, bytes = line.len(), "read last record");
        Ok(line)
    }

    /// Whether the log file exists.
    pub fn exists(&self) -> StoreResult<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.classify(e)),
        }
    }

    /// Current size of the log file in bytes.
    pub fn len(&self) -> StoreResult<u64> {
        let meta = fs::metadata(&self.path).map_err(|e| self.classify(e))?;
        Ok(meta.len())
    }

    /// Returns `true` if the log holds no bytes.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn classify(&self, err: io::Error) -> StoreError {
        StoreError::from_topic_io(err, &self.topic, &self.path)
    }
}

fn validate_record(record: &[u8]) -> StoreResult<()> {
    if record.is_empty() {
        return Err(StoreError::InvalidRecord("record must not be empty".into()));
    }
    if record.contains(&b'\n') {
        return Err(StoreError::InvalidRecord(
            "record must not contain a newline".into(),
        ));
    }
    Ok(())
}

/// Whether a file of `len` bytes is empty or ends with `\n`.
fn ends_with_newline<R: Read + Seek>(reader: &mut R, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    reader.seek(SeekFrom::Start(len - 1))?;
    reader.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Destination of an append that can be cut back after a failed write.
trait LogSink: Write {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogSink for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write `line` to a sink holding `pre_len` bytes. On any write or sync
/// error the sink is truncated back to `pre_len` and the write error is
/// returned.
fn write_line<S: LogSink>(sink: &mut S, pre_len: u64, line: &[u8], sync: bool) -> io::Result<()> {
    let result = sink
        .write_all(line)
        .and_then(|()| if sync { sink.sync() } else { Ok(()) });

    if let Err(err) = result {
        if let Err(rollback) = sink.truncate_to(pre_len) {
            warn!(error = %rollback, len = pre_len, "failed to roll back partial append");
        }
        return Err(err);
    }
    Ok(())
}

/// Lazy byte stream over a topic log, bounded to a snapshot length.
pub struct TopicReader {
    inner: Take<BufReader<File>>,
    len: u64,
}

impl TopicReader {
    /// Number of bytes this stream yields in total.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the stream yields nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over the records, one line at a time, without terminators.
    pub fn records(self) -> impl Iterator<Item = io::Result<Vec<u8>>> {
        self.inner.split(b'\n')
    }

    /// Read the remaining stream into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len as usize);
        self.inner.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for TopicReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
