//! Append-only record log: the bundled [`PersistentStore`].
//!
//! Every committed batch is encoded into length-prefixed frames and appended
//! to a single log file. On open the log is replayed through a read-only
//! memory map to rebuild an in-memory index of live entries; a torn tail from
//! a crash mid-append is truncated. Expired frames stay on disk until a
//! maintenance pass rewrites the log.
//!
//! # File Layout
//!
//! ```text
//! metrics/
//! ├── LOCK          <- advisory lock held while the store is open
//! ├── meta.json     <- format version and sequence high-water mark
//! └── records.log   <- header + frames
//! ```
//!
//! # Log Format
//!
//! ```text
//! [0..16)   Header: magic "EBBL", u32 version, 8 reserved bytes
//! [16..)    Frames: u32 payload length, then payload:
//!             u64 sequence
//!             i64 timestamp_ms
//!             f64 value
//!             i64 expires_at_ms
//!             u16 label count
//!             per label: u16 len, name bytes, u16 len, value bytes
//! ```
//!
//! All integers are little-endian.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock, unix_millis};
use crate::config::Durability;
use crate::error::{StoreOpenError, StoreWriteError};
use crate::record::{Record, Sequenced, StoredSample};
use crate::series::{Labels, SeriesRef};
use crate::store::{MaintenanceReport, PersistentStore, Selector, WriteReceipt};

/// Magic bytes identifying an ebb record log.
const LOG_MAGIC: [u8; 4] = *b"EBBL";

/// Current log format version.
const LOG_VERSION: u32 = 1;

/// Size of the log header in bytes.
const HEADER_SIZE: usize = 16;

/// Size of the frame length prefix.
const FRAME_LEN_SIZE: usize = 4;

/// Fixed part of a frame payload: sequence, timestamp, value, expiry, label count.
const FIXED_PAYLOAD_SIZE: usize = 8 + 8 + 8 + 8 + 2;

/// Metadata file format version.
const METADATA_VERSION: u32 = 1;

const METADATA_FILE: &str = "meta.json";
const LOG_FILE: &str = "records.log";
const COMPACT_FILE: &str = "records.log.compact";
const LOCK_FILE: &str = "LOCK";

/// Minimum frame count before a rewrite is considered.
const COMPACTION_MIN_FRAMES: usize = 1024;

/// Contents of meta.json.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct LogMetadata {
    version: u32,
    /// Lowest sequence number never handed out.
    next_sequence: u64,
}

/// Index key: series, then time, then sequence to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey {
    series: SeriesRef,
    timestamp_ms: i64,
    sequence: u64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: f64,
    expires_at_ms: i64,
}

#[derive(Debug)]
struct SeriesEntry {
    labels: Arc<Labels>,
    live: usize,
}

/// Options for opening a [`LogStore`].
#[derive(Clone)]
pub struct LogStoreOptions {
    /// When appended batches are fsynced.
    pub durability: Durability,
    /// Clock used to stamp and check expiry.
    pub clock: Arc<dyn Clock>,
}

impl Default for LogStoreOptions {
    fn default() -> Self {
        Self {
            durability: Durability::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for LogStoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStoreOptions")
            .field("durability", &self.durability)
            .finish_non_exhaustive()
    }
}

/// Point-in-time summary of a [`LogStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogStats {
    /// Live (unreclaimed) entries in the index.
    pub live_entries: usize,
    /// Series with at least one live entry.
    pub series: usize,
    /// Frames in the log file, live or expired.
    pub frames: usize,
    /// Log file size in bytes.
    pub log_bytes: u64,
    /// The next sequence number to be assigned.
    pub next_sequence: u64,
}

/// Append-only, TTL-aware record log.
///
/// # Thread Safety
///
/// All state sits behind one mutex. A write assigns sequence numbers and
/// appends its frames inside the same critical section, so sequence order
/// equals log order even under concurrent commits.
pub struct LogStore {
    dir: PathBuf,
    durability: Durability,
    clock: Arc<dyn Clock>,
    inner: Mutex<LogInner>,
}

#[derive(Debug)]
struct LogInner {
    /// Log file in append mode; `None` once closed.
    file: Option<File>,
    /// Holds the advisory lock until close.
    lock: Option<File>,
    len: u64,
    frames: usize,
    next_sequence: u64,
    /// Bytes appended since the last fsync.
    dirty: bool,
    index: BTreeMap<EntryKey, Entry>,
    /// The index keys again, ordered by expiry so eviction stops at the
    /// first live entry.
    expiry: BTreeSet<(i64, EntryKey)>,
    series: HashMap<SeriesRef, SeriesEntry>,
}

impl LogStore {
    /// Opens the log in `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// - [`StoreOpenError::DirectoryAccess`] if files can't be created or read
    /// - [`StoreOpenError::Locked`] if another handle holds the store
    /// - [`StoreOpenError::Corrupted`] if the header or metadata is invalid
    /// - [`StoreOpenError::Metadata`] if meta.json isn't valid JSON
    pub fn open<P: AsRef<Path>>(dir: P, options: LogStoreOptions) -> Result<Self, StoreOpenError> {
        let dir = dir.as_ref().to_path_buf();
        let access = |path: &Path| {
            let path = path.display().to_string();
            move |source| StoreOpenError::DirectoryAccess { path, source }
        };

        fs::create_dir_all(&dir).map_err(access(&dir))?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(access(&lock_path))?;
        match lock.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(StoreOpenError::Locked {
                    path: dir.display().to_string(),
                });
            }
            Err(TryLockError::Error(e)) => return Err(access(&lock_path)(e)),
        }

        let metadata = load_metadata(&dir)?;

        let log_path = dir.join(LOG_FILE);
        if !log_path.exists() {
            create_log_file(&log_path).map_err(access(&log_path))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&log_path)
            .map_err(access(&log_path))?;

        let replay = replay_log(&file, &log_path)?;
        let file_len = file.metadata().map_err(access(&log_path))?.len();
        if replay.valid_len < file_len {
            tracing::warn!(
                path = %log_path.display(),
                valid_len = replay.valid_len,
                file_len,
                "truncating torn tail of record log"
            );
            file.set_len(replay.valid_len).map_err(access(&log_path))?;
            file.sync_data().map_err(access(&log_path))?;
        }

        let now_ms = unix_millis(options.clock.now());
        let mut inner = LogInner {
            file: Some(file),
            lock: Some(lock),
            len: replay.valid_len,
            frames: replay.frames.len(),
            next_sequence: metadata.next_sequence,
            dirty: false,
            index: BTreeMap::new(),
            expiry: BTreeSet::new(),
            series: HashMap::new(),
        };

        let mut expired = 0usize;
        for frame in replay.frames {
            inner.next_sequence = inner.next_sequence.max(frame.sequence.saturating_add(1));
            if frame.expires_at_ms <= now_ms {
                expired += 1;
                continue;
            }
            inner.insert(
                frame.labels,
                frame.timestamp_ms,
                frame.sequence,
                frame.value,
                frame.expires_at_ms,
            );
        }

        tracing::info!(
            path = %dir.display(),
            live = inner.index.len(),
            expired,
            next_sequence = inner.next_sequence,
            "opened record log"
        );

        Ok(Self {
            dir,
            durability: options.durability,
            clock: options.clock,
            inner: Mutex::new(inner),
        })
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns a summary of the store's current state.
    pub fn stats(&self) -> LogStats {
        let inner = self.lock_inner();
        LogStats {
            live_entries: inner.index.len(),
            series: inner.series.len(),
            frames: inner.frames,
            log_bytes: inner.len,
            next_sequence: inner.next_sequence,
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn io_error(&self, path: &Path) -> impl FnOnce(std::io::Error) -> StoreWriteError {
        let path = path.display().to_string();
        move |source| StoreWriteError::Io { path, source }
    }

    /// Rewrites the log with only the live entries.
    fn compact(&self, inner: &mut LogInner) -> Result<(), StoreWriteError> {
        // Persist the high-water mark first: after the rewrite the log alone
        // may no longer contain the highest sequence ever assigned.
        save_metadata(&self.dir, inner.next_sequence)?;

        let compact_path = self.dir.join(COMPACT_FILE);
        let log_path = self.log_path();

        let mut buf = Vec::with_capacity(HEADER_SIZE + inner.index.len() * 64);
        buf.extend_from_slice(&header_bytes());
        for (key, entry) in &inner.index {
            let Some(series) = inner.series.get(&key.series) else {
                continue;
            };
            encode_frame(
                &mut buf,
                &series.labels,
                key.timestamp_ms,
                entry.value,
                key.sequence,
                entry.expires_at_ms,
            )?;
        }

        if let Err(e) = fs::remove_file(&compact_path)
            && e.kind() != ErrorKind::NotFound
        {
            return Err(self.io_error(&compact_path)(e));
        }
        // This handle becomes the log handle; it stays valid across the rename.
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create_new(true)
            .open(&compact_path)
            .map_err(self.io_error(&compact_path))?;
        file.write_all(&buf).map_err(self.io_error(&compact_path))?;
        file.sync_all().map_err(self.io_error(&compact_path))?;
        fs::rename(&compact_path, &log_path).map_err(self.io_error(&log_path))?;

        inner.file = Some(file);
        inner.len = buf.len() as u64;
        inner.frames = inner.index.len();
        inner.dirty = false;
        Ok(())
    }

    /// Flushes the log and persists the high-water mark, then releases the
    /// file and the lock. On error the store stays open and close can be
    /// retried.
    fn shutdown(&self, inner: &mut LogInner) -> Result<(), StoreWriteError> {
        let Some(file) = inner.file.as_ref() else {
            return Ok(());
        };
        let log_path = self.log_path();
        file.sync_data().map_err(self.io_error(&log_path))?;
        save_metadata(&self.dir, inner.next_sequence)?;
        inner.file = None;
        inner.lock = None;
        tracing::info!(path = %self.dir.display(), next_sequence = inner.next_sequence, "closed record log");
        Ok(())
    }
}

impl LogInner {
    fn insert(
        &mut self,
        labels: Arc<Labels>,
        timestamp_ms: i64,
        sequence: u64,
        value: f64,
        expires_at_ms: i64,
    ) {
        let series = labels.fingerprint();
        let key = EntryKey {
            series,
            timestamp_ms,
            sequence,
        };
        self.index.insert(
            key,
            Entry {
                value,
                expires_at_ms,
            },
        );
        self.expiry.insert((expires_at_ms, key));
        self.series
            .entry(series)
            .or_insert_with(|| SeriesEntry { labels, live: 0 })
            .live += 1;
    }

    /// Drops index entries that expired at or before `now_ms`.
    fn evict_expired(&mut self, now_ms: i64) -> usize {
        let mut expired = 0;
        while let Some(&(expires_at_ms, key)) = self.expiry.first() {
            if expires_at_ms > now_ms {
                break;
            }
            self.expiry.pop_first();
            if self.index.remove(&key).is_none() {
                continue;
            }
            expired += 1;
            if let Some(series) = self.series.get_mut(&key.series) {
                series.live -= 1;
                if series.live == 0 {
                    self.series.remove(&key.series);
                }
            }
        }
        expired
    }
}

impl PersistentStore for LogStore {
    fn write(&self, mut records: Vec<Record>, ttl: Duration) -> Result<WriteReceipt, StoreWriteError> {
        if records.is_empty() {
            return Ok(WriteReceipt::default());
        }

        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = unix_millis(self.clock.now()).saturating_add(ttl_ms);
        let log_path = self.log_path();

        let mut guard = self.lock_inner();
        let inner = &mut *guard;
        let file = inner.file.as_mut().ok_or(StoreWriteError::Closed)?;

        let first = inner.next_sequence;
        let mut buf = Vec::with_capacity(records.len() * 64);
        for record in &mut records {
            let sequence = inner.next_sequence;
            inner.next_sequence += 1;
            record
                .attach_sequence(sequence)
                .map_err(|e| StoreWriteError::Encode { reason: e.to_string() })?;
            encode_frame(
                &mut buf,
                record.labels(),
                record.timestamp_ms(),
                record.value(),
                sequence,
                expires_at_ms,
            )?;
        }
        let last = inner.next_sequence - 1;

        let sync = self.durability == Durability::Fsync;
        let appended = file
            .write_all(&buf)
            .and_then(|()| if sync { file.sync_data() } else { Ok(()) });
        if let Err(e) = appended {
            // Drop any partial frames so replay never sees half a batch.
            if let Err(truncate) = file.set_len(inner.len) {
                tracing::warn!(error = %truncate, "failed to roll back partial append");
            }
            return Err(self.io_error(&log_path)(e));
        }

        inner.len += buf.len() as u64;
        inner.frames += records.len();
        inner.dirty = !sync;

        let written = records.len();
        for record in records {
            let sequence = record.sequence().unwrap_or_default();
            inner.insert(
                Arc::clone(record.series()),
                record.timestamp_ms(),
                sequence,
                record.value(),
                expires_at_ms,
            );
        }

        Ok(WriteReceipt {
            written,
            sequences: Some(first..=last),
        })
    }

    fn maintain(&self) -> Result<MaintenanceReport, StoreWriteError> {
        let now_ms = unix_millis(self.clock.now());
        let log_path = self.log_path();

        let mut guard = self.lock_inner();
        let inner = &mut *guard;
        let file = inner.file.as_ref().ok_or(StoreWriteError::Closed)?;

        if inner.dirty {
            file.sync_data().map_err(self.io_error(&log_path))?;
            inner.dirty = false;
        }

        let expired = inner.evict_expired(now_ms);
        let dead = inner.frames - inner.index.len();
        let compacted = inner.frames >= COMPACTION_MIN_FRAMES && dead * 2 >= inner.frames;
        if compacted {
            self.compact(inner)?;
            tracing::debug!(live = inner.index.len(), reclaimed = dead, "compacted record log");
        }

        Ok(MaintenanceReport {
            expired,
            compacted,
            live: inner.index.len(),
        })
    }

    fn select(
        &self,
        selector: &Selector,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<StoredSample>, StoreWriteError> {
        let now_ms = unix_millis(self.clock.now());
        let inner = self.lock_inner();
        if inner.file.is_none() {
            return Err(StoreWriteError::Closed);
        }
        if start_ms > end_ms {
            return Ok(Vec::new());
        }

        let mut samples = Vec::new();
        let mut push = |key: &EntryKey, entry: &Entry| {
            if entry.expires_at_ms <= now_ms || key.timestamp_ms < start_ms || key.timestamp_ms > end_ms {
                return;
            }
            let Some(series) = inner.series.get(&key.series) else {
                return;
            };
            if !selector.matches(&series.labels) {
                return;
            }
            samples.push(StoredSample {
                labels: Arc::clone(&series.labels),
                timestamp_ms: key.timestamp_ms,
                value: entry.value,
                sequence: key.sequence,
                expires_at_ms: entry.expires_at_ms,
            });
        };

        match selector {
            Selector::Exact(labels) => {
                let series = labels.fingerprint();
                let lo = EntryKey {
                    series,
                    timestamp_ms: start_ms,
                    sequence: 0,
                };
                let hi = EntryKey {
                    series,
                    timestamp_ms: end_ms,
                    sequence: u64::MAX,
                };
                for (key, entry) in inner.index.range(lo..=hi) {
                    push(key, entry);
                }
            }
            Selector::Metric(_) | Selector::All => {
                for (key, entry) in &inner.index {
                    push(key, entry);
                }
            }
        }

        Ok(samples)
    }

    fn series(&self) -> Vec<Labels> {
        let inner = self.lock_inner();
        let mut series: Vec<Labels> = inner
            .series
            .values()
            .map(|s| s.labels.as_ref().clone())
            .collect();
        series.sort();
        series
    }

    fn close(&self) -> Result<(), StoreWriteError> {
        let mut inner = self.lock_inner();
        self.shutdown(&mut inner)
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        let mut inner = self.lock_inner();
        if let Err(e) = self.shutdown(&mut inner) {
            tracing::warn!(error = %e, "failed to close record log on drop");
        }
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("dir", &self.dir)
            .field("durability", &self.durability)
            .finish_non_exhaustive()
    }
}

fn header_bytes() -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&LOG_MAGIC);
    header[4..8].copy_from_slice(&LOG_VERSION.to_le_bytes());
    header
}

fn create_log_file(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
    file.write_all(&header_bytes())?;
    file.sync_all()
}

fn load_metadata(dir: &Path) -> Result<LogMetadata, StoreOpenError> {
    let path = dir.join(METADATA_FILE);
    if !path.exists() {
        return Ok(LogMetadata {
            version: METADATA_VERSION,
            next_sequence: 0,
        });
    }

    let json = fs::read_to_string(&path).map_err(|e| StoreOpenError::DirectoryAccess {
        path: path.display().to_string(),
        source: e,
    })?;
    let metadata: LogMetadata = serde_json::from_str(&json)?;
    if metadata.version != METADATA_VERSION {
        return Err(StoreOpenError::Corrupted {
            path: path.display().to_string(),
            reason: format!(
                "unsupported metadata version: expected {METADATA_VERSION}, found {}",
                metadata.version
            ),
        });
    }
    Ok(metadata)
}

/// Writes meta.json via a temp file and rename.
fn save_metadata(dir: &Path, next_sequence: u64) -> Result<(), StoreWriteError> {
    let path = dir.join(METADATA_FILE);
    let tmp_path = path.with_extension("json.tmp");
    let metadata = LogMetadata {
        version: METADATA_VERSION,
        next_sequence,
    };
    let json = serde_json::to_string_pretty(&metadata)?;
    let io = |p: &Path| {
        let p = p.display().to_string();
        move |source| StoreWriteError::Io { path: p, source }
    };
    fs::write(&tmp_path, json).map_err(io(&tmp_path))?;
    fs::rename(&tmp_path, &path).map_err(io(&path))?;
    Ok(())
}

/// Appends one encoded frame to `buf`.
fn encode_frame(
    buf: &mut Vec<u8>,
    labels: &Labels,
    timestamp_ms: i64,
    value: f64,
    sequence: u64,
    expires_at_ms: i64,
) -> Result<(), StoreWriteError> {
    let too_long = |what: &str| StoreWriteError::Encode {
        reason: format!("{what} exceeds {} bytes", u16::MAX),
    };

    let label_count = u16::try_from(labels.len()).map_err(|_| too_long("label count"))?;

    let len_offset = buf.len();
    buf.extend_from_slice(&[0u8; FRAME_LEN_SIZE]);
    let payload_start = buf.len();

    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&timestamp_ms.to_le_bytes());
    buf.extend_from_slice(&value.to_le_bytes());
    buf.extend_from_slice(&expires_at_ms.to_le_bytes());
    buf.extend_from_slice(&label_count.to_le_bytes());
    for (name, val) in labels.iter() {
        for part in [name, val] {
            let len = u16::try_from(part.len()).map_err(|_| too_long("label"))?;
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(part.as_bytes());
        }
    }

    let payload_len =
        u32::try_from(buf.len() - payload_start).map_err(|_| too_long("frame"))?;
    buf[len_offset..payload_start].copy_from_slice(&payload_len.to_le_bytes());
    Ok(())
}

/// One frame decoded during replay.
#[derive(Debug)]
struct DecodedFrame {
    sequence: u64,
    timestamp_ms: i64,
    value: f64,
    expires_at_ms: i64,
    labels: Arc<Labels>,
}

/// Bounds-checked little-endian reader over a frame payload.
struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> Option<i64> {
        self.array().map(i64::from_le_bytes)
    }

    fn f64(&mut self) -> Option<f64> {
        self.array().map(f64::from_le_bytes)
    }

    fn string(&mut self) -> Option<String> {
        let len = self.u16()?;
        let bytes = self.take(usize::from(len))?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }
}

fn decode_frame(payload: &[u8]) -> Option<DecodedFrame> {
    if payload.len() < FIXED_PAYLOAD_SIZE {
        return None;
    }
    let mut reader = FrameReader::new(payload);
    let sequence = reader.u64()?;
    let timestamp_ms = reader.i64()?;
    let value = reader.f64()?;
    let expires_at_ms = reader.i64()?;
    let label_count = reader.u16()?;

    let mut pairs = Vec::with_capacity(usize::from(label_count));
    for _ in 0..label_count {
        let name = reader.string()?;
        let val = reader.string()?;
        pairs.push((name, val));
    }
    if !reader.is_exhausted() {
        return None;
    }

    Some(DecodedFrame {
        sequence,
        timestamp_ms,
        value,
        expires_at_ms,
        labels: Arc::new(Labels::new(pairs)),
    })
}

struct Replay {
    valid_len: u64,
    frames: Vec<DecodedFrame>,
}

/// Validates the header and decodes every complete frame.
///
/// Decoding stops at the first incomplete or undecodable frame; everything
/// from there on is reported as invalid so the caller can truncate it.
fn replay_log(file: &File, path: &Path) -> Result<Replay, StoreOpenError> {
    let path_str = path.display().to_string();

    // SAFETY: the store lock is held, so no other handle writes or truncates
    // the file while it is mapped, and the map is dropped before this
    // function returns and the caller modifies the file.
    let mmap = unsafe { Mmap::map(file) }.map_err(|e| StoreOpenError::DirectoryAccess {
        path: path_str.clone(),
        source: e,
    })?;

    if mmap.len() < HEADER_SIZE {
        return Err(StoreOpenError::Corrupted {
            path: path_str,
            reason: format!(
                "file too small: {} bytes, expected at least {HEADER_SIZE}",
                mmap.len()
            ),
        });
    }
    if mmap[0..4] != LOG_MAGIC {
        return Err(StoreOpenError::Corrupted {
            path: path_str,
            reason: format!(
                "invalid magic bytes: expected {LOG_MAGIC:?}, found {:?}",
                &mmap[0..4]
            ),
        });
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&mmap[4..8]);
    let version = u32::from_le_bytes(version);
    if version != LOG_VERSION {
        return Err(StoreOpenError::Corrupted {
            path: path_str,
            reason: format!("unsupported version: expected {LOG_VERSION}, found {version}"),
        });
    }

    let mut offset = HEADER_SIZE;
    let mut frames = Vec::new();
    while offset + FRAME_LEN_SIZE <= mmap.len() {
        let mut len = [0u8; FRAME_LEN_SIZE];
        len.copy_from_slice(&mmap[offset..offset + FRAME_LEN_SIZE]);
        let payload_len = u32::from_le_bytes(len) as usize;

        let payload_start = offset + FRAME_LEN_SIZE;
        let Some(payload) = mmap.get(payload_start..payload_start + payload_len) else {
            break;
        };
        let Some(frame) = decode_frame(payload) else {
            break;
        };
        frames.push(frame);
        offset = payload_start + payload_len;
    }

    Ok(Replay {
        valid_len: offset as u64,
        frames,
    })
}
