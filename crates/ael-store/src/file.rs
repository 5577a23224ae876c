use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ael_types::{EntryId, EntryRecord, LedgerEntry};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{LedgerStore, WriteLock};

/// Flush/sync strategy for the ledger file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Committed extent of the ledger file, as last observed by this handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Tail {
    /// Length of the committed prefix.
    len: u64,
    /// Number of committed lines.
    lines: u64,
    /// Byte offset of the last committed line.
    last_start: Option<u64>,
}

/// Internal mutable state for the file writer.
struct FileWriter {
    file: File,
    lock_file: File,
    tail: Tail,
    /// The file lock is held by an open writer section.
    exclusive: bool,
    /// A partial append could not be rolled back; writes are refused.
    broken: Option<String>,
    #[cfg(test)]
    fault: Option<Fault>,
}

#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    /// Write half of the next line, then fail.
    TornWrite,
    /// Like `TornWrite`, and the rollback fails too.
    StuckTornWrite,
}

/// JSON-lines ledger file.
///
/// On-disk format: one JSON-serialized [`LedgerEntry`] per line, each line
/// terminated by `\n`. A line only counts as committed once its terminator
/// is on disk, so a torn write from a crash is never returned to readers.
///
/// Writers are excluded across processes by an advisory lock on a sidecar
/// `<path>.lock` file. Inserts and purges take it for their own duration;
/// [`LedgerStore::begin_write`] holds it for a whole read-last, hash and
/// insert sequence. Every handle tracks where the last committed line
/// starts, so `last` reads one line instead of the whole file and catches up
/// with appends made through other handles by scanning only the new bytes.
pub struct FileLedgerStore {
    path: PathBuf,
    writer: Mutex<FileWriter>,
    gate: Mutex<()>,
    sync_mode: SyncMode,
}

impl FileLedgerStore {
    /// Open (or create) a ledger file at the given path.
    ///
    /// Blocks while another process holds the ledger's writer lock, then
    /// truncates any torn tail left by a crashed writer.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path(path))?;

        FileExt::lock_exclusive(&lock_file)?;
        let recovered = recover_tail(path, &file);
        unlock_or_warn(&lock_file, path);
        let tail = recovered?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(FileWriter {
                file,
                lock_file,
                tail,
                exclusive: false,
                broken: None,
                #[cfg(test)]
                fault: None,
            }),
            gate: Mutex::new(()),
            sync_mode,
        })
    }

    /// Path to the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, FileWriter>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger file mutex poisoned".into()))
    }

    /// Run `f` under the file lock, taking it for the call unless an open
    /// writer section already holds it.
    fn with_file_lock<T>(
        &self,
        f: impl FnOnce(&mut FileWriter) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut w = self.lock_writer()?;
        let scoped = !w.exclusive;
        if scoped {
            FileExt::lock_exclusive(&w.lock_file)?;
        }
        let result = f(&mut *w);
        if scoped {
            unlock_or_warn(&w.lock_file, &self.path);
        }
        result
    }

    /// Catch up with appends and purges made through other handles.
    ///
    /// An unterminated tail is only truncated when `locked`; otherwise it
    /// may be another writer's append in flight.
    fn refresh(&self, w: &mut FileWriter, locked: bool) -> StoreResult<()> {
        let len = w.file.metadata()?.len();
        if len == w.tail.len {
            return Ok(());
        }

        let continues = len > w.tail.len && ends_with_newline(&w.file, w.tail.len)?;
        let from = if continues { w.tail } else { Tail::default() };
        let tail = scan(&w.file, from, len)?;

        if locked && tail.len < len {
            warn!(
                path = %self.path.display(),
                committed = tail.len,
                file_len = len,
                "truncating torn tail of ledger file"
            );
            w.file.set_len(tail.len)?;
            w.file.sync_all()?;
        }
        w.tail = tail;
        Ok(())
    }

    fn write_line(&self, w: &mut FileWriter, line: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        {
            if w.fault.is_some() {
                w.file.write_all(&line[..line.len() / 2])?;
                return Err(io::Error::other("injected write failure"));
            }
        }

        w.file.write_all(line)?;
        w.file.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.file.sync_data()?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn inject_fault(&self, fault: Option<Fault>) {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fault = fault;
    }
}

impl LedgerStore for FileLedgerStore {
    fn insert(&self, record: EntryRecord) -> StoreResult<LedgerEntry> {
        let entry = LedgerEntry::new(EntryId::new(), record);
        let mut line =
            serde_json::to_vec(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push(b'\n');

        self.with_file_lock(|w| {
            if let Some(reason) = &w.broken {
                return Err(StoreError::Unavailable(reason.clone()));
            }
            self.refresh(w, true)?;
            let start = w.tail.len;

            if let Err(e) = self.write_line(w, &line) {
                if let Err(rollback) = roll_back(w, start) {
                    error!(
                        offset = start,
                        error = %rollback,
                        path = %self.path.display(),
                        "failed to roll back partial append; refusing further writes"
                    );
                    w.broken = Some(format!(
                        "partial append at offset {start} could not be rolled back: {rollback}"
                    ));
                }
                return Err(e.into());
            }

            w.tail = Tail {
                len: start + line.len() as u64,
                lines: w.tail.lines + 1,
                last_start: Some(start),
            };
            debug!(offset = start, len = line.len(), id = %entry.id, "ledger file append");
            Ok(())
        })?;

        Ok(entry)
    }

    fn last(&self) -> StoreResult<Option<LedgerEntry>> {
        let mut w = self.lock_writer()?;
        let locked = w.exclusive;
        self.refresh(&mut w, locked)?;

        let Some(start) = w.tail.last_start else {
            return Ok(None);
        };
        let line = read_range(&w.file, start, w.tail.len)?;
        parse_line(&line, w.tail.lines).map(Some)
    }

    fn read_all(&self) -> StoreResult<Vec<LedgerEntry>> {
        let contents = fs::read(&self.path)?;
        let committed: &[u8] = match contents.iter().rposition(|b| *b == b'\n') {
            Some(end) => &contents[..end],
            None => return Ok(Vec::new()),
        };

        committed
            .split(|b| *b == b'\n')
            .enumerate()
            .map(|(index, line)| parse_line(line, index as u64 + 1))
            .collect()
    }

    fn count(&self) -> StoreResult<u64> {
        let mut w = self.lock_writer()?;
        let locked = w.exclusive;
        self.refresh(&mut w, locked)?;
        Ok(w.tail.lines)
    }

    fn purge(&self) -> StoreResult<u64> {
        self.with_file_lock(|w| {
            self.refresh(w, true)?;
            let removed = w.tail.lines;
            w.file.set_len(0)?;
            w.file.sync_all()?;
            w.tail = Tail::default();
            w.broken = None;
            warn!(removed, path = %self.path.display(), "ledger file purged");
            Ok(removed)
        })
    }

    fn begin_write(&self) -> StoreResult<WriteLock<'_>> {
        // The gate serializes sections within this process; the file lock
        // is per handle and would let two threads of one handle through.
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut w = self.lock_writer()?;
            FileExt::lock_exclusive(&w.lock_file)?;
            w.exclusive = true;
        }
        Ok(WriteLock::holding(WriterSection {
            store: self,
            _gate: gate,
        }))
    }
}

/// Open writer section of a [`FileLedgerStore`]; releases the file lock on drop.
struct WriterSection<'a> {
    store: &'a FileLedgerStore,
    _gate: MutexGuard<'a, ()>,
}

impl Drop for WriterSection<'_> {
    fn drop(&mut self) {
        let mut w = self
            .store
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        w.exclusive = false;
        unlock_or_warn(&w.lock_file, &self.store.path);
    }
}

impl std::fmt::Debug for FileLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedgerStore")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn unlock_or_warn(lock_file: &File, path: &Path) {
    if let Err(e) = FileExt::unlock(lock_file) {
        warn!(path = %path.display(), error = %e, "failed to release ledger file lock");
    }
}

fn roll_back(w: &mut FileWriter, len: u64) -> io::Result<()> {
    #[cfg(test)]
    {
        if w.fault == Some(Fault::StuckTornWrite) {
            return Err(io::Error::other("injected rollback failure"));
        }
    }
    w.file.set_len(len)
}

fn parse_line(line: &[u8], number: u64) -> StoreResult<LedgerEntry> {
    serde_json::from_slice(line).map_err(|e| StoreError::Corrupt {
        line: number,
        reason: e.to_string(),
    })
}

/// Extend `from` with the committed lines in `from.len..end`.
fn scan(file: &File, from: Tail, end: u64) -> io::Result<Tail> {
    let mut bytes = Vec::new();
    let mut reader = file;
    reader.seek(SeekFrom::Start(from.len))?;
    reader.take(end - from.len).read_to_end(&mut bytes)?;

    let mut tail = from;
    let mut line_start = from.len;
    for (i, byte) in bytes.iter().enumerate() {
        if *byte == b'\n' {
            tail.last_start = Some(line_start);
            tail.lines += 1;
            line_start = from.len + i as u64 + 1;
        }
    }
    tail.len = line_start;
    Ok(tail)
}

fn read_range(file: &File, start: u64, end: u64) -> io::Result<Vec<u8>> {
    let mut buf = vec![0; (end - start) as usize];
    let mut reader = file;
    reader.seek(SeekFrom::Start(start))?;
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Whether the committed prefix of length `len` still ends a line.
fn ends_with_newline(file: &File, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    Ok(read_range(file, len - 1, len)? == b"\n")
}

/// Drop any unterminated tail left by a crash and return the committed extent.
fn recover_tail(path: &Path, file: &File) -> StoreResult<Tail> {
    let file_len = file.metadata()?.len();
    let tail = scan(file, Tail::default(), file_len)?;

    if tail.len < file_len {
        warn!(
            path = %path.display(),
            committed = tail.len,
            file_len,
            "truncating torn tail of ledger file"
        );
        file.set_len(tail.len)?;
        file.sync_all()?;
    }

    Ok(tail)
}
