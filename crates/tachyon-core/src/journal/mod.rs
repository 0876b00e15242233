//! Write-ahead log + checkpoint persistence.
//!
//! Each record is a little-endian `u32` length prefix followed by a
//! `bincode`-encoded [`JournalRecord`]. Appends are append-and-flush: the
//! call does not return until the record is durably written. The internal
//! writer lock is independent of `ns`/`deps`/`workers` and may be acquired
//! while any of those are held (see `SPEC_FULL.md` §5).

pub mod error;
pub mod record;

use std::fs::{self, File as StdFile, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

pub use error::{JournalError, JournalResult};
pub use record::JournalRecord;

/// An open write-ahead log plus the paths of its checkpoint companion.
pub struct Journal {
    log_path: PathBuf,
    checkpoint_path: PathBuf,
    writer: Mutex<BufWriter<StdFile>>,
    txn_counter: AtomicU64,
}

impl Journal {
    /// Opens (creating if absent) the log file for appending.
    pub fn open(log_path: impl Into<PathBuf>, checkpoint_path: impl Into<PathBuf>) -> JournalResult<Self> {
        let log_path = log_path.into();
        let checkpoint_path = checkpoint_path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        Ok(Self {
            log_path,
            checkpoint_path,
            writer: Mutex::new(BufWriter::new(file)),
            txn_counter: AtomicU64::new(1),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Appends a single record, durably, before returning.
    #[tracing::instrument(level = "trace", skip(self, record))]
    pub fn append(&self, record: &JournalRecord) -> JournalResult<()> {
        let mut writer = self.writer.lock();
        write_record(&mut *writer, record)?;
        writer.flush()?;
        Ok(())
    }

    /// Appends a group of records bracketed by `TxnBegin`/`TxnCommit`
    /// markers, so recovery can detect and discard a torn write.
    pub fn append_txn(&self, records: &[JournalRecord]) -> JournalResult<()> {
        let txn_id = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        let mut writer = self.writer.lock();
        write_record(&mut *writer, &JournalRecord::TxnBegin { txn_id })?;
        for record in records {
            write_record(&mut *writer, record)?;
        }
        write_record(&mut *writer, &JournalRecord::TxnCommit { txn_id })?;
        writer.flush()?;
        Ok(())
    }

    /// Reads every well-formed record from `path` in order, dropping a
    /// trailing unterminated transaction's records (and tolerating an
    /// entirely absent file by returning an empty list).
    pub fn read_all(path: &Path) -> JournalResult<Vec<JournalRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = StdFile::open(path)?;
        let mut reader = BufReader::new(file);
        let mut all = Vec::new();
        loop {
            match read_record(&mut reader) {
                Ok(Some(record)) => all.push(record),
                Ok(None) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(discard_torn_transaction(all))
    }

    /// Atomically replaces the checkpoint file with `records`, then
    /// truncates the log to empty and re-opens the writer.
    pub fn compact(&self, records: &[JournalRecord]) -> JournalResult<()> {
        let tmp_path = self.checkpoint_path.with_extension("tmp");
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for record in records {
                write_record(&mut writer, record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.checkpoint_path)?;

        let mut writer = self.writer.lock();
        let truncated = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.log_path)?;
        *writer = BufWriter::new(truncated);
        tracing::info!(records = records.len(), "compacted journal to checkpoint");
        Ok(())
    }
}

/// Drops the records of a `TxnBegin` with no matching `TxnCommit` at the
/// tail of the stream (a crash mid-transaction). Fully committed
/// transactions and non-transactional records pass through unchanged.
fn discard_torn_transaction(records: Vec<JournalRecord>) -> Vec<JournalRecord> {
    let mut out = Vec::with_capacity(records.len());
    let mut pending: Vec<JournalRecord> = Vec::new();
    let mut open_txn: Option<u64> = None;

    for record in records {
        match &record {
            JournalRecord::TxnBegin { txn_id } => {
                open_txn = Some(*txn_id);
                pending.clear();
            }
            JournalRecord::TxnCommit { txn_id } if Some(*txn_id) == open_txn => {
                out.append(&mut pending);
                open_txn = None;
            }
            _ if open_txn.is_some() => {
                pending.push(record);
            }
            _ => out.push(record),
        }
    }
    // `pending` non-empty here means the last transaction never committed;
    // its records are discarded, matching recovery's torn-tail handling.
    out
}

fn write_record(writer: &mut impl Write, record: &JournalRecord) -> JournalResult<()> {
    let bytes = bincode::serialize(record)?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| JournalError::Corrupt { reason: "record too large".into() })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

fn read_record(reader: &mut impl Read) -> JournalResult<Option<JournalRecord>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            JournalError::Corrupt {
                reason: "truncated record at end of file".into(),
            }
        } else {
            JournalError::Io(e)
        }
    })?;
    let record = bincode::deserialize(&buf)?;
    Ok(Some(record))
}
