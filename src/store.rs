//! Crash-safe JSON-lines record storage.
//!
//! Three operations share one on-disk format (one JSON object per line):
//!
//! - `read_safely` loads every valid record and moves the rest to a
//!   sibling `<path>.corrupt` quarantine file
//! - `write_atomic` rewrites the whole file through a temp sibling + rename
//! - `append_one` appends a single line for high-frequency writers
//!
//! Two concurrent `write_atomic` calls on the same file race at the rename
//! step: the last writer wins and nothing is merged. Appends from
//! independent processes may interleave line by line.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Returns the quarantine path for a data file: `<path>.corrupt`.
pub fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Reads every record of a JSONL file that parses as `T` and passes `is_valid`.
///
/// A missing file yields an empty Vec. Lines are split on `\n` and decoded
/// one at a time, so a torn or non-UTF-8 line only costs itself. Lines that
/// fail to decode, parse or validate are appended byte for byte, in order,
/// to the quarantine file and excluded from the result.
///
/// After quarantining, the source is rewritten with only its valid lines so
/// the same corrupt line is never quarantined twice. A record appended by
/// another process between the read and that rewrite is lost.
pub fn read_safely<T, F>(path: &Path, is_valid: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };

    let mut records = Vec::new();
    let mut kept: Vec<&[u8]> = Vec::new();
    let mut corrupt: Vec<&[u8]> = Vec::new();

    for line in content.split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record = std::str::from_utf8(line)
            .ok()
            .and_then(|text| serde_json::from_str::<T>(text).ok())
            .filter(|record| is_valid(record));
        match record {
            Some(record) => {
                records.push(record);
                kept.push(line);
            }
            None => corrupt.push(line),
        }
    }

    if corrupt.is_empty() {
        return Ok(records);
    }

    let qpath = quarantine_path(path);
    warn!(
        "Quarantining {} corrupt record(s) from {} to {}",
        corrupt.len(),
        path.display(),
        qpath.display()
    );
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&qpath)
        .with_context(|| format!("failed to open quarantine file {}", qpath.display()))?;
    file.write_all(&join_lines(&corrupt))
        .with_context(|| format!("failed to write quarantine file {}", qpath.display()))?;

    if let Err(e) = replace_atomic(path, &join_lines(&kept)) {
        warn!("Failed to compact {} after quarantine: {e:#}", path.display());
    }

    Ok(records)
}

fn join_lines(lines: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    for line in lines {
        buf.extend_from_slice(line);
        buf.push(b'\n');
    }
    buf
}

/// Replaces the file content with `entries`, one JSON object per line.
///
/// Readers either see the old file or the complete new one. The temp file
/// never outlives the call.
pub fn write_atomic<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    let mut buf = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }
    replace_atomic(path, &buf)
}

fn replace_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "records".to_string());
    let temp_path = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = write_temp_and_rename(&temp_path, path, content);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(temp_path)
            .with_context(|| format!("failed to open temp file {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("failed to write temp file {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync temp file {}", temp_path.display()))?;
    }

    fs::rename(temp_path, path).with_context(|| {
        format!(
            "failed to atomically replace {} with {}",
            path.display(),
            temp_path.display()
        )
    })?;

    Ok(())
}

/// Appends a single record as one line, creating the file if needed.
pub fn append_one<T: Serialize>(path: &Path, entry: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{json}")?;
    Ok(())
}
