use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use threadwatch_core::{Generation, Thread};

use crate::error::{Result, SnapshotError};
use crate::lock::StoreLock;

pub const SNAPSHOT_FORMAT: &str = "threadwatch-snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persistence boundary for thread generations.
pub trait SnapshotStore: Send + Sync {
    /// Previous generation; empty when nothing has been saved yet.
    fn load(&self) -> Result<Generation>;

    /// Replaces all persisted content with `generation`.
    fn save(&self, generation: &Generation) -> Result<()>;

    /// Drops persisted lines that are not thread records, keeping the header.
    fn sanitize(&self) -> Result<SanitizeReport>;
}

/// First line of every snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format: String,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub threads: usize,
}

impl SnapshotHeader {
    pub fn new(threads: usize) -> Self {
        Self {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            threads,
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str::<Self>(line.trim())
            .ok()
            .filter(|header| header.format == SNAPSHOT_FORMAT)
    }

    fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(SnapshotError::Header)
    }
}

/// Outcome of a format-sanitization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub kept: usize,
    pub dropped: usize,
    pub header_restored: bool,
    pub rewritten: bool,
}

/// JSONL-backed [`SnapshotStore`].
///
/// Saves are crash-safe: content goes to a `.tmp` sibling that is fsync'd
/// and renamed over the snapshot, so a crash leaves either the old or the new
/// file, never a mix.  Lines dropped by [`sanitize`](SnapshotStore::sanitize)
/// are appended to a `.corrupt` sidecar for inspection.
#[derive(Debug, Clone)]
pub struct JsonlSnapshotStore {
    path: PathBuf,
}

impl JsonlSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn corrupt_path(&self) -> PathBuf {
        self.sibling("corrupt")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.sibling("lock")
    }

    /// Takes the exclusive lock that guards this snapshot across processes.
    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(self.lock_path())
    }

    /// Reads the header line, if the file has a recognisable one.
    pub fn header(&self) -> Result<Option<SnapshotHeader>> {
        let Some(raw) = self.read()? else {
            return Ok(None);
        };
        Ok(split_lines(&raw)
            .next()
            .and_then(|first| first.ok())
            .and_then(SnapshotHeader::parse))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let filename = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "threads.jsonl".to_string());
        self.path.with_file_name(format!("{filename}.{suffix}"))
    }

    /// Raw bytes; lines are decoded one at a time so a torn write only
    /// costs the lines it touched.
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SnapshotError::io(&self.path)(err)),
        }
    }

    fn write_atomic(&self, lines: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SnapshotError::io(parent))?;
        }

        let tmp_path = self.sibling("tmp");
        let write_result = (|| -> std::io::Result<()> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for line in lines {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(SnapshotError::io(&tmp_path)(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(SnapshotError::io(&self.path)(err));
        }
        Ok(())
    }

    /// Best effort: losing the forensic copy must not fail the pass.
    fn quarantine(&self, lines: &[Cow<'_, str>]) {
        let corrupt_path = self.corrupt_path();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&corrupt_path)
            .and_then(|mut file| {
                for line in lines {
                    writeln!(file, "{line}")?;
                }
                Ok(())
            });
        if let Err(err) = result {
            warn!(
                error = %err,
                path = %corrupt_path.display(),
                "could not write discarded snapshot lines to sidecar"
            );
        }
    }
}

/// A snapshot line, or a lossy copy of one that is not valid UTF-8.
type RawLine<'a> = std::result::Result<&'a str, String>;

/// Splits like [`str::lines`], decoding each line on its own.
fn split_lines(raw: &[u8]) -> impl Iterator<Item = RawLine<'_>> {
    let body = raw.strip_suffix(b"\n").unwrap_or(raw);
    let pieces = (!raw.is_empty()).then(|| body.split(|byte| *byte == b'\n'));
    pieces.into_iter().flatten().map(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        std::str::from_utf8(line).map_err(|_| String::from_utf8_lossy(line).into_owned())
    })
}

fn parse_record(line: &str) -> Option<Thread> {
    serde_json::from_str(line.trim()).ok()
}

impl SnapshotStore for JsonlSnapshotStore {
    fn load(&self) -> Result<Generation> {
        let Some(raw) = self.read()? else {
            return Ok(Generation::new());
        };

        let mut generation = Generation::new();
        let mut discarded: Vec<Cow<'_, str>> = Vec::new();

        for (line_idx, line) in split_lines(&raw).enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(lossy) => {
                    warn!(
                        line = line_idx + 1,
                        path = %self.path.display(),
                        "snapshot line is not valid UTF-8, skipping line"
                    );
                    discarded.push(Cow::Owned(lossy));
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Thread>(line.trim()) {
                Ok(thread) => {
                    let id = thread.id;
                    if !generation.insert(thread) {
                        warn!(
                            id,
                            line = line_idx + 1,
                            "duplicate thread in snapshot, keeping first record"
                        );
                    }
                }
                Err(_) if line_idx == 0 && SnapshotHeader::parse(line).is_some() => {
                    debug!(path = %self.path.display(), "snapshot header skipped");
                }
                Err(err) => {
                    discarded.push(Cow::Borrowed(line));
                    warn!(
                        line = line_idx + 1,
                        error = %err,
                        path = %self.path.display(),
                        "malformed snapshot record, skipping line"
                    );
                }
            }
        }

        if !discarded.is_empty() {
            warn!(
                skipped = discarded.len(),
                loaded = generation.len(),
                path = %self.path.display(),
                "snapshot loaded with skipped records"
            );
            self.quarantine(&discarded);
        }
        Ok(generation)
    }

    fn save(&self, generation: &Generation) -> Result<()> {
        let mut lines = Vec::with_capacity(generation.len() + 1);
        lines.push(SnapshotHeader::new(generation.len()).to_line()?);
        for thread in generation {
            let line = serde_json::to_string(thread).map_err(|source| SnapshotError::Encode {
                id: thread.id,
                source,
            })?;
            lines.push(line);
        }
        self.write_atomic(&lines)?;
        debug!(threads = generation.len(), path = %self.path.display(), "snapshot saved");
        Ok(())
    }

    fn sanitize(&self) -> Result<SanitizeReport> {
        let Some(raw) = self.read()? else {
            return Ok(SanitizeReport::default());
        };

        let mut report = SanitizeReport::default();
        let mut lines = split_lines(&raw);
        let mut header: Option<String> = None;
        let mut records: Vec<String> = Vec::new();
        let mut discarded: Vec<Cow<'_, str>> = Vec::new();
        let mut blank_lines = false;

        match lines.next() {
            None => return Ok(report),
            Some(Err(lossy)) => {
                report.header_restored = true;
                discarded.push(Cow::Owned(lossy));
            }
            Some(Ok(first)) if parse_record(first).is_some() => {
                report.header_restored = true;
                records.push(first.trim().to_string());
            }
            Some(Ok(first)) => header = Some(first.to_string()),
        }

        for line in lines {
            match line {
                Err(lossy) => discarded.push(Cow::Owned(lossy)),
                Ok(line) if line.trim().is_empty() => blank_lines = true,
                Ok(line) if parse_record(line).is_some() => records.push(line.trim().to_string()),
                Ok(line) => discarded.push(Cow::Borrowed(line)),
            }
        }

        report.kept = records.len();
        report.dropped = discarded.len();

        if !discarded.is_empty() {
            warn!(
                dropped = discarded.len(),
                path = %self.path.display(),
                sidecar = %self.corrupt_path().display(),
                "discarded malformed snapshot lines"
            );
            self.quarantine(&discarded);
        }

        if report.dropped == 0 && !report.header_restored && !blank_lines {
            return Ok(report);
        }

        let header = match header {
            Some(line) => line,
            None => SnapshotHeader::new(records.len()).to_line()?,
        };
        let mut rewritten = Vec::with_capacity(records.len() + 1);
        rewritten.push(header);
        rewritten.extend(records);
        self.write_atomic(&rewritten)?;
        report.rewritten = true;
        Ok(report)
    }
}
