use async_trait::async_trait;
use regmap_schemas::LeafPayload;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{LogError, LogLeaf, LogSource};

/// Logs stored as JSON Lines files, `<dir>/<log_id>.jsonl`.
///
/// Leaf `i` is the `i`-th non-blank line. A missing file is an empty log.
///
/// Each file is indexed once (byte span per line) and the index is extended
/// as the file grows, so a sequential scan reads every byte about twice no
/// matter the batch size. Files are append-only; a file that shrinks is
/// re-indexed from scratch.
#[derive(Debug)]
pub struct JsonlLog {
    dir: PathBuf,
    indexes: Mutex<HashMap<i64, LineIndex>>,
    bytes_read: AtomicU64,
}

#[derive(Debug, Default)]
struct LineIndex {
    /// Prefix of the file covered by `lines`; always just past a newline.
    indexed_len: u64,
    /// `[start, end)` byte span of each complete, non-blank line (trimmed).
    lines: Vec<(u64, u64)>,
    /// Non-blank text after the last newline. Re-read on every refresh.
    tail: Option<Vec<u8>>,
}

impl LineIndex {
    fn leaf_count(&self) -> u64 {
        self.lines.len() as u64 + u64::from(self.tail.is_some())
    }
}

impl JsonlLog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            indexes: Mutex::new(HashMap::new()),
            bytes_read: AtomicU64::new(0),
        }
    }

    pub fn log_path(&self, log_id: i64) -> PathBuf {
        log_path(&self.dir, log_id)
    }

    /// Total bytes read from log files so far (indexing plus leaf reads).
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Index whatever was appended to the file since the last refresh.
    async fn refresh(&self, log_id: i64, index: &mut LineIndex) -> Result<(), LogError> {
        let mut file = match tokio::fs::File::open(self.log_path(log_id)).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                *index = LineIndex::default();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        if len < index.indexed_len {
            debug!(log_id, len, indexed = index.indexed_len, "log file shrank, re-indexing");
            *index = LineIndex::default();
        }
        index.tail = None;
        if len == index.indexed_len {
            return Ok(());
        }

        let base = index.indexed_len;
        file.seek(SeekFrom::Start(base)).await?;
        let mut buf = Vec::with_capacity((len - base) as usize);
        file.read_to_end(&mut buf).await?;
        self.bytes_read
            .fetch_add(buf.len() as u64, Ordering::Relaxed);

        let mut pos = 0usize;
        while let Some(nl) = buf[pos..].iter().position(|b| *b == b'\n') {
            let (s, e) = trimmed_span(&buf[pos..pos + nl]);
            if s < e {
                index
                    .lines
                    .push((base + (pos + s) as u64, base + (pos + e) as u64));
            }
            pos += nl + 1;
        }
        index.indexed_len = base + pos as u64;

        let (s, e) = trimmed_span(&buf[pos..]);
        if s < e {
            index.tail = Some(buf[pos + s..pos + e].to_vec());
        }
        Ok(())
    }

    /// Read the contiguous byte range holding `spans` with one seek.
    async fn read_spans(
        &self,
        log_id: i64,
        first_index: u64,
        spans: &[(u64, u64)],
    ) -> Result<Vec<LogLeaf>, LogError> {
        let (Some(&(lo, _)), Some(&(_, hi))) = (spans.first(), spans.last()) else {
            return Ok(Vec::new());
        };

        let mut file = tokio::fs::File::open(self.log_path(log_id)).await?;
        file.seek(SeekFrom::Start(lo)).await?;
        let mut buf = vec![0u8; (hi - lo) as usize];
        file.read_exact(&mut buf).await?;
        self.bytes_read
            .fetch_add(buf.len() as u64, Ordering::Relaxed);

        Ok(spans
            .iter()
            .enumerate()
            .map(|(i, &(s, e))| {
                LogLeaf::new(
                    first_index + i as u64,
                    buf[(s - lo) as usize..(e - lo) as usize].to_vec(),
                )
            })
            .collect())
    }
}

#[async_trait]
impl LogSource for JsonlLog {
    fn source_name(&self) -> &'static str {
        "jsonl"
    }

    async fn tree_size(&self, log_id: i64) -> Result<u64, LogError> {
        let mut indexes = self.indexes.lock().await;
        let index = indexes.entry(log_id).or_default();
        self.refresh(log_id, index).await?;
        Ok(index.leaf_count())
    }

    async fn get_leaves_by_range(
        &self,
        log_id: i64,
        start: u64,
        count: u64,
    ) -> Result<Vec<LogLeaf>, LogError> {
        let mut indexes = self.indexes.lock().await;
        let index = indexes.entry(log_id).or_default();

        let want_end = start.saturating_add(count);
        if want_end > index.lines.len() as u64 {
            self.refresh(log_id, index).await?;
        }

        let end = want_end.min(index.leaf_count());
        if start >= end {
            return Ok(Vec::new());
        }

        let complete = index.lines.len() as u64;
        let line_end = end.min(complete);
        let mut out = if start < line_end {
            let spans = &index.lines[start as usize..line_end as usize];
            self.read_spans(log_id, start, spans).await?
        } else {
            Vec::new()
        };

        if end > complete {
            if let Some(tail) = &index.tail {
                out.push(LogLeaf::new(complete, tail.clone()));
            }
        }
        Ok(out)
    }
}

/// Append-only writer for a JSONL log. One leaf == one compact JSON line.
///
/// Payloads are validated with the leaf decoder before anything touches the
/// file, so a log written through here always decodes.
pub struct LeafWriter {
    path: PathBuf,
    /// Index the next appended leaf will get.
    next_index: u64,
    /// The file ends in an unterminated line; the next append starts a new one.
    needs_newline: bool,
}

impl LeafWriter {
    /// Open (or create) `<dir>/<log_id>.jsonl`, creating parent dirs.
    pub fn open(dir: impl AsRef<Path>, log_id: i64) -> Result<Self, LogError> {
        let path = log_path(dir.as_ref(), log_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (next_index, needs_newline) = match fs::read(&path) {
            Ok(bytes) => (
                count_leaves(&bytes),
                bytes.last().is_some_and(|b| *b != b'\n'),
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => (0, false),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            next_index,
            needs_newline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Append one leaf and return its index.
    pub fn append(&mut self, payload: &LeafPayload) -> Result<u64, LogError> {
        let bytes = payload
            .encode()
            .map_err(|e| LogError::InvalidPayload(e.into()))?;
        append_line(&self.path, &bytes, self.needs_newline)?;
        self.needs_newline = false;

        let index = self.next_index;
        self.next_index += 1;
        debug!(leaf_index = index, key = payload.entry.key(), "appended leaf");
        Ok(index)
    }

    /// Validate raw payload bytes as a leaf, then append them re-encoded.
    pub fn append_raw(&mut self, raw: &[u8]) -> Result<u64, LogError> {
        let payload = LeafPayload::decode(raw)?;
        self.append(&payload)
    }
}

fn log_path(dir: &Path, log_id: i64) -> PathBuf {
    dir.join(format!("{log_id}.jsonl"))
}

/// Byte span of `line` without surrounding ASCII whitespace (`\r` included).
fn trimmed_span(line: &[u8]) -> (usize, usize) {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    (start, end)
}

/// Number of non-blank lines, terminated or not.
fn count_leaves(content: &[u8]) -> u64 {
    content
        .split(|b| *b == b'\n')
        .filter(|line| {
            let (s, e) = trimmed_span(line);
            s < e
        })
        .count() as u64
}

/// Write a single line to file (with trailing newline).
fn append_line(path: &Path, line: &[u8], leading_newline: bool) -> Result<(), LogError> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = Vec::with_capacity(line.len() + 2);
    if leading_newline {
        buf.push(b'\n');
    }
    buf.extend_from_slice(line);
    buf.push(b'\n');
    f.write_all(&buf)?;
    Ok(())
}
