//! File-backed vector index.
//!
//! [`FileVectorIndex`] keeps documents in memory for search and persists every
//! upsert to an append-only JSON Lines log under `<root>/<collection>/`:
//!
//! - `manifest.json` records the format version, collection name,
//!   dimensionality and metric, and is checked on every open.
//! - `documents.jsonl` holds one JSON-encoded [`Document`] per line. Replaying
//!   it in order restores the index; a later line with an existing id replaces
//!   the earlier document.
//!
//! [`FileVectorIndex::compact`] rewrites the log as a snapshot of the live
//! documents.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::document::{Document, ScoredDocument};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::inmemory::{Entries, check_query};

const MANIFEST_FILE: &str = "manifest.json";
const LOG_FILE: &str = "documents.jsonl";
const FORMAT_VERSION: u32 = 1;
const METRIC: &str = "cosine";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    collection: String,
    dimensions: usize,
    metric: String,
}

struct State {
    entries: Entries,
    log: File,
    /// Bytes of the log known to hold complete lines.
    log_len: u64,
}

/// A persistent vector index stored in a directory.
///
/// All writes happen under the index write lock: the log line is appended
/// and synced before the document becomes visible to queries, so a failed
/// write never leaves a half-published document behind.
///
/// # Example
///
/// ```rust,ignore
/// use replykit_rag::{FileVectorIndex, VectorIndex};
///
/// let index = FileVectorIndex::open("index", "tweet_amazon_collection", 1536).await?;
/// let nearest = index.query(&embedding, 1).await?;
/// ```
pub struct FileVectorIndex {
    dir: PathBuf,
    collection: String,
    dimensions: usize,
    state: RwLock<State>,
}

impl FileVectorIndex {
    /// Open the collection under `root`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `collection` is empty, `.`, `..`, or contains path
    ///   separators.
    /// - [`RagError::DimensionMismatch`] if the collection was created with a
    ///   different dimensionality.
    /// - [`RagError::StorageError`] on I/O failures, an incompatible manifest, or a
    ///   corrupt log line.
    pub async fn open(root: impl AsRef<Path>, collection: &str, dimensions: usize) -> Result<Self> {
        if collection.is_empty()
            || collection.contains(['/', '\\'])
            || matches!(collection, "." | "..")
        {
            return Err(RagError::ConfigError(format!("invalid collection name '{collection}'")));
        }
        if dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".to_string()));
        }

        let dir = root.as_ref().join(collection);
        fs::create_dir_all(&dir).await.map_err(|e| RagError::storage(&dir, e))?;

        load_or_create_manifest(&dir, collection, dimensions).await?;

        let log_path = dir.join(LOG_FILE);
        let (entries, log_len) = replay(&log_path, dimensions).await?;

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(|e| RagError::storage(&log_path, e))?;

        info!(
            collection,
            path = %dir.display(),
            dimensions,
            document_count = entries.len(),
            "opened vector index"
        );

        Ok(Self {
            dir,
            collection: collection.to_string(),
            dimensions,
            state: RwLock::new(State { entries, log, log_len }),
        })
    }

    /// The directory holding this collection's files.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Rewrite the log so it holds exactly one line per live document.
    ///
    /// Returns the number of documents written.
    pub async fn compact(&self) -> Result<usize> {
        let mut state = self.state.write().await;
        let log_path = self.dir.join(LOG_FILE);
        let tmp_path = self.dir.join(format!("{LOG_FILE}.tmp"));

        let mut buf = Vec::new();
        for document in state.entries.documents() {
            encode_line(&mut buf, document, &log_path)?;
        }
        write_synced(&tmp_path, &buf).await?;

        // The old handle stays in place until the rename has succeeded.
        let log = OpenOptions::new()
            .append(true)
            .open(&tmp_path)
            .await
            .map_err(|e| RagError::storage(&tmp_path, e))?;
        fs::rename(&tmp_path, &log_path).await.map_err(|e| RagError::storage(&log_path, e))?;
        state.log = log;
        state.log_len = buf.len() as u64;

        let count = state.entries.len();
        info!(collection = %self.collection, document_count = count, "compacted vector index");
        Ok(count)
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn upsert(&self, document: &Document) -> Result<()> {
        document.validate(self.dimensions)?;

        let log_path = self.dir.join(LOG_FILE);
        let mut line = Vec::new();
        encode_line(&mut line, document, &log_path)?;

        let mut state = self.state.write().await;
        if let Err(e) = append(&mut state.log, &line).await {
            // Drop whatever part of the line made it to disk.
            let restore = state.log_len;
            if let Err(trunc) = state.log.set_len(restore).await {
                warn!(path = %log_path.display(), error = %trunc, "failed to roll back partial write");
            }
            return Err(RagError::storage(&log_path, e));
        }
        state.log_len += line.len() as u64;

        let replaced = state.entries.upsert(document.clone());
        debug!(collection = %self.collection, document.id = %document.id, replaced, "upserted document");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        check_query(self.dimensions, embedding)?;
        Ok(self.state.read().await.entries.nearest(embedding, k))
    }

    async fn get(&self, id: &str) -> Option<Document> {
        self.state.read().await.entries.get(id).cloned()
    }
}

async fn load_or_create_manifest(dir: &Path, collection: &str, dimensions: usize) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    match fs::read(&path).await {
        Ok(bytes) => {
            let manifest: Manifest =
                serde_json::from_slice(&bytes).map_err(|e| RagError::storage(&path, e))?;
            if manifest.format_version != FORMAT_VERSION {
                return Err(RagError::storage(
                    &path,
                    format!("unsupported format version {}", manifest.format_version),
                ));
            }
            if manifest.metric != METRIC {
                return Err(RagError::storage(
                    &path,
                    format!("unsupported metric '{}'", manifest.metric),
                ));
            }
            if manifest.dimensions != dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: manifest.dimensions,
                    actual: dimensions,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            let manifest = Manifest {
                format_version: FORMAT_VERSION,
                collection: collection.to_string(),
                dimensions,
                metric: METRIC.to_string(),
            };
            let bytes =
                serde_json::to_vec_pretty(&manifest).map_err(|e| RagError::storage(&path, e))?;
            write_atomically(&dir.join(format!("{MANIFEST_FILE}.tmp")), &path, &bytes).await?;
            debug!(path = %path.display(), "created index manifest");
            Ok(())
        }
        Err(e) => Err(RagError::storage(&path, e)),
    }
}

/// Rebuild the entries from the log. Returns them with the length of the
/// log's valid prefix; a torn final line is cut off the file.
async fn replay(path: &Path, dimensions: usize) -> Result<(Entries, u64)> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok((Entries::default(), 0)),
        Err(e) => return Err(RagError::storage(path, e)),
    };

    let mut entries = Entries::default();
    let mut offset = 0usize;
    let mut line_no = 0usize;

    while offset < bytes.len() {
        line_no += 1;
        let (line, terminated) = match bytes[offset..].iter().position(|&b| b == b'\n') {
            Some(end) => (&bytes[offset..offset + end], true),
            None => (&bytes[offset..], false),
        };

        if !line.iter().all(u8::is_ascii_whitespace) {
            if !terminated {
                // Every append ends with a newline, so this one was interrupted.
                warn!(path = %path.display(), line = line_no, "discarding torn log line");
                truncate(path, offset as u64).await?;
                return Ok((entries, offset as u64));
            }
            let document: Document = serde_json::from_slice(line)
                .map_err(|e| RagError::storage(path, format!("line {line_no}: {e}")))?;
            document
                .validate(dimensions)
                .map_err(|e| RagError::storage(path, format!("line {line_no}: {e}")))?;
            entries.upsert(document);
        }

        offset += line.len() + usize::from(terminated);
    }

    Ok((entries, bytes.len() as u64))
}

async fn truncate(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| RagError::storage(path, e))?;
    file.set_len(len).await.map_err(|e| RagError::storage(path, e))?;
    file.sync_all().await.map_err(|e| RagError::storage(path, e))
}

fn encode_line(buf: &mut Vec<u8>, document: &Document, path: &Path) -> Result<()> {
    serde_json::to_writer(&mut *buf, document).map_err(|e| RagError::storage(path, e))?;
    buf.push(b'\n');
    Ok(())
}

async fn append(log: &mut File, line: &[u8]) -> std::io::Result<()> {
    log.write_all(line).await?;
    log.flush().await?;
    log.sync_data().await
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).await.map_err(|e| RagError::storage(path, e))?;
    file.write_all(bytes).await.map_err(|e| RagError::storage(path, e))?;
    file.sync_all().await.map_err(|e| RagError::storage(path, e))
}

async fn write_atomically(tmp: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
    write_synced(tmp, bytes).await?;
    fs::rename(tmp, dest).await.map_err(|e| RagError::storage(dest, e))
}
