//! arXiv metadata snapshot ingestion.
//!
//! The snapshot is JSON Lines, one paper per line. Records are embedded and
//! upserted in batches; a batch that has been upserted stays in the index
//! even if a later batch fails or the run is interrupted.

use std::time::Instant;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument, warn};

use paperscope_core::defaults::{AUTHORS_MAX_CHARS, INGEST_BATCH_SIZE};
use paperscope_core::{EmbeddingBackend, Error, PaperIndex, PaperRecord, Result, Vector};

/// One line of the metadata snapshot. Unused fields are ignored.
#[derive(Debug, Deserialize)]
pub struct ArxivMetadata {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub update_date: Option<String>,
}

/// Year from a `YYYY-MM-DD` date; 0 when missing or malformed.
pub fn parse_year(update_date: Option<&str>) -> i32 {
    update_date
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<i32>().ok())
        .unwrap_or(0)
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

impl From<ArxivMetadata> for PaperRecord {
    fn from(m: ArxivMetadata) -> Self {
        PaperRecord {
            year: parse_year(m.update_date.as_deref()),
            authors: truncate_chars(&m.authors, AUTHORS_MAX_CHARS),
            id: m.id,
            title: m.title,
            abstract_text: m.abstract_text,
            categories: m.categories,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Lines skipped from the start of the file (resume point).
    pub skip: usize,
    pub batch_size: usize,
    /// Stop after this many papers have been stored.
    pub limit: Option<usize>,
    /// Drop papers last updated before this year.
    pub min_year: Option<i32>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            batch_size: INGEST_BATCH_SIZE,
            limit: None,
            min_year: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines_read: usize,
    pub blank: usize,
    pub malformed: usize,
    pub filtered: usize,
    pub upserted: usize,
    pub batches: usize,
}

async fn flush(
    batch: &mut Vec<PaperRecord>,
    embedder: &dyn EmbeddingBackend,
    index: &dyn PaperIndex,
    stats: &mut IngestStats,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let texts: Vec<String> = batch.iter().map(PaperRecord::document_text).collect();
    let vectors = embedder.embed_texts(&texts).await?;
    if vectors.len() != batch.len() {
        return Err(Error::Embedding(format!(
            "expected {} vectors, got {}",
            batch.len(),
            vectors.len()
        )));
    }
    let rows: Vec<(PaperRecord, Vector)> = batch.drain(..).zip(vectors).collect();
    index.upsert(&rows).await?;

    stats.upserted += rows.len();
    stats.batches += 1;
    info!(
        batch = stats.batches,
        batch_len = rows.len(),
        total = stats.upserted,
        "Batch upserted"
    );
    Ok(())
}

/// Read the snapshot from `reader` and store every accepted paper.
#[instrument(skip_all, fields(subsystem = "ingest", component = "arxiv", op = "ingest"))]
pub async fn ingest<R>(
    reader: R,
    embedder: &dyn EmbeddingBackend,
    index: &dyn PaperIndex,
    options: &IngestOptions,
) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let start = Instant::now();
    let batch_size = options.batch_size.max(1);
    let mut stats = IngestStats::default();
    let mut batch: Vec<PaperRecord> = Vec::with_capacity(batch_size);
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    loop {
        if options
            .limit
            .is_some_and(|limit| stats.upserted + batch.len() >= limit)
        {
            break;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        line_no += 1;
        if line_no <= options.skip {
            continue;
        }
        stats.lines_read += 1;

        if line.trim().is_empty() {
            stats.blank += 1;
            continue;
        }
        let record: PaperRecord = match serde_json::from_str::<ArxivMetadata>(&line) {
            Ok(meta) => meta.into(),
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed record");
                stats.malformed += 1;
                continue;
            }
        };
        if options.min_year.is_some_and(|min| record.year < min) {
            stats.filtered += 1;
            continue;
        }

        batch.push(record);
        if batch.len() >= batch_size {
            flush(&mut batch, embedder, index, &mut stats).await?;
        }
    }
    flush(&mut batch, embedder, index, &mut stats).await?;

    debug!(?stats, "Ingest counters");
    info!(
        upserted = stats.upserted,
        malformed = stats.malformed,
        filtered = stats.filtered,
        duration_ms = start.elapsed().as_millis() as u64,
        "Ingest complete"
    );
    Ok(stats)
}
