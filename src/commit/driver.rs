use crate::config::CommitConfig;
use crate::error::Result;
use crate::models::Document;
use crate::store::IndexStore;
use serde_json::Value;
use std::sync::Arc;

/// Running totals for a driver's lifetime.
#[derive(Debug, Clone, Default)]
pub struct CommitSummary {
    /// Documents handed to the driver
    pub submitted: u64,
    /// Documents the store accepted
    pub succeeded: u64,
    /// Keys of documents dropped after failing individually
    pub skipped_keys: Vec<String>,
}

/// Accumulates produced documents and submits them in bounded batches.
///
/// Submission failures are recovered at the smallest possible scope: a
/// failed batch is split and retried document by document; a document that
/// still fails alone is logged with its key and skipped. [`finish`] flushes
/// the remainder and forces an explicit commit.
///
/// [`finish`]: BatchCommitDriver::finish
pub struct BatchCommitDriver {
    store: Arc<dyn IndexStore>,
    batch_size: usize,
    commit_within_ms: u64,
    pending: Vec<Document>,
    summary: CommitSummary,
}

impl BatchCommitDriver {
    pub fn new(store: Arc<dyn IndexStore>, config: &CommitConfig) -> Self {
        Self {
            store,
            batch_size: config.batch_size.max(1),
            commit_within_ms: config.commit_within_ms,
            pending: Vec::new(),
            summary: CommitSummary::default(),
        }
    }

    fn doc_key(doc: &Document) -> String {
        doc.get("key")
            .and_then(Value::as_str)
            .unwrap_or("<unkeyed>")
            .to_string()
    }

    /// Queue one document, flushing when the batch fills.
    pub async fn submit(&mut self, doc: Document) -> Result<()> {
        self.summary.submitted += 1;
        self.pending.push(doc);
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Submit the pending batch now.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);

        match self.store.bulk_upsert(&batch, self.commit_within_ms).await {
            Ok(()) => {
                self.summary.succeeded += batch.len() as u64;
                tracing::debug!(count = batch.len(), "Batch committed");
                Ok(())
            }
            Err(e) if e.is_retriable_per_document() => {
                tracing::warn!(
                    count = batch.len(),
                    error = %e,
                    "Batch rejected; retrying documents individually"
                );
                self.retry_individually(batch).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Isolate the poisoned documents of a rejected batch.
    async fn retry_individually(&mut self, batch: Vec<Document>) {
        for doc in batch {
            let key = Self::doc_key(&doc);
            match self
                .store
                .bulk_upsert(std::slice::from_ref(&doc), self.commit_within_ms)
                .await
            {
                Ok(()) => self.summary.succeeded += 1,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Document rejected; skipping");
                    self.summary.skipped_keys.push(key);
                }
            }
        }
    }

    /// Flush the remainder and force durability of everything submitted.
    pub async fn finish(&mut self) -> Result<CommitSummary> {
        self.flush().await?;
        self.store.commit().await?;
        tracing::info!(
            submitted = self.summary.submitted,
            succeeded = self.summary.succeeded,
            skipped = self.summary.skipped_keys.len(),
            "Commit driver finished"
        );
        Ok(self.summary.clone())
    }

    pub fn summary(&self) -> &CommitSummary {
        &self.summary
    }
}
