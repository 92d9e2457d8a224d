use crate::classify::{classify, Classification, WorkTarget};
use crate::commit::{BatchCommitDriver, CommitSummary};
use crate::config::CommitConfig;
use crate::error::Result;
use crate::models::{
    AuthorAggregate, AuthorRecord, CatalogRecord, EditionRecord, WorkAggregate, WorkRecord,
};
use crate::build::{enrich_author, inject_author_names, AuthorBuilder, WorkBuilder};
use crate::store::IndexStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Final run report: processed/succeeded/skipped counts and the explicit
/// keys of everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Records read from the input stream
    pub processed: u64,
    /// Work documents handed to the commit driver
    pub works_indexed: u64,
    /// Author documents handed to the commit driver
    pub authors_indexed: u64,
    /// Keys of records with an unrecognized prefix or undecodable body
    pub unclassified_keys: Vec<String>,
    /// Cumulative commit totals across both phases
    pub commit: CommitSummary,
}

/// Per-run working state: aggregates under construction and the full
/// edition list per work key, kept so the cover-selection pass sees every
/// candidate.
#[derive(Default)]
struct Session {
    work_order: Vec<String>,
    works: HashMap<String, WorkAggregate>,
    editions_by_work: HashMap<String, Vec<EditionRecord>>,
    authors: Vec<AuthorAggregate>,
}

/// The end-to-end indexing pipeline: classify, aggregate, enrich, commit.
pub struct IndexPipeline {
    store: Arc<dyn IndexStore>,
    commit_config: CommitConfig,
}

impl IndexPipeline {
    pub fn new(store: Arc<dyn IndexStore>, commit_config: CommitConfig) -> Self {
        Self {
            store,
            commit_config,
        }
    }

    /// Run the pipeline over a record stream. The store session is
    /// released on every exit path, success or failure.
    pub async fn run(&self, records: Vec<CatalogRecord>) -> Result<RunSummary> {
        let result = self.run_inner(records).await;
        if let Err(e) = self.store.disconnect().await {
            tracing::warn!(error = %e, "Failed to release store session");
        }
        result
    }

    async fn run_inner(&self, records: Vec<CatalogRecord>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut session = Session::default();

        for record in records {
            summary.processed += 1;
            if let Err(e) = self.ingest_record(&record, &mut session).await {
                // Classification and decode failures skip the record with
                // a signal; only store-connectivity failures abort.
                tracing::warn!(key = %record.key, error = %e, "Skipping record");
                summary.unclassified_keys.push(record.key.clone());
            }
        }

        let mut driver = BatchCommitDriver::new(self.store.clone(), &self.commit_config);

        // Stage A: author base documents, committed first so fresh work
        // documents can denormalize author names from the index.
        for author in &session.authors {
            driver.submit(author.to_document()?).await?;
            summary.authors_indexed += 1;
        }
        driver.finish().await?;

        // Stage B: fold editions into their works, run the cover pass over
        // the full edition set, inject author names, and commit.
        for key in &session.work_order {
            let Some(mut work) = session.works.remove(key) else {
                continue;
            };
            let editions = session.editions_by_work.remove(key).unwrap_or_default();
            for edition in &editions {
                WorkBuilder::fold_edition(&mut work, edition);
            }
            WorkBuilder::pick_cover_edition(&mut work, &editions);
            if let Err(e) = inject_author_names(&mut work, self.store.as_ref()).await {
                tracing::warn!(key = %work.key, error = %e, "Author name lookup failed");
            }
            driver.submit(work.to_document()?).await?;
            summary.works_indexed += 1;
        }
        driver.finish().await?;

        // Stage C: with the works durable and visible, enrich the authors
        // seen in this run from the index and re-upsert them.
        for author in &mut session.authors {
            if let Err(e) = enrich_author(author, self.store.as_ref()).await {
                tracing::warn!(key = %author.key, error = %e, "Author enrichment failed");
                continue;
            }
            driver.submit(author.to_document()?).await?;
        }
        summary.commit = driver.finish().await?;

        tracing::info!(
            processed = summary.processed,
            works = summary.works_indexed,
            authors = summary.authors_indexed,
            skipped = summary.commit.skipped_keys.len(),
            unclassified = summary.unclassified_keys.len(),
            "Pipeline run complete"
        );
        Ok(summary)
    }

    async fn ingest_record(&self, record: &CatalogRecord, session: &mut Session) -> Result<()> {
        match classify(record)? {
            Classification::Author => {
                let author: AuthorRecord = record.decode()?;
                session.authors.push(AuthorBuilder::from_record(&author));
            }
            Classification::Work => {
                let work: WorkRecord = record.decode()?;
                let aggregate = WorkBuilder::from_work(&work);
                if !session.works.contains_key(&work.key) {
                    session.work_order.push(work.key.clone());
                }
                // A work record always supersedes an aggregate shell
                // created earlier by an out-of-order edition; accumulated
                // editions live separately and fold in later.
                session.works.insert(work.key, aggregate);
            }
            Classification::Edition { targets } => {
                let edition: EditionRecord = record.decode()?;
                for target in targets {
                    let key = target.key().to_string();
                    if !session.works.contains_key(&key) {
                        let aggregate = self.fetch_or_create(&target, &edition).await?;
                        session.work_order.push(key.clone());
                        session.works.insert(key.clone(), aggregate);
                    }
                    session
                        .editions_by_work
                        .entry(key)
                        .or_default()
                        .push(edition.clone());
                }
            }
        }
        Ok(())
    }

    /// Resolve an edition's work target to an aggregate: the locally held
    /// one, else the pre-existing indexed document, else a fresh one.
    async fn fetch_or_create(
        &self,
        target: &WorkTarget,
        edition: &EditionRecord,
    ) -> Result<WorkAggregate> {
        match target {
            WorkTarget::Synthetic(_) => WorkBuilder::synthetic_from_edition(edition),
            WorkTarget::Existing(key) => match self.store.get_document(key).await {
                Ok(Some(doc)) => WorkAggregate::from_document(doc).or_else(|e| {
                    tracing::warn!(key = %key, error = %e, "Indexed work undecodable; rebuilding");
                    Ok(WorkAggregate::empty(key.clone()))
                }),
                Ok(None) => Ok(WorkAggregate::empty(key.clone())),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Work fetch failed; building fresh");
                    Ok(WorkAggregate::empty(key.clone()))
                }
            },
        }
    }
}
