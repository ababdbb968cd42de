//! Orchestration of a classification run.
//!
//! For every source item the engine retrieves candidates from the target
//! store, then classifies each (source, candidates) job on a bounded pool of
//! tokio tasks. Every task works with its own [`Classifier::copy_of`].
//!
//! A failing task aborts the run: a partial verdict set would look exactly
//! like a complete one.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod verdict;


pub use aggregate::aggregate_any;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use verdict::{ClassificationVerdict, VerdictSet};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::classifier::{Classification, Classifier, ClassifierResult};
use crate::config::ConfigError;
use crate::knowledge::Item;
use crate::store::CandidateStore;

/// Cloneable request to stop an engine run.
///
/// Once requested, no further jobs are started; jobs already running finish
/// and the run returns [`EngineError::ShutdownRequested`].
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        // Release pairs with the Acquire in `is_requested`
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

type JobOutput = (String, ClassifierResult<Vec<Classification>>);

/// Runs one classifier recipe over a source list and a target store.
#[derive(Debug)]
pub struct ClassificationEngine {
    classifier: Box<dyn Classifier>,
    config: EngineConfig,
    shutdown: ShutdownHandle,
}

impl ClassificationEngine {
    pub fn new(classifier: Box<dyn Classifier>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            classifier,
            config,
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Handle that stops this engine's runs.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Worker pool size used by [`run`](Self::run).
    pub fn pool_size(&self) -> usize {
        self.config
            .workers
            .unwrap_or_else(|| self.classifier.threads())
            .max(1)
    }

    /// Classifies the compare-flagged items of a bulk-read store against a
    /// retrieval store.
    pub async fn run_stores(
        &self,
        source_store: &CandidateStore,
        target_store: &CandidateStore,
    ) -> EngineResult<VerdictSet> {
        let sources = source_store.get_all(true)?;
        self.run(&sources, target_store).await
    }

    /// Classifies each `(item, embedding)` source against its top-k
    /// candidates in `targets`.
    #[instrument(skip(self, sources, targets), fields(kind = self.classifier.kind(), sources = sources.len()))]
    pub async fn run(
        &self,
        sources: &[(Arc<Item>, Vec<f32>)],
        targets: &CandidateStore,
    ) -> EngineResult<VerdictSet> {
        let mut jobs = Vec::with_capacity(sources.len());
        for (source, vector) in sources {
            let candidates: Vec<Arc<Item>> = targets
                .find_similar(vector)?
                .into_iter()
                .map(|scored| scored.item)
                .collect();
            debug!(source = %source.id(), candidates = candidates.len(), "Candidates retrieved");
            if !candidates.is_empty() {
                jobs.push((Arc::clone(source), candidates));
            }
        }

        let workers = self.pool_size();
        info!(jobs = jobs.len(), workers, "Starting classification");

        let timeout = self.config.timeout;
        let verdicts = tokio::time::timeout(timeout, self.execute(jobs, workers))
            .await
            .map_err(|_| EngineError::Timeout { after: timeout })??;

        info!(verdicts = verdicts.len(), "Classification finished");
        Ok(verdicts)
    }

    async fn execute(
        &self,
        jobs: Vec<(Arc<Item>, Vec<Arc<Item>>)>,
        workers: usize,
    ) -> EngineResult<VerdictSet> {
        let semaphore = Arc::new(Semaphore::new(workers));
        // dropping the set on an early return aborts the remaining tasks
        let mut tasks: JoinSet<JobOutput> = JoinSet::new();
        let mut verdicts = VerdictSet::new();
        let mut interrupted = false;

        for (source, candidates) in jobs {
            while let Some(joined) = tasks.try_join_next() {
                collect(joined, &mut verdicts)?;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| EngineError::TaskFailed {
                    reason: e.to_string(),
                })?;

            if self.shutdown.is_requested() {
                interrupted = true;
                break;
            }

            let classifier = self.classifier.copy_of();
            tasks.spawn(async move {
                let _permit = permit;
                let result = classifier.classify(&source, &candidates).await;
                (source.id().to_string(), result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            collect(joined, &mut verdicts)?;
        }

        if interrupted {
            warn!(verdicts = verdicts.len(), "Run stopped by shutdown request");
            return Err(EngineError::ShutdownRequested);
        }
        Ok(verdicts)
    }
}

fn collect(joined: Result<JobOutput, JoinError>, verdicts: &mut VerdictSet) -> EngineResult<()> {
    let (source_id, result) = joined.map_err(|e| EngineError::TaskFailed {
        reason: e.to_string(),
    })?;

    let classifications = match result {
        Ok(classifications) => classifications,
        Err(error) => {
            warn!(source = %source_id, error = %error, "Classification failed, aborting run");
            return Err(EngineError::Classification { source_id, error });
        }
    };

    debug!(source = %source_id, linked = classifications.len(), "Source classified");
    verdicts.extend(classifications.into_iter().map(|classification| {
        ClassificationVerdict::new(
            source_id.clone(),
            classification.target.id(),
            classification.confidence,
        )
    }));
    Ok(())
}
