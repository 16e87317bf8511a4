//! Async front end for report generation. Runs the pipeline on a blocking
//! thread, consults the cache first, and honors cooperative cancellation.
//!
//! A cancelled run never publishes anything: the cache is only written after
//! the pipeline returns a complete report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{Fingerprint, ReportCache};
use crate::models::ClinicalNote;
use crate::pipeline::{self, NarrativeError, NarrativeReport};

/// Cooperative cancellation flag shared between the caller and a running
/// pipeline. Cloning hands out another view of the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The pipeline notices at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Report generator bound to a cache.
pub struct NarrativeWorker {
    cache: Arc<dyn ReportCache + Send + Sync>,
}

impl NarrativeWorker {
    pub fn new(cache: Arc<dyn ReportCache + Send + Sync>) -> Self {
        NarrativeWorker { cache }
    }

    /// Generate (or fetch) the report for a note set. The pipeline runs on a
    /// blocking thread so the async runtime stays responsive.
    pub async fn generate(
        &self,
        notes: Vec<ClinicalNote>,
        cancel: CancelHandle,
    ) -> Result<NarrativeReport, NarrativeError> {
        let fingerprint = Fingerprint::of_notes(&notes);
        if let Some(report) = self.cache.get(&fingerprint) {
            info!(count = fingerprint.count, "serving cached report");
            return Ok(report);
        }

        let cache = Arc::clone(&self.cache);
        let handle = tokio::task::spawn_blocking(move || {
            let report = pipeline::build_report_with_cancel(&notes, &cancel)?;
            cache.put(report.clone());
            Ok(report)
        });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                // A panic inside the pipeline is a bug; surface it rather
                // than masking it as a cancellation.
                warn!(error = %join_error, "report task failed");
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                Err(NarrativeError::Cancelled)
            }
        }
    }
}
