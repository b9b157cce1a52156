// Batch orchestration: bounded concurrent verification with per-document isolation
use crate::pipeline::verifier::DocumentVerifier;
use crate::types::{CrossReference, Decision, Document, ErrorReport, VerificationStatus, VerificationVerdict};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One batch result: a verdict, or an error report for a document that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Completed(Box<VerificationVerdict>),
    Failed(ErrorReport),
}

impl BatchEntry {
    pub fn filename(&self) -> &str {
        match self {
            BatchEntry::Completed(verdict) => &verdict.filename,
            BatchEntry::Failed(report) => &report.filename,
        }
    }
}

/// `accepted + rejected + errored` always equals the number of submitted documents.
/// `needs_review` is informational and already counted under `accepted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub errored: usize,
    pub needs_review: usize,
}

impl BatchSummary {
    pub fn tally(entries: &[BatchEntry]) -> Self {
        let mut summary = Self { total: entries.len(), ..Self::default() };
        for entry in entries {
            match entry {
                BatchEntry::Completed(verdict) => {
                    match verdict.decision {
                        Decision::Accept => summary.accepted += 1,
                        Decision::Reject => summary.rejected += 1,
                    }
                    if verdict.status == VerificationStatus::NeedsReview {
                        summary.needs_review += 1;
                    }
                }
                BatchEntry::Failed(_) => summary.errored += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchEntry>,
    pub summary: BatchSummary,
}

/// One submitted batch item. `Unreadable` carries a failure found before verification started
/// (a missing or unreadable file) so it still occupies its slot in the results.
#[derive(Debug, Clone)]
pub enum BatchInput {
    Ready(Document),
    Unreadable(ErrorReport),
}

impl DocumentVerifier {
    /// Verifies every document with at most `[batch] workers` in flight.
    ///
    /// Results come back in input order. A failure in one document becomes an
    /// error entry and never affects the others. `shared` fills in the
    /// cross-reference for documents that do not carry their own.
    pub async fn verify_batch(&self, documents: Vec<Document>, shared: Option<CrossReference>) -> BatchReport {
        self.verify_inputs(documents.into_iter().map(BatchInput::Ready).collect(), shared)
            .await
    }

    pub async fn verify_inputs(&self, inputs: Vec<BatchInput>, shared: Option<CrossReference>) -> BatchReport {
        let workers = self.config().batch.workers.max(1);
        info!(documents = inputs.len(), workers, "starting batch");

        let results: Vec<BatchEntry> = stream::iter(inputs)
            .map(|input| {
                let shared = shared.clone();
                async move {
                    match input {
                        BatchInput::Ready(document) => self.batch_entry(document, shared).await,
                        BatchInput::Unreadable(report) => {
                            warn!(filename = %report.filename, error = %report.message, "document unreadable");
                            BatchEntry::Failed(report)
                        }
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await;

        let summary = BatchSummary::tally(&results);
        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            errored = summary.errored,
            needs_review = summary.needs_review,
            "batch complete"
        );
        BatchReport { results, summary }
    }

    async fn batch_entry(&self, mut document: Document, shared: Option<CrossReference>) -> BatchEntry {
        if document.cross_reference.is_none() {
            document.cross_reference = shared;
        }
        let filename = document.filename.clone();
        match self.verify(document).await {
            Ok(verdict) => BatchEntry::Completed(Box::new(verdict)),
            Err(e) => {
                warn!(filename = %filename, kind = e.kind(), error = %e, "document failed");
                BatchEntry::Failed(ErrorReport::from_error(filename, &e))
            }
        }
    }
}
