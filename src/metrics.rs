use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing request activity.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    documents_analyzed: AtomicU64,
    failed_requests: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document and the number of chunks sent to the backend for it.
    pub fn record_summary(&self, chunk_count: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a document that went through structured analysis.
    pub fn record_analysis(&self) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that terminated in a failure state.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of request counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents summarized since startup.
    pub documents_summarized: u64,
    /// Total chunk count summarized across all documents.
    pub chunks_summarized: u64,
    /// Number of documents analyzed since startup.
    pub documents_analyzed: u64,
    /// Requests that ended in an error envelope.
    pub failed_requests: u64,
}
