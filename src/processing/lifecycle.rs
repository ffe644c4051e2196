//! Per-request state tracking.
//!
//! A request moves forward through `Received → Extracting → Validating → Chunking → Summarizing →
//! Formatting → Done`. Stages may be skipped (validation only runs when enabled, analysis has no
//! chunking, extraction-only requests go straight to formatting) but never revisited. Any non-terminal stage may fail.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stage of a single document request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStage {
    /// Multipart body is being received and stored.
    Received,
    /// Text is being extracted from the stored file.
    Extracting,
    /// The extracted text is being checked for being a legal document.
    Validating,
    /// Extracted text is being split into chunks.
    Chunking,
    /// The backend is being called.
    Summarizing,
    /// The response envelope is being built.
    Formatting,
    /// The request completed successfully.
    Done,
    /// The request failed with the given reason.
    Failed(String),
}

impl RequestStage {
    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Received => 0,
            Self::Extracting => 1,
            Self::Validating => 2,
            Self::Chunking => 3,
            Self::Summarizing => 4,
            Self::Formatting => 5,
            Self::Done => 6,
            Self::Failed(_) => 7,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Chunking => "chunking",
            Self::Summarizing => "summarizing",
            Self::Formatting => "formatting",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Attempted move between two stages that the state machine forbids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move request from {from} to {to}")]
pub struct InvalidTransition {
    /// Stage the request was in.
    pub from: RequestStage,
    /// Stage that was requested.
    pub to: RequestStage,
}

/// Tracks and logs the stage of one request.
#[derive(Debug)]
pub struct RequestLifecycle {
    request_id: Uuid,
    route: &'static str,
    stage: RequestStage,
}

impl RequestLifecycle {
    /// Start tracking a request in the `Received` stage.
    pub fn new(route: &'static str) -> Self {
        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, route, "Request received");
        Self {
            request_id,
            route,
            stage: RequestStage::Received,
        }
    }

    /// Identifier used to correlate log lines of this request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Current stage.
    pub fn stage(&self) -> &RequestStage {
        &self.stage
    }

    /// Move forward to `next`. Use [`RequestLifecycle::fail`] for failures.
    pub fn advance(&mut self, next: RequestStage) -> Result<(), InvalidTransition> {
        let allowed = !self.stage.is_terminal()
            && !matches!(next, RequestStage::Failed(_))
            && next.rank() > self.stage.rank();
        if !allowed {
            return Err(InvalidTransition {
                from: self.stage.clone(),
                to: next,
            });
        }
        tracing::debug!(
            request_id = %self.request_id,
            route = self.route,
            from = %self.stage,
            to = %next,
            "Request stage changed"
        );
        self.stage = next;
        Ok(())
    }

    /// Mark the request as completed.
    pub fn finish(&mut self) -> Result<(), InvalidTransition> {
        self.advance(RequestStage::Done)
    }

    /// Mark the request as failed in its current stage. Ignored once terminal.
    pub fn fail(&mut self, reason: impl fmt::Display) {
        if self.stage.is_terminal() {
            return;
        }
        let reason = reason.to_string();
        tracing::warn!(
            request_id = %self.request_id,
            route = self.route,
            stage = %self.stage,
            reason = %reason,
            "Request failed"
        );
        self.stage = RequestStage::Failed(reason);
    }
}
