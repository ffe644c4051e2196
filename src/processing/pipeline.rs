//! Chunked summarization: validate, split, summarize each chunk in order, join.

use crate::config::Config;
use crate::summarization::{SummarizationClient, SummaryConstraints};

use super::chunking::{Chunk, Chunker};
use super::retry::RetryPolicy;
use super::types::{ChunkingError, ProcessingError, SummaryOutcome};

/// Splits text into bounded chunks and summarizes them one after another.
///
/// The pipeline is all-or-nothing: a chunk that still fails after the retry policy is exhausted
/// fails the whole run, and no partial summaries are returned.
#[derive(Debug, Clone)]
pub struct SummarizationPipeline {
    chunker: Chunker,
    min_content_chars: usize,
    constraints: SummaryConstraints,
    retry: RetryPolicy,
}

impl SummarizationPipeline {
    /// Create a pipeline with a one-character content minimum and no retries.
    pub fn new(chunker: Chunker, constraints: SummaryConstraints) -> Self {
        Self {
            chunker,
            min_content_chars: 1,
            constraints,
            retry: RetryPolicy::default(),
        }
    }

    /// Build the pipeline described by configuration.
    pub fn from_config(config: &Config) -> Result<Self, ChunkingError> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_unit)?;
        Ok(Self::new(chunker, SummaryConstraints::from_config(config))
            .with_min_content_chars(config.min_content_chars)
            .with_retry_policy(RetryPolicy::from_config(config)))
    }

    /// Reject documents whose trimmed text has fewer than `minimum` characters (at least 1).
    pub fn with_min_content_chars(mut self, minimum: usize) -> Self {
        self.min_content_chars = minimum.max(1);
        self
    }

    /// Replace the retry policy applied to each backend call.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry policy applied to each backend call.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Chunker used to split documents.
    pub fn chunker(&self) -> Chunker {
        self.chunker
    }

    /// Fail with [`ProcessingError::EmptyDocument`] when `text` is below the content minimum.
    pub fn ensure_content(&self, text: &str) -> Result<(), ProcessingError> {
        let found = text.trim().chars().count();
        if found < self.min_content_chars {
            return Err(ProcessingError::EmptyDocument {
                found,
                minimum: self.min_content_chars,
            });
        }
        Ok(())
    }

    /// Validate `text` and split it into ordered chunks.
    pub fn split<'a>(&self, text: &'a str) -> Result<Vec<Chunk<'a>>, ProcessingError> {
        self.ensure_content(text)?;
        let chunks: Vec<Chunk<'a>> = self.chunker.chunks(text).collect();
        tracing::debug!(
            chunks = chunks.len(),
            unit = ?self.chunker.unit(),
            max_unit_size = self.chunker.max_unit_size(),
            "Split document"
        );
        Ok(chunks)
    }

    /// Summarize every chunk in order, returning one partial summary per chunk.
    pub async fn summarize_chunks(
        &self,
        client: &dyn SummarizationClient,
        chunks: &[Chunk<'_>],
    ) -> Result<Vec<String>, ProcessingError> {
        let total = chunks.len();
        let mut partials = Vec::with_capacity(total);
        for chunk in chunks {
            let partial = self
                .retry
                .call(|| client.summarize(chunk.text, self.constraints))
                .await
                .map_err(|error| {
                    tracing::warn!(
                        chunk = chunk.ordinal + 1,
                        total,
                        error = %error,
                        "Chunk summarization failed"
                    );
                    ProcessingError::SummarizationBackend(error)
                })?;
            tracing::debug!(chunk = chunk.ordinal + 1, total, "Chunk summarized");
            partials.push(partial);
        }
        debug_assert_eq!(partials.len(), total);
        Ok(partials)
    }

    /// Join partial summaries with newlines, preserving order.
    pub fn join(partials: &[String]) -> String {
        partials
            .iter()
            .map(|partial| partial.trim())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run the whole pipeline over `text`.
    pub async fn run(
        &self,
        client: &dyn SummarizationClient,
        text: &str,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let chunks = self.split(text)?;
        let partials = self.summarize_chunks(client, &chunks).await?;
        Ok(outcome(text, chunks.len(), &partials))
    }
}

/// Assemble the final summary and its counters.
pub(crate) fn outcome(text: &str, chunk_count: usize, partials: &[String]) -> SummaryOutcome {
    let summary = SummarizationPipeline::join(partials);
    SummaryOutcome {
        chunk_count,
        original_length: text.chars().count(),
        summary_length: summary.chars().count(),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkUnit;
    use crate::summarization::SummarizationClientError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Summarizer that records its inputs and can fail on one chunk.
    struct ScriptedSummarizer {
        calls: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
    }

    impl ScriptedSummarizer {
        fn new(fail_on_call: Option<usize>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_call,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl SummarizationClient for ScriptedSummarizer {
        async fn summarize(
            &self,
            text: &str,
            constraints: SummaryConstraints,
        ) -> Result<String, SummarizationClientError> {
            assert_eq!(constraints, CONSTRAINTS);
            let call = {
                let mut calls = self.calls.lock().expect("calls lock");
                calls.push(text.to_string());
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(SummarizationClientError::GenerationFailed(format!(
                    "chunk {call} rejected"
                )));
            }
            Ok(format!("summary {call} ({} chars)", text.chars().count()))
        }
    }

    const CONSTRAINTS: SummaryConstraints = SummaryConstraints {
        max_length: 150,
        min_length: 50,
    };

    fn pipeline(size: usize, unit: ChunkUnit) -> SummarizationPipeline {
        SummarizationPipeline::new(Chunker::new(size, unit).expect("chunker"), CONSTRAINTS)
    }

    #[tokio::test]
    async fn summarizes_each_chunk_in_order_and_joins_with_newlines() {
        let text = "a".repeat(1000) + &"b".repeat(1000) + &"c".repeat(500);
        let client = ScriptedSummarizer::new(None);

        let outcome = pipeline(1000, ChunkUnit::Characters)
            .run(&client, &text)
            .await
            .expect("summary");

        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].chars().all(|c| c == 'a'));
        assert!(calls[1].chars().all(|c| c == 'b'));
        assert_eq!(calls[2], "c".repeat(500));
        assert_eq!(
            outcome.summary,
            "summary 1 (1000 chars)\nsummary 2 (1000 chars)\nsummary 3 (500 chars)"
        );
        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(outcome.original_length, 2500);
        assert_eq!(outcome.summary_length, outcome.summary.chars().count());
    }

    #[tokio::test]
    async fn failing_chunk_fails_the_whole_run() {
        let text = "word ".repeat(30);
        let client = ScriptedSummarizer::new(Some(2));

        let error = pipeline(10, ChunkUnit::Words)
            .run(&client, &text)
            .await
            .expect_err("chunk 2 fails");

        assert!(matches!(
            error,
            ProcessingError::SummarizationBackend(SummarizationClientError::GenerationFailed(ref message))
                if message == "chunk 2 rejected"
        ));
        assert_eq!(client.calls().len(), 2, "no calls after the failing chunk");
    }

    #[tokio::test]
    async fn whitespace_only_text_never_reaches_backend() {
        let client = ScriptedSummarizer::new(None);
        let error = pipeline(100, ChunkUnit::Characters)
            .run(&client, " \n\t  ")
            .await
            .expect_err("empty");

        assert!(matches!(
            error,
            ProcessingError::EmptyDocument {
                found: 0,
                minimum: 1
            }
        ));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn content_minimum_is_configurable() {
        let client = ScriptedSummarizer::new(None);
        let strict = pipeline(100, ChunkUnit::Characters).with_min_content_chars(20);

        let error = strict
            .run(&client, "   too short   ")
            .await
            .expect_err("below minimum");
        assert!(matches!(
            error,
            ProcessingError::EmptyDocument {
                found: 9,
                minimum: 20
            }
        ));

        let outcome = strict
            .run(&client, "This document has enough text to pass.")
            .await
            .expect("long enough");
        assert_eq!(outcome.chunk_count, 1);
    }

    #[tokio::test]
    async fn zero_minimum_still_rejects_blank_text() {
        let lenient = pipeline(100, ChunkUnit::Words).with_min_content_chars(0);
        assert!(lenient.ensure_content("   ").is_err());
        assert!(lenient.ensure_content("x").is_ok());
    }

    #[tokio::test]
    async fn retry_policy_recovers_transient_chunk_failures() {
        struct FlakySummarizer {
            attempts: Mutex<usize>,
        }

        #[async_trait]
        impl SummarizationClient for FlakySummarizer {
            async fn summarize(
                &self,
                _text: &str,
                _constraints: SummaryConstraints,
            ) -> Result<String, SummarizationClientError> {
                let attempt = {
                    let mut attempts = self.attempts.lock().expect("lock");
                    *attempts += 1;
                    *attempts
                };
                if attempt == 1 {
                    Err(SummarizationClientError::ProviderUnavailable("warming up".into()))
                } else {
                    Ok("recovered".into())
                }
            }
        }

        let client = FlakySummarizer {
            attempts: Mutex::new(0),
        };
        let outcome = pipeline(100, ChunkUnit::Characters)
            .with_retry_policy(RetryPolicy {
                max_retries: 1,
                max_delay: Duration::from_millis(5),
                call_timeout: Duration::from_secs(5),
            })
            .run(&client, "short text")
            .await
            .expect("retried");

        assert_eq!(outcome.summary, "recovered");
        assert_eq!(*client.attempts.lock().expect("lock"), 2);
    }

    #[test]
    fn join_trims_partials() {
        let joined = SummarizationPipeline::join(&[" first ".into(), "second\n".into()]);
        assert_eq!(joined, "first\nsecond");
    }
}
