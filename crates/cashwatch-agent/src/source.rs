//! Record source abstraction.
//!
//! Implementations:
//! - `GradioAgent`: the browser agent behind a Gradio queue API.
//! - `StaticSource`: replays a fixed outcome (tests, dry runs).

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

use crate::payload::ParsedBatch;

/// What one fetch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome {
    Fetched(ParsedBatch),
    /// Agent unreachable, errored, or answered with something unparseable.
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// A failed fetch contributes nothing to the cycle.
    pub fn into_batch(self) -> ParsedBatch {
        match self {
            Self::Fetched(batch) => batch,
            Self::Failed { .. } => ParsedBatch::default(),
        }
    }
}

/// Trait for candidate sources.
pub trait RecordSource: Send + Sync {
    /// Produce one raw batch. Never errors: failures are a `Failed` outcome.
    fn fetch(&self) -> BoxFuture<'_, FetchOutcome>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

/// Source that returns the same outcome on every fetch.
pub struct StaticSource {
    outcome: FetchOutcome,
}

impl StaticSource {
    pub fn new(outcome: FetchOutcome) -> Self {
        Self { outcome }
    }
}

impl RecordSource for StaticSource {
    fn fetch(&self) -> BoxFuture<'_, FetchOutcome> {
        let outcome = self.outcome.clone();
        async move { outcome }.boxed()
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashwatch_reconcile::Candidate;

    #[test]
    fn test_failed_into_empty_batch() {
        let batch = FetchOutcome::failed("connection refused").into_batch();
        assert!(batch.candidates.is_empty());
        assert_eq!(batch.malformed, 0);
    }

    #[tokio::test]
    async fn test_static_source() {
        let batch = ParsedBatch {
            candidates: vec![Candidate::new(Some("$FOO"), None)],
            malformed: 0,
        };
        let source = StaticSource::new(FetchOutcome::Fetched(batch.clone()));
        assert_eq!(source.fetch().await, FetchOutcome::Fetched(batch));
        assert_eq!(source.name(), "static");
    }
}
