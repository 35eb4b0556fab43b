//! Request-level analysis errors.

use thiserror::Error;

/// Failures that abort an analysis request before any result is delivered.
///
/// Collaborator degradation (storage gaps, oracle failures, cancellation) is
/// deliberately absent here: those paths recover locally and the consumer
/// still receives a usable `initial` result.
#[derive(Debug, Clone, Error)]
pub enum AnalyzeError {
    /// The request body carried no analyzable text.
    #[error("article content is empty")]
    EmptyContent,
}
