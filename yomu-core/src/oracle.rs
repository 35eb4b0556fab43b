//! Disambiguation oracle contract and best-effort orchestration.

use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// One ambiguous token as presented to the oracle: its key, surface form,
/// local context window, and rendered options in canonical order.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateBatch {
    pub token_key: String,
    pub surface: String,
    pub context: String,
    pub options: Vec<String>,
}

/// External decision service picking the contextually correct sense among
/// a token's candidates.
#[async_trait]
pub trait SenseOracle: Send + Sync {
    /// Decide one option index per token key, for the whole batch at once.
    ///
    /// Implementations must be cancel-safe: dropping the returned future
    /// abandons the underlying call.
    async fn disambiguate(&self, batches: &[CandidateBatch]) -> Result<HashMap<String, usize>>;
}

/// Run one bulk disambiguation, downgrading every failure to "keep defaults".
///
/// Tokens with a single candidate are expected to have been filtered out
/// already; an empty batch returns immediately without touching the oracle.
/// `cancelled` is raced against the call: when it wins, the in-flight call is
/// dropped and whatever was decided so far (nothing) is returned. Transport
/// failures, timeouts, and undecodable replies all yield an empty mapping and
/// a log line; disambiguation never fails a request. Index range checking
/// happens at selection time, not here.
pub async fn resolve_selections(
    oracle: &dyn SenseOracle,
    batches: &[CandidateBatch],
    cancelled: impl Future<Output = ()>,
) -> HashMap<String, usize> {
    if batches.is_empty() {
        return HashMap::new();
    }

    tokio::select! {
        // Biased so that an already-cancelled request never starts the call.
        biased;
        _ = cancelled => {
            debug!("disambiguation cancelled; keeping default selections");
            HashMap::new()
        }
        result = oracle.disambiguate(batches) => match result {
            Ok(choices) => choices,
            Err(err) => {
                warn!(error = %err, "disambiguation failed; keeping default selections");
                HashMap::new()
            }
        }
    }
}
