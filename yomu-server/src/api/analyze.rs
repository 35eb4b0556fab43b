//! Two-phase analysis delivery over one SSE connection.
//!
//! Phase 1 queues the `initial` event (default selections) as soon as
//! segmentation and hydration finish. Phase 2 runs only when the document
//! has at least one ambiguous token: a spawned task races the bulk oracle
//! call against consumer disconnect and, if the consumer is still there,
//! pushes the complete `ai_update` reconstruction.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;
use yomu_core::oracle::CandidateBatch;
use yomu_core::types::AnalysisPayload;
use yomu_core::{resolve_selections, segment, AnalyzeError, HydratedDocument, SenseOracle};

use super::{AppState, ErrorResponse};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    content: String,
}

/// POST /api/analyze — segment and hydrate synchronously, stream `initial`,
/// then refine in the background while the connection stays open.
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)>
{
    if req.content.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: AnalyzeError::EmptyContent.to_string(),
            }),
        ));
    }

    let tokens = segment(&req.content, &state.lexicon);
    let doc = HydratedDocument::hydrate(tokens, state.store.as_ref()).await;
    let batches = doc.candidate_batches();

    let (tx, rx) = mpsc::channel::<Event>(4);

    // Queued before the refinement task exists, so `initial` always
    // precedes `ai_update` on the wire.
    let initial = doc.assemble(&HashMap::new());
    let _ = tx.send(sse_event("initial", &initial)).await;

    if batches.is_empty() {
        // Nothing ambiguous: the stream ends right after `initial`.
        drop(tx);
    } else {
        let oracle: Arc<dyn SenseOracle> = state.oracle.clone();
        tokio::spawn(refine(doc, batches, oracle, tx));
    }

    Ok(Sse::new(ReceiverStream::new(rx).map(Ok::<Event, Infallible>)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// Phase 2: one bulk oracle call, then the refined reconstruction.
///
/// Consumer liveness is checked before the call (a disconnected consumer
/// costs no oracle round-trip), the call itself is raced against the channel
/// closing, and the refined event is dropped silently when the consumer has
/// vanished meanwhile.
async fn refine(
    doc: HydratedDocument,
    batches: Vec<CandidateBatch>,
    oracle: Arc<dyn SenseOracle>,
    tx: mpsc::Sender<Event>,
) {
    if tx.is_closed() {
        debug!("consumer disconnected before disambiguation; skipping oracle call");
        return;
    }

    let selections = resolve_selections(oracle.as_ref(), &batches, tx.closed()).await;

    if tx.is_closed() {
        debug!("consumer disconnected during disambiguation; dropping refined result");
        return;
    }

    let refined = doc.assemble(&selections);
    if tx.send(sse_event("ai_update", &refined)).await.is_err() {
        debug!("consumer disconnected before refined delivery");
    }
}

fn sse_event(name: &str, payload: &AnalysisPayload) -> Event {
    let json = serde_json::to_string(payload).unwrap_or_default();
    Event::default().event(name).data(json)
}
