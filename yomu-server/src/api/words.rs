//! Dictionary maintenance endpoints.
//!
//! Entry create/rename/delete keep the lexicon cache consistent through its
//! `upsert`/`remove` interface, so a full reload is only needed to recover
//! the maximum key length after heavy deletions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use yomu_core::types::{SenseExample, VocabEntry, VocabSense};

use super::{AppState, ErrorResponse};
use crate::deepseek::GeneratedEntry;

// ─── Request/response types ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExampleRequest {
    #[serde(default)]
    pub kanji: String,
    #[serde(default)]
    pub def: String,
    #[serde(default)]
    pub audio: String,
    #[serde(default)]
    pub furigana: Value,
}

#[derive(Debug, Deserialize)]
pub struct SenseRequest {
    /// Existing sense id to keep on update; empty means a fresh id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub reading: String,
    #[serde(default)]
    pub def: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub pitch: String,
    #[serde(default)]
    pub audio: String,
    #[serde(default)]
    pub furigana: Value,
    #[serde(default)]
    pub examples: Vec<ExampleRequest>,
}

#[derive(Debug, Deserialize)]
pub struct WordRequest {
    pub kanji: String,
    #[serde(default)]
    pub senses: Vec<SenseRequest>,
}

#[derive(Serialize)]
pub struct CreateWordResponse {
    pub id: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub keys: usize,
    pub max_key_len: usize,
}

#[derive(Debug, Deserialize)]
pub struct GenerateWordRequest {
    pub kanji: String,
}

// ─── Handlers ─────────────────────────────────────────────────

/// POST /api/words — create an entry, then register it in the cache.
pub async fn create_word(
    State(state): State<AppState>,
    Json(req): Json<WordRequest>,
) -> Result<Json<CreateWordResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.kanji.trim().is_empty() {
        return Err(bad_request("kanji is required"));
    }

    let entry = build_entry(new_id("w_"), req);
    state
        .store
        .insert_entry(&entry)
        .await
        .map_err(|e| internal("failed to save entry", e))?;

    state.lexicon.upsert(&entry.kanji, &entry.id);
    info!(id = %entry.id, surface = %entry.kanji, "entry created");
    Ok(Json(CreateWordResponse { id: entry.id }))
}

/// PUT /api/words/:id — update an entry; a rename moves its cache key.
pub async fn update_word(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.kanji.trim().is_empty() {
        return Err(bad_request("kanji is required"));
    }

    let entry = build_entry(id, req);
    match state.store.update_entry(&entry).await {
        Ok(Some(previous_surface)) => {
            if previous_surface != entry.kanji {
                state.lexicon.remove(&previous_surface, &entry.id);
            }
            state.lexicon.upsert(&entry.kanji, &entry.id);
            info!(id = %entry.id, surface = %entry.kanji, "entry updated");
            Ok(Json(MessageResponse {
                message: "updated".to_string(),
            }))
        }
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal("failed to update entry", e)),
    }
}

/// DELETE /api/words/:id — delete an entry and drop its cache reference.
pub async fn delete_word(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.delete_entry(&id).await {
        Ok(Some(surface)) => {
            state.lexicon.remove(&surface, &id);
            info!(id = %id, surface = %surface, "entry deleted");
            Ok(Json(MessageResponse {
                message: "deleted".to_string(),
            }))
        }
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal("failed to delete entry", e)),
    }
}

/// POST /api/lexicon/reload — rebuild the cache from a full storage snapshot.
pub async fn reload_lexicon(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, (StatusCode, Json<ErrorResponse>)> {
    let snapshot = state
        .store
        .lexicon_snapshot()
        .await
        .map_err(|e| internal("failed to load lexicon snapshot", e))?;
    state.lexicon.reload(snapshot);
    info!(keys = state.lexicon.len(), "lexicon cache reloaded");
    Ok(Json(ReloadResponse {
        keys: state.lexicon.len(),
        max_key_len: state.lexicon.max_key_len(),
    }))
}

/// POST /api/words/generate — AI-draft an entry for the editor. Nothing is
/// persisted; the client reviews the draft and saves it via POST /api/words.
pub async fn generate_word(
    State(state): State<AppState>,
    Json(req): Json<GenerateWordRequest>,
) -> Result<Json<GeneratedEntry>, (StatusCode, Json<ErrorResponse>)> {
    if req.kanji.trim().is_empty() {
        return Err(bad_request("kanji is required"));
    }
    match state.oracle.generate_entry(&req.kanji).await {
        Ok(draft) => Ok(Json(draft)),
        Err(e) => Err(internal("entry generation failed", e)),
    }
}

// ─── Helpers ──────────────────────────────────────────────────

fn build_entry(id: String, req: WordRequest) -> VocabEntry {
    let senses = req
        .senses
        .into_iter()
        .map(|sense| {
            let sense_id = if sense.id.is_empty() {
                new_id("s_")
            } else {
                sense.id
            };
            let examples = sense
                .examples
                .into_iter()
                .map(|example| SenseExample {
                    id: new_id("e_"),
                    sense_id: sense_id.clone(),
                    kanji: example.kanji,
                    furigana: example.furigana,
                    def: example.def,
                    audio: example.audio,
                })
                .collect();
            VocabSense {
                id: sense_id.clone(),
                vocab_id: id.clone(),
                level: sense.level,
                reading: sense.reading,
                furigana: sense.furigana,
                pitch: sense.pitch,
                pos: sense.pos,
                def: sense.def,
                audio: sense.audio,
                examples,
            }
        })
        .collect::<Vec<_>>();

    VocabEntry {
        id,
        kanji: req.kanji,
        // The stored flag always reflects the actual sense count.
        is_multi: senses.len() > 1,
        senses,
    }
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::now_v7().simple())
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "entry not found".to_string(),
        }),
    )
}

fn internal(
    message: &str,
    err: impl std::fmt::Display,
) -> (StatusCode, Json<ErrorResponse>) {
    warn!(error = %err, "{message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_entry_recomputes_is_multi_and_keeps_provided_sense_ids() {
        let req = WordRequest {
            kanji: "的".to_string(),
            senses: vec![
                SenseRequest {
                    id: "s_keep".to_string(),
                    def: "target".to_string(),
                    ..blank_sense()
                },
                SenseRequest {
                    def: "suffix".to_string(),
                    ..blank_sense()
                },
            ],
        };

        let entry = build_entry("w_1".to_string(), req);
        assert!(entry.is_multi);
        assert_eq!(entry.senses[0].id, "s_keep");
        assert!(entry.senses[1].id.starts_with("s_"));
        assert_ne!(entry.senses[1].id, "s_");
        assert_eq!(entry.senses[0].vocab_id, "w_1");
    }

    #[test]
    fn single_sense_entry_is_not_multi() {
        let req = WordRequest {
            kanji: "猫".to_string(),
            senses: vec![SenseRequest {
                def: "cat".to_string(),
                ..blank_sense()
            }],
        };
        assert!(!build_entry("w_1".to_string(), req).is_multi);
    }

    fn blank_sense() -> SenseRequest {
        SenseRequest {
            id: String::new(),
            level: String::new(),
            reading: String::new(),
            def: String::new(),
            pos: String::new(),
            pitch: String::new(),
            audio: String::new(),
            furigana: Value::Null,
            examples: Vec::new(),
        }
    }
}
