use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Stored model ─────────────────────────────────────────────

/// A dictionary entry: one surface form carrying one or more senses.
///
/// Owned by storage; the lexicon cache holds only the surface-form → id
/// projection and full entries are hydrated per request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub id: String,
    pub kanji: String,
    pub is_multi: bool,
    pub senses: Vec<VocabSense>,
}

/// One sense of an entry, immutable for the duration of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabSense {
    pub id: String,
    pub vocab_id: String,
    pub level: String,
    pub reading: String,
    /// Ruby annotation as `[[text, reading], ...]`; free-form JSON in storage.
    pub furigana: Value,
    pub pitch: String,
    pub pos: String,
    pub def: String,
    pub audio: String,
    pub examples: Vec<SenseExample>,
}

/// Example sentence attached to a sense.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SenseExample {
    pub id: String,
    pub sense_id: String,
    pub kanji: String,
    pub furigana: Value,
    pub def: String,
    pub audio: String,
}

// ─── Tokens ───────────────────────────────────────────────────

/// One segment of the input text, produced by forward maximum matching.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A span matched by the lexicon, with every entry id sharing the form.
    Word { text: String, entry_ids: Vec<String> },
    /// A single character with no lexicon match.
    Literal { text: String },
}

impl Token {
    pub fn text(&self) -> &str {
        match self {
            Token::Word { text, .. } | Token::Literal { text } => text,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Token::Word { .. })
    }
}

// ─── Wire payloads ────────────────────────────────────────────

/// A fully rendered sense candidate as delivered to the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordDetail {
    pub vocab_id: String,
    pub sense_id: String,
    pub level: String,
    pub reading: String,
    pub def: String,
    pub pos: String,
    pub selected: bool,
    pub examples: Vec<ExampleDetail>,
}

/// Example sentence as delivered to the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExampleDetail {
    pub kanji: String,
    pub def: String,
    pub audio: String,
    pub furigana: Value,
}

/// Token as serialized into both the `initial` and `ai_update` events.
/// Literal tokens carry neither detail nor candidates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub text: String,
    pub is_word: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<WordDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<WordDetail>,
}

/// One row of the deduplicated vocabulary summary: a distinct resolved
/// surface form with its current selection and full candidate list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabSummary {
    pub text: String,
    pub detail: WordDetail,
    pub candidates: Vec<WordDetail>,
}

/// Payload carried by both delivery phases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub tokens: Vec<TokenPayload>,
    pub vocab_list: Vec<VocabSummary>,
}
