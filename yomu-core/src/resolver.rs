//! Candidate hydration, canonical ordering, and result assembly.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::oracle::CandidateBatch;
use crate::store::SenseStore;
use crate::types::{
    AnalysisPayload, ExampleDetail, Token, TokenPayload, VocabEntry, VocabSense, VocabSummary,
    WordDetail,
};

/// Tokens within this distance of an ambiguous token form its oracle context.
pub const CONTEXT_RADIUS: usize = 15;

/// Rendered option glosses are cut at this many characters.
const GLOSS_LIMIT: usize = 50;

/// One (entry, sense) candidate for a word token.
#[derive(Clone, Debug)]
struct SenseOption {
    vocab_id: String,
    entry_surface: String,
    sense: VocabSense,
}

impl SenseOption {
    fn to_detail(&self, selected: bool) -> WordDetail {
        WordDetail {
            vocab_id: self.vocab_id.clone(),
            sense_id: self.sense.id.clone(),
            level: self.sense.level.clone(),
            reading: self.sense.reading.clone(),
            def: self.sense.def.clone(),
            pos: self.sense.pos.clone(),
            selected,
            examples: self
                .sense
                .examples
                .iter()
                .map(|ex| ExampleDetail {
                    kanji: ex.kanji.clone(),
                    def: ex.def.clone(),
                    audio: ex.audio.clone(),
                    furigana: ex.furigana.clone(),
                })
                .collect(),
        }
    }
}

/// Key under which a token's oracle decision is filed.
pub fn token_key(index: usize) -> String {
    format!("token_{index}")
}

/// A segmented document with per-token candidate lists hydrated.
///
/// The candidate ordering fixed here (entry ids in match order, senses
/// within an entry in stored order) is the index space every oracle answer
/// refers to. Both delivery phases assemble their payloads from this one
/// structure, so the ordering cannot drift between them.
pub struct HydratedDocument {
    tokens: Vec<Token>,
    options: Vec<Vec<SenseOption>>,
}

impl HydratedDocument {
    /// Hydrate full sense data for every distinct entry id in the document
    /// with a single bulk fetch.
    ///
    /// A storage failure degrades to an empty hydration with a warning: the
    /// consumer still gets a token stream, just without details. Ids missing
    /// from the result are skipped silently.
    pub async fn hydrate(tokens: Vec<Token>, store: &dyn SenseStore) -> Self {
        let mut seen = HashSet::new();
        let mut distinct_ids = Vec::new();
        for token in &tokens {
            if let Token::Word { entry_ids, .. } = token {
                for id in entry_ids {
                    if seen.insert(id.clone()) {
                        distinct_ids.push(id.clone());
                    }
                }
            }
        }

        let entries: HashMap<String, VocabEntry> = if distinct_ids.is_empty() {
            HashMap::new()
        } else {
            match store.fetch_entries(&distinct_ids).await {
                Ok(list) => list.into_iter().map(|e| (e.id.clone(), e)).collect(),
                Err(err) => {
                    warn!(error = %err, "bulk hydration failed; continuing without details");
                    HashMap::new()
                }
            }
        };

        let options = tokens
            .iter()
            .map(|token| match token {
                Token::Word { entry_ids, .. } => entry_ids
                    .iter()
                    .filter_map(|id| entries.get(id))
                    .flat_map(|entry| {
                        entry.senses.iter().map(|sense| SenseOption {
                            vocab_id: entry.id.clone(),
                            entry_surface: entry.kanji.clone(),
                            sense: sense.clone(),
                        })
                    })
                    .collect(),
                Token::Literal { .. } => Vec::new(),
            })
            .collect();

        Self { tokens, options }
    }

    /// Whether any token has strictly more than one candidate.
    pub fn has_ambiguity(&self) -> bool {
        self.options.iter().any(|opts| opts.len() > 1)
    }

    /// Build the oracle batch: one item per ambiguous token, carrying its
    /// local context window and rendered option strings.
    pub fn candidate_batches(&self) -> Vec<CandidateBatch> {
        self.tokens
            .iter()
            .enumerate()
            .filter_map(|(idx, token)| {
                let opts = &self.options[idx];
                if opts.len() <= 1 {
                    return None;
                }
                Some(CandidateBatch {
                    token_key: token_key(idx),
                    surface: token.text().to_string(),
                    context: self.context_window(idx),
                    options: opts.iter().map(render_option).collect(),
                })
            })
            .collect()
    }

    /// Concatenated text of the tokens around `idx`, clipped to the document.
    fn context_window(&self, idx: usize) -> String {
        let start = idx.saturating_sub(CONTEXT_RADIUS);
        let end = (idx + CONTEXT_RADIUS).min(self.tokens.len());
        self.tokens[start..end]
            .iter()
            .map(Token::text)
            .collect()
    }

    /// Assemble the full payload under the given selections.
    ///
    /// Missing or out-of-range selections fall back to index 0, so the
    /// defaults-only immediate pass and a refined pass with a degenerate
    /// oracle reply produce identical results. The vocabulary summary keeps
    /// one row per distinct resolved surface form, in first-occurrence order.
    pub fn assemble(&self, selections: &HashMap<String, usize>) -> AnalysisPayload {
        let mut tokens = Vec::with_capacity(self.tokens.len());
        let mut vocab_list = Vec::new();
        let mut seen_surfaces = HashSet::new();

        for (idx, token) in self.tokens.iter().enumerate() {
            let text = token.text().to_string();
            if !token.is_word() {
                tokens.push(TokenPayload {
                    text,
                    is_word: false,
                    detail: None,
                    candidates: Vec::new(),
                });
                continue;
            }

            let opts = &self.options[idx];
            if opts.is_empty() {
                // Hydration gap: matched during segmentation, nothing behind it.
                tokens.push(TokenPayload {
                    text,
                    is_word: true,
                    detail: None,
                    candidates: Vec::new(),
                });
                continue;
            }

            let mut selected = 0;
            if let Some(&choice) = selections.get(&token_key(idx)) {
                if choice < opts.len() {
                    selected = choice;
                }
            }

            let candidates: Vec<WordDetail> = opts
                .iter()
                .enumerate()
                .map(|(i, opt)| opt.to_detail(i == selected))
                .collect();
            let detail = candidates[selected].clone();

            let surface = opts[selected].entry_surface.clone();
            if seen_surfaces.insert(surface.clone()) {
                vocab_list.push(VocabSummary {
                    text: surface,
                    detail: detail.clone(),
                    candidates: candidates.clone(),
                });
            }

            tokens.push(TokenPayload {
                text,
                is_word: true,
                detail: Some(detail),
                candidates,
            });
        }

        AnalysisPayload { tokens, vocab_list }
    }
}

/// Render one candidate as an oracle option line:
/// `[entry-surface] [level] pos - gloss`, gloss cut at 50 characters.
fn render_option(opt: &SenseOption) -> String {
    let def = &opt.sense.def;
    let gloss = if def.chars().count() > GLOSS_LIMIT {
        let cut: String = def.chars().take(GLOSS_LIMIT).collect();
        format!("{cut}...")
    } else {
        def.clone()
    };
    format!(
        "[{}] [{}] {} - {}",
        opt.entry_surface, opt.sense.level, opt.sense.pos, gloss
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySenseStore;
    use serde_json::Value;

    fn sense(id: &str, vocab_id: &str, def: &str) -> VocabSense {
        VocabSense {
            id: id.to_string(),
            vocab_id: vocab_id.to_string(),
            level: "N5".to_string(),
            reading: "よみ".to_string(),
            furigana: Value::Null,
            pitch: "⓪".to_string(),
            pos: "名词".to_string(),
            def: def.to_string(),
            audio: String::new(),
            examples: Vec::new(),
        }
    }

    fn entry(id: &str, kanji: &str, defs: &[&str]) -> VocabEntry {
        VocabEntry {
            id: id.to_string(),
            kanji: kanji.to_string(),
            is_multi: defs.len() > 1,
            senses: defs
                .iter()
                .enumerate()
                .map(|(i, def)| sense(&format!("{id}_s{i}"), id, def))
                .collect(),
        }
    }

    fn word(text: &str, ids: &[&str]) -> Token {
        Token::Word {
            text: text.to_string(),
            entry_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn hydration_gap_leaves_token_without_detail() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "猫", &["cat"]));

        let tokens = vec![word("猫", &["id_1"]), word("犬", &["id_gone"])];
        let doc = HydratedDocument::hydrate(tokens, &store).await;
        let payload = doc.assemble(&HashMap::new());

        assert!(payload.tokens[0].detail.is_some());
        assert!(payload.tokens[1].detail.is_none());
        assert!(payload.tokens[1].candidates.is_empty());
        assert!(payload.tokens[1].is_word);
    }

    #[tokio::test]
    async fn candidate_ordering_is_reproducible() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "的", &["target", "bull's-eye"]));
        store.insert(entry("id_2", "的", &["adjectival suffix"]));

        let tokens = vec![word("的", &["id_1", "id_2"])];
        let first = HydratedDocument::hydrate(tokens.clone(), &store).await;
        let second = HydratedDocument::hydrate(tokens, &store).await;

        assert_eq!(first.candidate_batches(), second.candidate_batches());
        let ids = |doc: &HydratedDocument| -> Vec<String> {
            doc.assemble(&HashMap::new()).tokens[0]
                .candidates
                .iter()
                .map(|c| c.sense_id.clone())
                .collect()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(
            ids(&first),
            vec!["id_1_s0", "id_1_s1", "id_2_s0"],
            "entry ids in match order, senses in stored order"
        );
    }

    #[tokio::test]
    async fn batches_cover_only_ambiguous_tokens() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "猫", &["cat"]));
        store.insert(entry("id_2", "的", &["target", "suffix"]));

        let tokens = vec![
            word("猫", &["id_1"]),
            Token::Literal { text: "が".to_string() },
            word("的", &["id_2"]),
        ];
        let doc = HydratedDocument::hydrate(tokens, &store).await;
        let batches = doc.candidate_batches();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].token_key, "token_2");
        assert_eq!(batches[0].surface, "的");
        assert_eq!(batches[0].context, "猫が的");
        assert_eq!(batches[0].options.len(), 2);
        assert!(batches[0].options[0].starts_with("[的] [N5] 名词 - "));
    }

    #[tokio::test]
    async fn long_glosses_are_truncated_with_ellipsis() {
        let store = MemorySenseStore::new();
        let long_def = "い".repeat(60);
        store.insert(entry("id_1", "猫", &[&long_def, "short"]));

        let doc = HydratedDocument::hydrate(vec![word("猫", &["id_1"])], &store).await;
        let batches = doc.candidate_batches();
        let option = &batches[0].options[0];

        assert!(option.ends_with("..."));
        let rendered_gloss = option.rsplit(" - ").next().unwrap();
        assert_eq!(rendered_gloss.chars().count(), 53);
    }

    #[tokio::test]
    async fn out_of_range_selection_falls_back_to_default() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "的", &["target", "suffix"]));

        let doc = HydratedDocument::hydrate(vec![word("的", &["id_1"])], &store).await;
        let refined = doc.assemble(&HashMap::from([("token_0".to_string(), 99)]));
        let immediate = doc.assemble(&HashMap::new());

        assert_eq!(refined, immediate);
        assert_eq!(refined.tokens[0].detail.as_ref().unwrap().sense_id, "id_1_s0");
    }

    #[tokio::test]
    async fn selection_marks_the_chosen_candidate() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "的", &["target", "suffix"]));

        let doc = HydratedDocument::hydrate(vec![word("的", &["id_1"])], &store).await;
        let payload = doc.assemble(&HashMap::from([("token_0".to_string(), 1)]));
        let token = &payload.tokens[0];

        assert_eq!(token.detail.as_ref().unwrap().sense_id, "id_1_s1");
        assert!(token.detail.as_ref().unwrap().selected);
        assert!(!token.candidates[0].selected);
        assert!(token.candidates[1].selected);
    }

    #[tokio::test]
    async fn vocab_list_deduplicates_by_surface_in_first_occurrence_order() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "猫", &["cat"]));
        store.insert(entry("id_2", "犬", &["dog"]));

        let tokens = vec![
            word("猫", &["id_1"]),
            word("犬", &["id_2"]),
            word("猫", &["id_1"]),
        ];
        let doc = HydratedDocument::hydrate(tokens, &store).await;
        let payload = doc.assemble(&HashMap::new());

        let surfaces: Vec<&str> = payload.vocab_list.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(surfaces, vec!["猫", "犬"]);
    }

    #[tokio::test]
    async fn context_window_is_clipped_to_document_bounds() {
        let store = MemorySenseStore::new();
        store.insert(entry("id_1", "的", &["target", "suffix"]));

        let mut tokens: Vec<Token> = (0..40)
            .map(|_| Token::Literal { text: "あ".to_string() })
            .collect();
        tokens.push(word("的", &["id_1"]));
        let doc = HydratedDocument::hydrate(tokens, &store).await;
        let batches = doc.candidate_batches();

        // 15 literals before the ambiguous token, nothing after.
        assert_eq!(batches[0].context, format!("{}的", "あ".repeat(15)));
    }
}
