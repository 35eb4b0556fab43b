//! DeepSeek chat-completions client: disambiguation oracle and entry drafting.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use yomu_core::oracle::{CandidateBatch, SenseOracle};

const DEFAULT_MODEL: &str = "deepseek-chat";

const DISAMBIGUATION_SYSTEM: &str =
    "You are a Japanese language assistant that replies with JSON only.";

const GENERATION_SYSTEM: &str =
    "You are a helpful assistant that replies strictly with JSON.";

/// DeepSeek API client.
#[derive(Clone)]
pub struct DeepSeekClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl DeepSeekClient {
    /// Create a client. An empty `api_key` produces a client that answers
    /// every disambiguation with an empty mapping and never hits the network.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let model = std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url,
            model,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "stream": false,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("DeepSeek API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct Message {
            content: String,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("DeepSeek returned no choices"))
    }

    /// Draft a full dictionary entry for `surface`, shaped for the editor
    /// form. Unlike disambiguation this is a hard-error path: the caller
    /// surfaces oracle failures.
    pub async fn generate_entry(&self, surface: &str) -> Result<GeneratedEntry> {
        if !self.is_configured() {
            return Err(anyhow!("DEEPSEEK_API_KEY is not configured"));
        }
        let content = self
            .chat_json(GENERATION_SYSTEM, &generation_prompt(surface))
            .await?;
        serde_json::from_str(clean_json(&content))
            .map_err(|e| anyhow!("undecodable entry draft: {e}"))
    }
}

#[async_trait]
impl SenseOracle for DeepSeekClient {
    async fn disambiguate(&self, batches: &[CandidateBatch]) -> Result<HashMap<String, usize>> {
        if !self.is_configured() || batches.is_empty() {
            return Ok(HashMap::new());
        }

        let content = self
            .chat_json(DISAMBIGUATION_SYSTEM, &disambiguation_prompt(batches))
            .await?;
        debug!(reply = %content, "oracle reply");

        let raw: HashMap<String, i64> = serde_json::from_str(clean_json(&content))
            .map_err(|e| anyhow!("undecodable oracle reply: {e}"))?;

        // Negative indices are invalid per entry; the range check against the
        // candidate count happens at selection time.
        Ok(raw
            .into_iter()
            .filter_map(|(key, idx)| usize::try_from(idx).ok().map(|idx| (key, idx)))
            .collect())
    }
}

/// Strip the markdown code fences some models wrap around JSON replies.
fn clean_json(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn disambiguation_prompt(batches: &[CandidateBatch]) -> String {
    let mut prompt = String::from(
        "You are a Japanese dictionary expert. Using the sentence context, pick each word's correct sense from its options.\n\
         Notes:\n\
         1. An option's [surface] label may carry an affix marker (e.g. [~的] marks a suffix form, [御~] a prefix form).\n\
         2. Judge from the surrounding grammar whether the word is used standalone, as a prefix, or as a suffix.\n\
         3. Reply with a single JSON object mapping each key to the zero-based index of the best option.\n\n",
    );
    for batch in batches {
        prompt.push_str(&format!(
            "Key: {}\nWord: {}\nContext: {}\nOptions:\n",
            batch.token_key, batch.surface, batch.context
        ));
        for (idx, option) in batch.options.iter().enumerate() {
            prompt.push_str(&format!("{idx}. {option}\n"));
        }
        prompt.push_str("---\n");
    }
    prompt
}

fn generation_prompt(surface: &str) -> String {
    format!(
        r#"You are a professional Japanese dictionary editor. Produce a complete dictionary entry for the Japanese word "{surface}".

Requirements:
1. Output strictly in the JSON shape shown below.
2. "pitch": the accent nucleus as a circled digit (e.g. ⓪, ①, ②).
3. "examples": at most 2 example sentences per sense.
4. "level": the JLPT level (N1-N5), assessed from the word's difficulty, never null.
5. "reading": the word's reading in hiragana.
6. "def": a concise definition.
7. "pos": a common part-of-speech name.
8. "furigana": always a two-dimensional array of [text, reading] pairs.
   - Kanji segments must carry their reading; kana segments use an empty string.
   - A pure-kana word still uses the array form, e.g. "こんにちは" -> [["こんにちは", ""]].
   - Example: "猫が好き" -> [["猫", "ねこ"], ["が", ""], ["好き", "すき"]].

JSON shape:
{{
  "kanji": "{surface}",
  "is_multi": false,
  "senses": [
    {{
      "level": "N5",
      "reading": "ねこ",
      "furigana": [["猫", "ねこ"]],
      "pitch": "⓪",
      "pos": "noun",
      "def": "cat; a common pet.",
      "examples": [
        {{
          "kanji": "猫が好きです",
          "furigana": [["猫", "ねこ"], ["が", ""], ["好き", "すき"], ["です", ""]],
          "def": "I like cats."
        }}
      ]
    }}
  ]
}}
"#
    )
}

// ─── Drafted entry shape ──────────────────────────────────────

/// AI-drafted dictionary entry, returned to the editor for review; never
/// persisted directly.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedEntry {
    pub kanji: String,
    #[serde(default)]
    pub is_multi: bool,
    #[serde(default)]
    pub senses: Vec<GeneratedSense>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedSense {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub reading: String,
    #[serde(default)]
    pub furigana: Value,
    #[serde(default)]
    pub pitch: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub def: String,
    #[serde(default)]
    pub examples: Vec<GeneratedExample>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedExample {
    #[serde(default)]
    pub kanji: String,
    #[serde(default)]
    pub furigana: Value,
    #[serde(default)]
    pub def: String,
}
