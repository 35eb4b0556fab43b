//! Postgres-backed dictionary storage.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use yomu_core::store::SenseStore;
use yomu_core::types::{SenseExample, VocabEntry, VocabSense};

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: String,
    kanji: String,
    is_multi: bool,
}

#[derive(sqlx::FromRow)]
struct SenseRow {
    id: String,
    vocab_id: String,
    level: String,
    reading: String,
    furigana: serde_json::Value,
    pitch: String,
    pos: String,
    def: String,
    audio: String,
}

#[derive(sqlx::FromRow)]
struct ExampleRow {
    id: String,
    sense_id: String,
    kanji: String,
    furigana: serde_json::Value,
    def: String,
    audio: String,
}

/// Dictionary storage over Postgres.
///
/// Serves the analysis pipeline's bulk hydration and the maintenance
/// surface's entry persistence. Hydration runs three bulk queries (entries,
/// senses, examples) and assembles the nesting in memory, keeping one
/// round-trip per table regardless of document size.
pub struct PgVocabStore {
    pool: PgPool,
}

impl PgVocabStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `(surface form, entry id)` pairs for a full lexicon cache reload.
    pub async fn lexicon_snapshot(&self) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (String, String)>("SELECT kanji, id FROM vocab_entries")
            .fetch_all(&self.pool)
            .await
    }

    /// Insert a new entry with its senses and examples in one transaction.
    pub async fn insert_entry(&self, entry: &VocabEntry) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO vocab_entries (id, kanji, is_multi, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.kanji)
        .bind(entry.is_multi)
        .execute(&mut *tx)
        .await?;

        insert_senses(&mut tx, entry).await?;
        tx.commit().await
    }

    /// Replace an entry's surface form and sense set.
    ///
    /// Returns the previous surface form so the caller can fix up the
    /// lexicon cache on rename, or `None` when the entry does not exist.
    pub async fn update_entry(&self, entry: &VocabEntry) -> Result<Option<String>, sqlx::Error> {
        let previous: Option<(String,)> =
            sqlx::query_as("SELECT kanji FROM vocab_entries WHERE id = $1")
                .bind(&entry.id)
                .fetch_optional(&self.pool)
                .await?;
        let Some((previous_kanji,)) = previous else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE vocab_entries SET kanji = $2, is_multi = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(&entry.id)
        .bind(&entry.kanji)
        .bind(entry.is_multi)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM sense_examples WHERE sense_id IN (SELECT id FROM vocab_senses WHERE vocab_id = $1)",
        )
        .bind(&entry.id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM vocab_senses WHERE vocab_id = $1")
            .bind(&entry.id)
            .execute(&mut *tx)
            .await?;

        insert_senses(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(Some(previous_kanji))
    }

    /// Delete an entry and its senses/examples.
    ///
    /// Returns the deleted surface form for cache cleanup, or `None` when
    /// the entry does not exist.
    pub async fn delete_entry(&self, id: &str) -> Result<Option<String>, sqlx::Error> {
        let deleted: Option<(String,)> =
            sqlx::query_as("DELETE FROM vocab_entries WHERE id = $1 RETURNING kanji")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(deleted.map(|(kanji,)| kanji))
    }
}

async fn insert_senses(
    tx: &mut Transaction<'_, Postgres>,
    entry: &VocabEntry,
) -> Result<(), sqlx::Error> {
    for sense in &entry.senses {
        sqlx::query(
            r#"
            INSERT INTO vocab_senses (id, vocab_id, level, reading, furigana, pitch, pos, def, audio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&sense.id)
        .bind(&entry.id)
        .bind(&sense.level)
        .bind(&sense.reading)
        .bind(&sense.furigana)
        .bind(&sense.pitch)
        .bind(&sense.pos)
        .bind(&sense.def)
        .bind(&sense.audio)
        .execute(&mut **tx)
        .await?;

        for example in &sense.examples {
            sqlx::query(
                r#"
                INSERT INTO sense_examples (id, sense_id, kanji, furigana, def, audio)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&example.id)
            .bind(&sense.id)
            .bind(&example.kanji)
            .bind(&example.furigana)
            .bind(&example.def)
            .bind(&example.audio)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl SenseStore for PgVocabStore {
    async fn fetch_entries(&self, ids: &[String]) -> Result<Vec<VocabEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let entry_rows: Vec<EntryRow> =
            sqlx::query_as("SELECT id, kanji, is_multi FROM vocab_entries WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        let sense_rows: Vec<SenseRow> = sqlx::query_as(
            r#"
            SELECT id, vocab_id, level, reading, furigana, pitch, pos, def, audio
            FROM vocab_senses
            WHERE vocab_id = ANY($1)
            ORDER BY vocab_id, id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let sense_ids: Vec<String> = sense_rows.iter().map(|row| row.id.clone()).collect();
        let example_rows: Vec<ExampleRow> = if sense_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as(
                r#"
                SELECT id, sense_id, kanji, furigana, def, audio
                FROM sense_examples
                WHERE sense_id = ANY($1)
                ORDER BY sense_id, id
                "#,
            )
            .bind(&sense_ids)
            .fetch_all(&self.pool)
            .await?
        };

        let mut examples_by_sense: HashMap<String, Vec<SenseExample>> = HashMap::new();
        for row in example_rows {
            examples_by_sense
                .entry(row.sense_id.clone())
                .or_default()
                .push(SenseExample {
                    id: row.id,
                    sense_id: row.sense_id,
                    kanji: row.kanji,
                    furigana: row.furigana,
                    def: row.def,
                    audio: row.audio,
                });
        }

        let mut senses_by_entry: HashMap<String, Vec<VocabSense>> = HashMap::new();
        for row in sense_rows {
            let examples = examples_by_sense.remove(&row.id).unwrap_or_default();
            senses_by_entry
                .entry(row.vocab_id.clone())
                .or_default()
                .push(VocabSense {
                    id: row.id,
                    vocab_id: row.vocab_id,
                    level: row.level,
                    reading: row.reading,
                    furigana: row.furigana,
                    pitch: row.pitch,
                    pos: row.pos,
                    def: row.def,
                    audio: row.audio,
                    examples,
                });
        }

        Ok(entry_rows
            .into_iter()
            .map(|row| {
                let senses = senses_by_entry.remove(&row.id).unwrap_or_default();
                VocabEntry {
                    id: row.id,
                    kanji: row.kanji,
                    is_multi: row.is_multi,
                    senses,
                }
            })
            .collect())
    }
}
