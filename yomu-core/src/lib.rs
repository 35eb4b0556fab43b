//! Core analysis pipeline for dictionary-backed reading assistance.
//!
//! Text flows through four stages: [`segmenter::segment`] matches the text
//! against the shared [`lexicon::LexiconCache`]; [`resolver::HydratedDocument`]
//! bulk-loads sense data through a [`store::SenseStore`] and fixes the
//! canonical candidate ordering; [`oracle::resolve_selections`] runs one
//! best-effort bulk call against a [`oracle::SenseOracle`]; and
//! [`resolver::HydratedDocument::assemble`] renders the payload for either
//! delivery phase. Transport, storage, and oracle implementations live in
//! the server crate.

pub mod error;
pub mod lexicon;
pub mod oracle;
pub mod resolver;
pub mod segmenter;
pub mod store;
pub mod types;

pub use error::AnalyzeError;
pub use lexicon::LexiconCache;
pub use oracle::{resolve_selections, CandidateBatch, SenseOracle};
pub use resolver::HydratedDocument;
pub use segmenter::segment;
pub use store::{MemorySenseStore, SenseStore};
pub use types::{AnalysisPayload, Token, TokenPayload, VocabSummary, WordDetail};
