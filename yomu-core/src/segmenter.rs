//! Greedy forward-maximum-match segmentation.

use crate::lexicon::LexiconCache;
use crate::types::Token;

/// Split `text` into word and literal tokens by forward maximum matching
/// against the lexicon cache.
///
/// The text is walked as a character sequence so multi-byte units are never
/// split. At each cursor position, substrings from `min(max_key_len,
/// remaining)` characters down to 1 are probed; the first (longest) hit wins
/// and the cursor advances past it. With no hit a single-character literal is
/// emitted. Deterministic for a given cache snapshot; cost is O(n · maxLen)
/// probes, each an O(1) average hash lookup.
pub fn segment(text: &str, lexicon: &LexiconCache) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let max_len = lexicon.max_key_len();
    let mut tokens = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        let limit = (chars.len() - i).min(max_len);
        let mut matched = false;

        for len in (1..=limit).rev() {
            let candidate: String = chars[i..i + len].iter().collect();
            if let Some(entry_ids) = lexicon.lookup(&candidate) {
                tokens.push(Token::Word {
                    text: candidate,
                    entry_ids,
                });
                i += len;
                matched = true;
                break;
            }
        }

        if !matched {
            tokens.push(Token::Literal {
                text: chars[i].to_string(),
            });
            i += 1;
        }
    }

    tokens
}
