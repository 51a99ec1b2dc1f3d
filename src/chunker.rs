//! Splits memory content into embedding-sized chunks.
//!
//! Paragraphs first, sentences when a single paragraph is oversized, with a
//! word-level overlap tail carried between paragraph chunks and a final
//! merge pass for undersized fragments. The output is deterministic for a
//! given input and configuration.

use crate::config::ChunkingConfig;

/// One emitted chunk: content plus its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub index: usize,
    pub total: usize,
}

/// Rough token estimate: four characters per token, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Split `content` into chunks of at most `max_tokens` estimated tokens.
pub fn chunk_text(content: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    if estimate_tokens(content) <= config.max_tokens {
        return finalize(vec![content.to_string()]);
    }

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in split_paragraphs(content) {
        if estimate_tokens(paragraph) > config.max_tokens {
            // Oversized paragraph: flush, then accumulate its sentences
            // without carrying overlap.
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            accumulate_sentences(paragraph, config.max_tokens, &mut pieces);
            continue;
        }

        if current.is_empty() {
            current = paragraph.to_string();
        } else if estimate_tokens(&current) + estimate_tokens(paragraph) + 1
            > config.max_tokens
        {
            let tail = overlap_tail(&current, config.overlap_tokens / 2);
            pieces.push(std::mem::take(&mut current));
            current = if tail.is_empty() {
                paragraph.to_string()
            } else {
                format!("{tail}\n{paragraph}")
            };
        } else {
            current.push_str("\n\n");
            current.push_str(paragraph);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    finalize(merge_small(pieces, config))
}

/// Split on runs of two-or-more newlines. Blank-only paragraphs are dropped.
fn split_paragraphs(content: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = content;
    while let Some(pos) = find_paragraph_break(rest) {
        let (head, tail) = rest.split_at(pos);
        if !head.trim().is_empty() {
            out.push(head.trim_matches('\n'));
        }
        rest = tail.trim_start_matches('\n');
    }
    if !rest.trim().is_empty() {
        out.push(rest.trim_matches('\n'));
    }
    out
}

fn find_paragraph_break(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut run = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            run += 1;
            if run == 2 {
                return Some(i - 1);
            }
        } else {
            run = 0;
        }
    }
    None
}

/// Greedy sentence accumulation for a paragraph that exceeds the budget.
/// A sentence ends at terminating punctuation followed by whitespace. A
/// single sentence over the budget is emitted standalone.
fn accumulate_sentences(paragraph: &str, max_tokens: usize, pieces: &mut Vec<String>) {
    let mut current = String::new();
    for sentence in split_sentences(paragraph) {
        if current.is_empty() {
            current = sentence.to_string();
        } else if estimate_tokens(&current) + estimate_tokens(sentence) > max_tokens {
            pieces.push(std::mem::take(&mut current));
            current = sentence.to_string();
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
}

fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    let sentence = paragraph[start..end].trim();
                    if !sentence.is_empty() {
                        out.push(sentence);
                    }
                    start = end;
                }
            }
        }
    }
    let last = paragraph[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}

/// Last `words` whitespace-separated words of `text`, joined by spaces.
fn overlap_tail(text: &str, words: usize) -> String {
    if words == 0 {
        return String::new();
    }
    let all: Vec<&str> = text.split_whitespace().collect();
    let start = all.len().saturating_sub(words);
    all[start..].join(" ")
}

/// Fold chunks under `min_chunk_size` into a neighbor when the merged
/// result still fits the budget; otherwise leave them standalone.
fn merge_small(pieces: Vec<String>, config: &ChunkingConfig) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for piece in pieces {
        if let Some(last) = merged.last_mut() {
            let undersized = estimate_tokens(&piece) < config.min_chunk_size
                || estimate_tokens(last) < config.min_chunk_size;
            if undersized
                && estimate_tokens(last) + estimate_tokens(&piece) + 1 <= config.max_tokens
            {
                last.push_str("\n\n");
                last.push_str(&piece);
                continue;
            }
        }
        merged.push(piece);
    }
    merged
}

fn finalize(pieces: Vec<String>) -> Vec<Chunk> {
    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk {
            content,
            index,
            total,
        })
        .collect()
}
