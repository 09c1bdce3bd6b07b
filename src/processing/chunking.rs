//! Character-budget chunking with overlap.
//!
//! Page text is split with `semchunk-rs`, which prefers paragraph, sentence and word boundaries
//! before falling back to raw characters. Lengths are measured in characters. To honour both the
//! maximum chunk length and the requested overlap, the base split uses `chunk_size - overlap`
//! and each chunk is then prefixed with up to `overlap` characters taken from the tail of its
//! predecessor, starting on a word boundary when one is available.

use semchunk_rs::Chunker;
use std::sync::Arc;

use super::types::ChunkingError;

type LengthCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Split `text` into chunks of at most `chunk_size` characters overlapping by up to `overlap`.
///
/// Returns an empty vector when the input is all whitespace.
pub(crate) fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::InvalidOverlap {
            overlap,
            chunk_size,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(chunk_text_with_counter(
        text,
        chunk_size,
        overlap,
        char_counter(),
    ))
}

fn char_counter() -> LengthCounter {
    Arc::new(|segment: &str| segment.chars().count())
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    counter: LengthCounter,
) -> Vec<String> {
    let base_size = chunk_size - overlap;
    let counter_for_chunker = counter.clone();
    let chunker = Chunker::new(
        base_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks: Vec<String> = chunker
        .chunk(text)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect();
    apply_overlap(base_chunks, chunk_size, overlap, &counter)
}

/// Prefix every chunk after the first with the tail of its predecessor.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &LengthCounter,
) -> Vec<String> {
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;

    for current in chunks {
        let chunk = match previous.as_deref() {
            Some(prev) => {
                // Leave room for the separating space.
                let room = chunk_size.saturating_sub(counter.as_ref()(&current) + 1);
                let tail = overlap_tail(prev, overlap.min(room), counter);
                join_with_space(tail, &current)
            }
            None => current.clone(),
        };
        overlapped.push(chunk);
        previous = Some(current);
    }

    overlapped
}

/// Longest suffix of `text` within `limit` characters, moved forward to a word start.
fn overlap_tail<'a>(text: &'a str, limit: usize, counter: &LengthCounter) -> &'a str {
    if limit == 0 {
        return "";
    }

    let trimmed = text.trim_start();
    if counter.as_ref()(trimmed) <= limit {
        return trimmed;
    }

    for (offset, _) in text.char_indices().skip(1) {
        if counter.as_ref()(text[offset..].trim_start()) <= limit {
            return snap_to_word_start(text, offset);
        }
    }

    ""
}

fn snap_to_word_start(text: &str, offset: usize) -> &str {
    let tail = &text[offset..];
    let splits_word = text[..offset]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace())
        && tail.chars().next().is_some_and(|c| !c.is_whitespace());

    if !splits_word {
        return tail.trim_start();
    }

    match tail.find(char::is_whitespace) {
        Some(position) => {
            let rest = tail[position..].trim_start();
            if rest.is_empty() { tail } else { rest }
        }
        None => tail,
    }
}

fn join_with_space(tail: &str, current: &str) -> String {
    if tail.is_empty() {
        return current.to_string();
    }
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);
    combined.push_str(tail);
    if !tail.ends_with(char::is_whitespace) && !current.starts_with(char::is_whitespace) {
        combined.push(' ');
    }
    combined.push_str(current);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|idx| format!("word{idx}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn chunks_never_exceed_character_budget() {
        let text = numbered_words(400);
        let chunks = chunk_text(&text, 100, 40).expect("chunking succeeded");
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn neighbouring_chunks_share_words() {
        let text = numbered_words(400);
        let chunks = chunk_text(&text, 100, 40).expect("chunking succeeded");
        for pair in chunks.windows(2) {
            let first_word = pair[1].split_whitespace().next().expect("non-empty chunk");
            assert!(
                pair[0].split_whitespace().any(|word| word == first_word),
                "{:?} does not overlap {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn zero_overlap_preserves_word_order() {
        let text = numbered_words(120);
        let chunks = chunk_text(&text, 50, 0).expect("chunking succeeded");
        let rejoined: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.split_whitespace())
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = chunk_text("Rust developer with five years of experience.", 500, 200)
            .expect("chunking succeeded");
        assert_eq!(chunks, vec!["Rust developer with five years of experience."]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(chunk_text(" \n\t ", 500, 200).expect("chunking").is_empty());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let error = chunk_text("hello", 0, 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let error = chunk_text("hello", 10, 10).unwrap_err();
        assert!(matches!(
            error,
            ChunkingError::InvalidOverlap {
                overlap: 10,
                chunk_size: 10
            }
        ));
    }

    #[test]
    fn overlap_tail_starts_on_word_boundary() {
        let counter = char_counter();
        let tail = overlap_tail("alpha beta gamma", 8, &counter);
        assert_eq!(tail, "gamma");
    }

    #[test]
    fn overlap_tail_keeps_unbroken_text() {
        let counter = char_counter();
        assert_eq!(overlap_tail("abcdefgh", 3, &counter), "fgh");
        assert_eq!(overlap_tail("short", 10, &counter), "short");
        assert_eq!(overlap_tail("anything", 0, &counter), "");
    }
}
