//! Recursive character text chunking.
//!
//! Splits document text along a separator hierarchy — paragraph break, line
//! break, comma, space — recursively subdividing any piece that still
//! exceeds the maximum chunk size, then greedily merging pieces into chunks
//! with trailing overlap carried into the next chunk.
//!
//! Separators stay attached to the piece they terminate, so concatenating
//! the produced chunks (overlap included) reproduces every character of the
//! trimmed input. Identical input always yields an identical chunk sequence.

use std::collections::VecDeque;

/// Splits normalized document text into bounded, overlapping segments.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextChunker {
    /// Create a chunker with the given size and overlap, both in characters.
    /// Overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: vec!["\n\n".into(), "\n".into(), ",".into(), " ".into()],
        }
    }

    /// Split `text` into an ordered sequence of segments.
    ///
    /// Input is trimmed first; empty input yields an empty sequence. Input
    /// at or under the chunk size comes back as a single segment.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }
        if char_len(trimmed) <= self.chunk_size {
            return vec![trimmed.to_string()];
        }
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_text(trimmed, &separators)
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator actually present in the text wins; the rest stay
        // available for subdividing oversized pieces.
        let Some(pos) = separators.iter().position(|s| text.contains(s)) else {
            return self.split_by_chars(text);
        };
        let sep = separators[pos];
        let remaining = &separators[pos + 1..];

        let mut final_chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();

        for piece in split_keeping(text, sep) {
            if char_len(&piece) <= self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                final_chunks.extend(self.merge_pieces(&good));
                good.clear();
            }
            if remaining.is_empty() {
                final_chunks.extend(self.split_by_chars(&piece));
            } else {
                final_chunks.extend(self.split_text(&piece, remaining));
            }
        }
        if !good.is_empty() {
            final_chunks.extend(self.merge_pieces(&good));
        }
        final_chunks
    }

    /// Greedily pack pieces into chunks of at most `chunk_size` characters,
    /// seeding each new chunk with up to `chunk_overlap` trailing characters
    /// of the previous one.
    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().copied().collect::<String>());
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    if let Some(front) = window.pop_front() {
                        total -= char_len(front);
                    } else {
                        break;
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }
        if !window.is_empty() {
            chunks.push(window.iter().copied().collect::<String>());
        }
        chunks
    }

    /// Last resort: hard cut by character count with a fixed overlap stride.
    fn split_by_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let stride = (self.chunk_size - self.chunk_overlap).max(1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        out
    }
}

/// Split on `sep`, keeping each separator attached to the piece it ends.
fn split_keeping(text: &str, sep: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find(sep) {
        let end = idx + sep.len();
        out.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}
