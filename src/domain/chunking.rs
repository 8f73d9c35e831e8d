//! Overlap-aware text chunking.
//!
//! Windows hold at most `max_chars` characters and prefer to end just after a
//! whitespace character. Each window after the first starts exactly
//! `overlap_chars` characters before the previous one ended, so dropping
//! `chunk.overlap` leading bytes from every chunk and concatenating the rest
//! gives back the source text.

use std::iter::FusedIterator;

use crate::domain::{Chunk, Document, DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl Chunker {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(DomainError::invalid_input("chunk size must be positive"));
        }
        if overlap_chars >= max_chars {
            return Err(DomainError::invalid_input(format!(
                "chunk overlap ({overlap_chars}) must be smaller than chunk size ({max_chars})"
            )));
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Lazily walks the document. Every call starts again from the beginning.
    pub fn chunks<'a>(&self, document: &'a Document) -> Chunks<'a> {
        Chunks {
            document_id: &document.id,
            text: &document.text,
            max_chars: self.max_chars,
            overlap_chars: self.overlap_chars,
            cursor: 0,
            prev_end: 0,
            index: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    document_id: &'a str,
    text: &'a str,
    max_chars: usize,
    overlap_chars: usize,
    cursor: usize,
    prev_end: usize,
    index: usize,
}

impl Chunks<'_> {
    /// End of the window starting at `start` when the hard limit falls inside the text.
    fn break_point(&self, start: usize, hard_end: usize) -> usize {
        // A break before `floor` would not move the next window forward.
        let floor = advance(self.text, start, self.overlap_chars);

        self.text[floor..hard_end]
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| floor + i + c.len_utf8())
            .unwrap_or(hard_end)
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.cursor >= self.text.len() {
            return None;
        }

        let start = self.cursor;
        let hard_end = advance(self.text, start, self.max_chars);
        let end = if hard_end < self.text.len() {
            self.break_point(start, hard_end)
        } else {
            hard_end
        };
        let overlap = if self.index == 0 {
            0
        } else {
            self.prev_end - start
        };

        let chunk = Chunk {
            document_id: self.document_id.to_string(),
            index: self.index,
            text: self.text[start..end].to_string(),
            start,
            end,
            overlap,
        };

        self.cursor = if end == self.text.len() {
            end
        } else {
            retreat(self.text, end, self.overlap_chars)
        };
        self.prev_end = end;
        self.index += 1;

        Some(chunk)
    }
}

impl FusedIterator for Chunks<'_> {}

/// Byte offset `n` chars after `from`, clamped to the end of `text`.
fn advance(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte offset `n` chars before `to`.
fn retreat(text: &str, to: usize, n: usize) -> usize {
    if n == 0 {
        return to;
    }
    text[..to]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Rebuilds the source text from an ordered run of chunks.
pub fn reassemble<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
    chunks.into_iter().map(Chunk::fresh_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("doc", text)
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert_eq!(chunker.chunks(&doc("")).count(), 0);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = Chunker::new(100, 20).unwrap();
        let document = doc("Hello world. This is a test.");
        let chunks: Vec<_> = chunker.chunks(&document).collect();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, document.text);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].overlap, 0);
        assert_eq!((chunks[0].start, chunks[0].end), (0, document.text.len()));
    }

    #[test]
    fn test_exact_size_single_chunk() {
        let chunker = Chunker::new(5, 1).unwrap();
        assert_eq!(chunker.chunks(&doc("abcde")).count(), 1);
    }

    #[test]
    fn test_breaks_after_whitespace() {
        let chunker = Chunker::new(12, 0).unwrap();
        let document = doc("alpha beta gamma delta");
        let chunks: Vec<_> = chunker.chunks(&document).collect();

        assert_eq!(chunks[0].text, "alpha beta ");
        assert_eq!(chunks[1].text, "gamma delta");
        assert_eq!(reassemble(&chunks), document.text);
    }

    #[test]
    fn test_overlap_is_exact() {
        let chunker = Chunker::new(10, 3).unwrap();
        let document = doc("abcdefghijklmnopqrstuvwxyz");
        let chunks: Vec<_> = chunker.chunks(&document).collect();

        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "hijklmnopq");
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].overlap, 3);
            assert_eq!(pair[1].start, pair[0].end - 3);
            assert!(pair[0].text.ends_with(&pair[1].text[..pair[1].overlap]));
        }
        assert_eq!(reassemble(&chunks), document.text);
    }

    #[test]
    fn test_indices_contiguous() {
        let chunker = Chunker::new(8, 2).unwrap();
        let document = doc(&"lorem ipsum dolor sit amet ".repeat(10));
        let indices: Vec<_> = chunker.chunks(&document).map(|c| c.index).collect();

        assert_eq!(indices, (0..indices.len()).collect::<Vec<_>>());
        assert!(chunker
            .chunks(&document)
            .all(|c| c.text.chars().count() <= 8));
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = Chunker::new(4, 1).unwrap();
        let document = doc("héllo wörld ñandú 日本語テキスト");
        let chunks: Vec<_> = chunker.chunks(&document).collect();

        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks), document.text);
    }

    #[test]
    fn test_restartable_and_deterministic() {
        let chunker = Chunker::new(7, 2).unwrap();
        let document = doc("the quick brown fox jumps over the lazy dog");

        let first: Vec<_> = chunker.chunks(&document).collect();
        let second: Vec<_> = chunker.chunks(&document).collect();
        assert_eq!(first, second);

        let mut iter = chunker.chunks(&document);
        iter.next();
        let resumed: Vec<_> = iter.clone().collect();
        assert_eq!(resumed, first[1..].to_vec());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(10, 10).is_err());
        assert!(Chunker::new(10, 9).is_ok());
    }
}
