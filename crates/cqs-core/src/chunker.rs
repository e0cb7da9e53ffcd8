//! Overlapping fixed-size text chunking.
//!
//! Documents are split into chunks of at most `chunk_size` characters with
//! `chunk_overlap` characters carried over between consecutive chunks, so a
//! statement straddling a chunk boundary is still retrievable from either
//! side.
//!
//! Splitting is recursive: text is first segmented at blank lines, then at
//! newlines, then at spaces, and only hard-split mid-word when a single run
//! exceeds the chunk size. All boundaries respect UTF-8 char boundaries.

use tracing::trace;

/// Separator hierarchy, most significant first.
const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

// ============================================================================
// TextChunker
// ============================================================================

/// Splits document text into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker.
    ///
    /// `chunk_overlap` must be smaller than `chunk_size`; config validation
    /// enforces this before a chunker is ever constructed.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        debug_assert!(chunk_overlap < chunk_size);
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into chunks.
    ///
    /// An empty (or whitespace-only) text yields no chunks; a text shorter
    /// than the chunk size yields exactly one.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut segments = Vec::new();
        collect_segments(text, SEPARATORS, self.chunk_size, &mut segments);

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for segment in segments {
            if !current.is_empty() && current.len() + segment.len() > self.chunk_size {
                chunks.push(std::mem::take(&mut current));

                // Seed the next chunk with the tail of the previous one,
                // trimmed so tail + segment still fits the chunk size.
                let previous = chunks.last().expect("just pushed");
                let budget = self.chunk_size.saturating_sub(segment.len());
                let overlap = self.chunk_overlap.min(budget);
                current.push_str(tail_chars(previous, overlap));
            }
            current.push_str(segment);
        }

        if !current.trim().is_empty() {
            chunks.push(current);
        }

        trace!("Split {} chars into {} chunks", text.len(), chunks.len());
        chunks
    }
}

/// Recursively segment `text` so that every segment is at most `max` bytes.
///
/// Separators are kept attached to the end of each segment so that joining
/// segments reproduces the original text.
fn collect_segments<'a>(
    text: &'a str,
    separators: &[&str],
    max: usize,
    out: &mut Vec<&'a str>,
) {
    if text.len() <= max {
        if !text.is_empty() {
            out.push(text);
        }
        return;
    }

    match separators.first() {
        Some(sep) => {
            for piece in text.split_inclusive(sep) {
                if piece.len() <= max {
                    out.push(piece);
                } else {
                    collect_segments(piece, &separators[1..], max, out);
                }
            }
        }
        None => {
            // No separators left: hard split at char boundaries.
            let mut rest = text;
            while rest.len() > max {
                let mut end = max;
                while !rest.is_char_boundary(end) {
                    end -= 1;
                }
                out.push(&rest[..end]);
                rest = &rest[end..];
            }
            if !rest.is_empty() {
                out.push(rest);
            }
        }
    }
}

/// The last `count` bytes of `s`, adjusted forward to a char boundary.
fn tail_chars(s: &str, count: usize) -> &str {
    if s.len() <= count {
        return s;
    }
    let mut start = s.len() - count;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(100, 10);
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n\n  ").is_empty());
    }

    #[test]
    fn test_short_text_yields_single_chunk() {
        let chunker = TextChunker::new(100, 10);
        let chunks = chunker.split("fn main() {}");
        assert_eq!(chunks, vec!["fn main() {}"]);
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let chunker = TextChunker::new(80, 16);
        let text = "line one\n".repeat(50);
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 80, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_overlap_carried_between_chunks() {
        let chunker = TextChunker::new(50, 10);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail = tail_chars(&pair[0], 10);
            assert!(
                pair[1].starts_with(tail) || tail.is_empty(),
                "chunk {:?} should start with tail {:?}",
                pair[1],
                tail
            );
        }
    }

    #[test]
    fn test_all_content_preserved() {
        let chunker = TextChunker::new(60, 12);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);
        let chunks = chunker.split(&text);

        // Every non-overlap character appears in order; a cheap proxy is that
        // stripping each chunk's overlap prefix reconstructs the input.
        let mut rebuilt = chunks[0].clone();
        for pair in chunks.windows(2) {
            let tail = tail_chars(&pair[0], 12);
            let next = pair[1]
                .strip_prefix(tail)
                .unwrap_or(pair[1].as_str());
            rebuilt.push_str(next);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_prefers_blank_line_boundaries() {
        let chunker = TextChunker::new(40, 0);
        let text = "first paragraph here\n\nsecond paragraph here\n\nthird one";
        let chunks = chunker.split(&text);

        assert!(chunks.len() >= 2);
        assert!(chunks[0].starts_with("first paragraph"));
    }

    #[test]
    fn test_hard_split_of_unbreakable_run() {
        let chunker = TextChunker::new(32, 4);
        let text = "x".repeat(100);
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 32);
        }
    }

    #[test]
    fn test_multibyte_boundaries() {
        let chunker = TextChunker::new(20, 4);
        let text = "héllo wörld ünïcode ".repeat(10);
        // Must not panic on char boundaries
        let chunks = chunker.split(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.len() <= 20 + 4);
        }
    }

    #[test]
    fn test_tail_chars_char_boundary() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 10), "ab");
        // 'é' is 2 bytes; a 3-byte tail lands mid-char and must move forward
        let s = "aaéb";
        let tail = tail_chars(s, 3);
        assert!(s.ends_with(tail));
    }
}
