use std::collections::VecDeque;

use super::error::DocumentError;
use super::types::{Chunk, Document};

/// Paragraph, line, sentence, word, then per-character cuts.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl SplitterConfig {
    #[must_use]
    pub fn with_sizes(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }
}

/// Recursive character splitter.
///
/// Text is cut on the first separator it contains; oversized pieces are cut
/// again with the remaining separators. Small pieces are then merged greedily
/// up to `chunk_size`, and each new chunk starts with the tail pieces of the
/// previous one (at most `chunk_overlap` characters).
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidSplitter`] if `chunk_size` is zero or
    /// `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(config: SplitterConfig) -> Result<Self, DocumentError> {
        if config.chunk_size == 0 {
            return Err(DocumentError::InvalidSplitter(
                "chunk_size must be greater than 0".into(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(DocumentError::InvalidSplitter(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: i,
            })
            .collect()
    }

    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let separators: Vec<&str> = self.config.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let chunk_size = self.config.chunk_size;

        let pos = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s));
        let (separator, rest) = match pos {
            Some(i) => (separators[i], &separators[i + 1..]),
            None => ("", &[][..]),
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) <= chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if rest.is_empty() {
                chunks.extend(hard_cut(piece, chunk_size));
            } else {
                chunks.extend(self.split_recursive(piece, rest));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Every piece is at most `chunk_size` characters long.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let SplitterConfig {
            chunk_size,
            chunk_overlap,
            ..
        } = self.config;

        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window);
                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_trimmed(&mut chunks, &window);
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_owned());
    }
}

fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split_inclusive(separator).collect()
    }
}

fn hard_cut(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|c| c.iter().collect::<String>().trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig::with_sizes(chunk_size, chunk_overlap)).unwrap()
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let err = TextSplitter::new(SplitterConfig::with_sizes(0, 0)).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidSplitter(_)));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(TextSplitter::new(SplitterConfig::with_sizes(100, 100)).is_err());
        assert!(TextSplitter::new(SplitterConfig::with_sizes(100, 150)).is_err());
        assert!(TextSplitter::new(SplitterConfig::with_sizes(100, 99)).is_ok());
    }

    #[test]
    fn empty_and_blank_documents_yield_nothing() {
        let s = TextSplitter::new(SplitterConfig::default()).unwrap();
        assert!(s.split(&Document::from_text("", "t")).is_empty());
        assert!(s.split(&Document::from_text(" \n\n \t", "t")).is_empty());
    }

    #[test]
    fn short_report_is_single_chunk() {
        let s = TextSplitter::new(SplitterConfig::default()).unwrap();
        let doc = Document::from_text("Patient has mild fever. No other symptoms noted.", "r.txt");
        let chunks = s.split(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].content,
            "Patient has mild fever. No other symptoms noted."
        );
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].metadata.source, "r.txt");
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = splitter(30, 0).split_text(text);
        assert_eq!(
            chunks,
            vec!["First paragraph here.", "Second paragraph here."]
        );
    }

    #[test]
    fn falls_back_to_sentences_then_words() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
        let chunks = splitter(20, 0).split_text(text);
        assert_eq!(
            chunks,
            vec!["Alpha beta gamma.", "Delta epsilon zeta.", "Eta theta iota."]
        );
    }

    #[test]
    fn long_word_is_cut_per_character() {
        let chunks = splitter(4, 0).split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn overlap_carries_trailing_words() {
        let text = "one two three four five six seven eight";
        let chunks = splitter(14, 6).split_text(text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').next_back().unwrap();
            assert!(
                pair[1].starts_with(last_word),
                "{:?} should start with {last_word:?}",
                pair[1]
            );
        }
    }

    #[test]
    fn measured_in_characters_not_bytes() {
        let text = "жар жар жар жар жар";
        let chunks = splitter(8, 0).split_text(text);
        assert_eq!(chunks, vec!["жар жар", "жар жар", "жар"]);
    }

    #[test]
    fn separators_without_empty_fall_back_to_hard_cut() {
        let s = TextSplitter::new(SplitterConfig {
            chunk_size: 3,
            chunk_overlap: 0,
            separators: vec!["\n".into()],
        })
        .unwrap();
        assert_eq!(s.split_text("abcdefg"), vec!["abc", "def", "g"]);
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let text = "word ".repeat(500);
        let chunks = TextSplitter::new(SplitterConfig::default())
            .unwrap()
            .split(&Document::from_text(text, "t"));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(300))]

            #[test]
            fn no_chunk_exceeds_size(
                content in "\\PC{0,3000}",
                chunk_size in 1usize..400,
                overlap_frac in 0usize..100,
            ) {
                let chunk_overlap = chunk_size * overlap_frac / 100;
                let s = TextSplitter::new(SplitterConfig::with_sizes(chunk_size, chunk_overlap)).unwrap();
                for chunk in s.split_text(&content) {
                    prop_assert!(chunk.chars().count() <= chunk_size);
                    prop_assert!(!chunk.is_empty());
                }
            }

            #[test]
            fn splitting_is_deterministic(
                content in "[a-z .\n]{0,2000}",
                chunk_size in 10usize..300,
            ) {
                let s = TextSplitter::new(SplitterConfig::with_sizes(chunk_size, chunk_size / 5)).unwrap();
                prop_assert_eq!(s.split_text(&content), s.split_text(&content));
            }

            #[test]
            fn every_word_survives(
                content in "[a-z]{1,8}( [a-z]{1,8}){0,120}",
                chunk_size in 10usize..200,
            ) {
                let s = TextSplitter::new(SplitterConfig::with_sizes(chunk_size, chunk_size / 4)).unwrap();
                let chunks = s.split_text(&content);
                for word in content.split(' ') {
                    prop_assert!(
                        chunks.iter().any(|c| c.split(' ').any(|w| w == word)),
                        "word {word:?} lost"
                    );
                }
            }
        }
    }
}
