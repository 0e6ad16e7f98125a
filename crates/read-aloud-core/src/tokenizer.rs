//! Whitespace tokenizer producing the immutable word sequence used for playback.

use crate::error::PlaybackError;
use std::ops::Range;

/// Ordered, non-empty-word sequence produced by one load operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    words: Vec<String>,
}

impl Document {
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    /// Space-joined text for a word range, clamped to the document.
    pub fn text_for(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.words.len());
        let start = range.start.min(end);
        self.words[start..end].join(" ")
    }
}

/// Split raw text on whitespace runs, keeping punctuation attached to words.
pub fn tokenize(raw_text: &str) -> Result<Document, PlaybackError> {
    let words: Vec<String> = raw_text.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return Err(PlaybackError::EmptyInput);
    }
    Ok(Document { words })
}
