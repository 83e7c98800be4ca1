//! Normalized parser input with position lookup.

use crate::error::{ParseError, SourceLocation};

/// Input text with line endings normalized to `\n`, indexed by char.
pub(crate) struct Source {
    text: String,
    chars: Vec<char>,
    line_starts: Vec<usize>,
}

impl Source {
    /// Normalizes `\r\n` and `\r` to `\n` and rejects NUL characters.
    pub(crate) fn new(raw: &str) -> Result<Self, ParseError> {
        let text = raw.replace("\r\n", "\n").replace('\r', "\n");
        let chars: Vec<char> = text.chars().collect();
        let mut line_starts = vec![0];
        line_starts.extend(
            chars
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == '\n')
                .map(|(i, _)| i + 1),
        );
        let source = Self {
            text,
            chars,
            line_starts,
        };
        if let Some(pos) = source.chars.iter().position(|c| *c == '\0') {
            let location = source.location(pos);
            return Err(ParseError {
                message: "NUL character in input".to_string(),
                location,
            });
        }
        Ok(source)
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn chars(&self) -> &[char] {
        &self.chars
    }

    /// 1-indexed line and column of a char offset.
    pub(crate) fn location(&self, pos: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&pos) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        SourceLocation::new(line + 1, pos - self.line_starts[line] + 1)
    }
}
