//! `plain/1.0` parser: paragraphs of literal text.

use crate::block::Block;
use crate::error::{ParseDiagnostics, ParseError};
use crate::parser::Parser;
use crate::syntax::Syntax;
use crate::xdom::Xdom;
use crate::xwiki::source::Source;

/// Reads text as paragraphs separated by blank lines. Nothing is interpreted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainParser;

impl PlainParser {
    /// Creates the parser.
    pub fn new() -> Self {
        Self
    }
}

impl Parser for PlainParser {
    fn syntax(&self) -> Syntax {
        Syntax::PLAIN_1_0
    }

    fn parse_with_diagnostics(
        &self,
        text: &str,
    ) -> Result<(Xdom, ParseDiagnostics), ParseError> {
        let source = Source::new(text)?;
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        for line in source.text().split('\n') {
            if line.trim().is_empty() {
                if !paragraph.is_empty() {
                    blocks.push(Block::paragraph(Block::text(&paragraph.join("\n"))));
                    paragraph.clear();
                }
            } else {
                paragraph.push(line);
            }
        }
        if !paragraph.is_empty() {
            blocks.push(Block::paragraph(Block::text(&paragraph.join("\n"))));
        }
        let xdom = Xdom::from_blocks(blocks).with_syntax(Syntax::PLAIN_1_0);
        Ok((xdom, ParseDiagnostics::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let xdom = PlainParser::new()
            .parse("**not bold**\nsecond line\n  \n{{macro/}}")
            .unwrap();
        let blocks = xdom.to_blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text(), "**not bold**\nsecond line");
        assert_eq!(blocks[1].plain_text(), "{{macro/}}");
        assert!(
            blocks[1]
                .children
                .iter()
                .all(|b| !matches!(b.kind, BlockKind::Macro(_)))
        );
    }

    #[test]
    fn test_crlf_normalized() {
        let xdom = PlainParser::new().parse("a\r\nb").unwrap();
        assert_eq!(xdom.to_blocks()[0].plain_text(), "a\nb");
    }

    #[test]
    fn test_nul_is_fatal() {
        let err = PlainParser::new().parse("ok\n\0").unwrap_err();
        assert_eq!(err.location.line, 2);
        assert_eq!(err.location.column, 1);
    }
}
