//! `xwiki/2.1` parser.
//!
//! The block grammar lives in `blocks`, inline content in `inline`, and the
//! shared low-level matchers in `scan`. Malformed markup never fails the
//! parse: an unclosed construct is read as literal text and reported as a
//! [`ParseWarning`](crate::ParseWarning).

mod blocks;
mod inline;
mod scan;
pub(crate) mod source;

use crate::error::{ParseDiagnostics, ParseError};
use crate::parser::Parser;
use crate::syntax::Syntax;
use crate::xdom::Xdom;
use blocks::BlockParser;
use source::Source;

/// Parser for XWiki 2.1 syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct XWikiParser;

impl XWikiParser {
    /// Creates the parser.
    pub fn new() -> Self {
        Self
    }
}

impl Parser for XWikiParser {
    fn syntax(&self) -> Syntax {
        Syntax::XWIKI_2_1
    }

    fn parse_with_diagnostics(
        &self,
        text: &str,
    ) -> Result<(Xdom, ParseDiagnostics), ParseError> {
        let source = Source::new(text)?;
        let (blocks, diagnostics) = BlockParser::new(&source).parse_document();
        log::trace!(
            "parsed {} top-level blocks with {} warnings",
            blocks.len(),
            diagnostics.count()
        );
        Ok((
            Xdom::from_blocks(blocks).with_syntax(Syntax::XWIKI_2_1),
            diagnostics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockKind, Format, ListKind, MacroCall};
    use crate::error::ParseWarning;
    use std::time::{Duration, Instant};

    fn parse(text: &str) -> Vec<Block> {
        XWikiParser::new().parse(text).unwrap().to_blocks()
    }

    fn kinds(blocks: &[Block]) -> Vec<&'static str> {
        blocks.iter().map(|b| b.kind.name()).collect()
    }

    fn outline(blocks: &[Block]) -> String {
        fn walk(block: &Block, depth: usize, lines: &mut Vec<String>) {
            let mut line = format!("{}{}", "  ".repeat(depth), block.kind.name());
            if let BlockKind::Word(word) = &block.kind {
                line.push(' ');
                line.push_str(word);
            }
            lines.push(line);
            for child in &block.children {
                walk(child, depth + 1, lines);
            }
        }
        let mut lines = Vec::new();
        for block in blocks {
            walk(block, 0, &mut lines);
        }
        lines.join("\n")
    }

    #[test]
    fn test_document_outline() {
        let blocks = parse("= Title =\n* a **b**");
        insta::assert_snapshot!(outline(&blocks), @r"
        section
          header
            word Title
          list
            listItem
              word a
              space
              format
                word b
        ");
    }

    #[test]
    fn test_paragraphs_and_blank_lines() {
        let blocks = parse("first line\nsecond\n\n\nnext");
        assert_eq!(kinds(&blocks), vec!["paragraph", "paragraph"]);
        assert_eq!(blocks[0].plain_text(), "first line\nsecond");
        assert_eq!(blocks[1].plain_text(), "next");
    }

    #[test]
    fn test_headers_open_sections() {
        let blocks = parse("= Title =\nintro\n== Sub ==\nbody\n= Next =");
        assert_eq!(kinds(&blocks), vec!["section", "section"]);
        let first = &blocks[0];
        assert_eq!(kinds(&first.children), vec!["header", "paragraph", "section"]);
        assert_eq!(
            first.children[0].kind,
            BlockKind::Header {
                level: 1,
                id: Some("HTitle".into())
            }
        );
        assert_eq!(first.children[2].children[0].plain_text(), "Sub");
    }

    #[test]
    fn test_header_escaped_trailing_equals() {
        let blocks = parse("== a ~= ==");
        let header = &blocks[0].children[0];
        assert_eq!(header.plain_text(), "a =");
    }

    #[test]
    fn test_duplicate_header_ids() {
        let blocks = parse("= Intro =\n\n= Intro =");
        let ids: Vec<_> = blocks
            .iter()
            .map(|section| match &section.children[0].kind {
                BlockKind::Header { id, .. } => id.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![Some("HIntro".into()), Some("HIntro-1".into())]);
    }

    #[test]
    fn test_nested_lists() {
        let blocks = parse("* one\n** one.a\n* two\n*1. inner");
        assert_eq!(kinds(&blocks), vec!["list"]);
        let list = &blocks[0];
        assert_eq!(list.kind, BlockKind::List(ListKind::Bulleted));
        assert_eq!(list.children.len(), 2);
        assert_eq!(kinds(&list.children[0].children), vec!["word", "list"]);
        assert_eq!(
            list.children[1].children[1].kind,
            BlockKind::List(ListKind::Numbered)
        );
    }

    #[test]
    fn test_list_kind_change_starts_new_list() {
        let blocks = parse("* a\n1. b");
        assert_eq!(kinds(&blocks), vec!["list", "list"]);
    }

    #[test]
    fn test_table() {
        let blocks = parse("|=A|=B\n|1|**2**");
        let table = &blocks[0];
        assert_eq!(table.kind, BlockKind::Table);
        assert_eq!(table.children.len(), 2);
        assert_eq!(
            table.children[0].children[0].kind,
            BlockKind::TableCell { header: true }
        );
        let cell = &table.children[1].children[1];
        assert_eq!(cell.kind, BlockKind::TableCell { header: false });
        assert_eq!(cell.children[0].kind, BlockKind::Format(Format::Bold));
    }

    #[test]
    fn test_standalone_and_inline_macros() {
        let blocks = parse("{{toc/}}\n\ntext {{info}}x{{/info}}");
        assert_eq!(
            blocks[0].kind,
            BlockKind::Macro(MacroCall::new("toc", false))
        );
        let paragraph = &blocks[1];
        assert_eq!(
            paragraph.children[2].kind,
            BlockKind::Macro(MacroCall::new("info", true).with_content("x"))
        );
    }

    #[test]
    fn test_adjacent_macro_lines_stay_standalone() {
        let blocks = parse("{{bold}}hi{{/bold}}\n{{unknownMacro/}}");
        assert_eq!(kinds(&blocks), vec!["macro", "macro"]);
    }

    #[test]
    fn test_multiline_macro_content() {
        let blocks = parse("{{code language=\"rust\"}}\nfn main() {}\n\nlet x;\n{{/code}}");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].parameter("language"), Some("rust"));
        match &blocks[0].kind {
            BlockKind::Macro(call) => {
                assert_eq!(call.content.as_deref(), Some("fn main() {}\n\nlet x;"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_group_and_block_parameters() {
        let blocks = parse("(% class=\"box\" %)\n(((\n= Inside =\ntext\n)))\nafter");
        assert_eq!(kinds(&blocks), vec!["group", "paragraph"]);
        assert_eq!(blocks[0].parameter("class"), Some("box"));
        assert_eq!(kinds(&blocks[0].children), vec!["section"]);
    }

    #[test]
    fn test_unclosed_group_is_paragraph_with_warning() {
        let (xdom, diagnostics) = XWikiParser::new()
            .parse_with_diagnostics("(((\ntext")
            .unwrap();
        let blocks = xdom.to_blocks();
        assert_eq!(kinds(&blocks), vec!["paragraph"]);
        assert_eq!(blocks[0].plain_text(), "(((\ntext");
        assert!(matches!(
            diagnostics.warnings.as_slice(),
            [ParseWarning::UnclosedGroup { .. }]
        ));
    }

    #[test]
    fn test_many_unclosed_macros_parse_quickly() {
        let text = "{{a}}".repeat(1000);
        let start = Instant::now();
        let (xdom, diagnostics) = XWikiParser::new().parse_with_diagnostics(&text).unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));

        let blocks = xdom.to_blocks();
        assert_eq!(kinds(&blocks), vec!["paragraph"]);
        assert_eq!(blocks[0].plain_text(), text);
        assert_eq!(diagnostics.warnings.len(), 1000);
    }

    #[test]
    fn test_many_unclosed_groups_parse_quickly() {
        let text = "(((\n".repeat(1000);
        let start = Instant::now();
        let (xdom, diagnostics) = XWikiParser::new().parse_with_diagnostics(&text).unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));

        let blocks = xdom.to_blocks();
        assert!(kinds(&blocks).iter().all(|kind| *kind == "paragraph"));
        let plain: String = blocks.iter().map(Block::plain_text).collect();
        assert_eq!(plain.matches("(((").count(), 1000);
        assert_eq!(diagnostics.warnings.len(), 1000);
        assert!(
            diagnostics
                .warnings
                .iter()
                .all(|warning| matches!(warning, ParseWarning::UnclosedGroup { .. }))
        );
    }

    #[test]
    fn test_unclosed_outer_group_keeps_closed_inner_group() {
        let (xdom, diagnostics) = XWikiParser::new()
            .parse_with_diagnostics("(((\n(((\ninner\n)))")
            .unwrap();
        let blocks = xdom.to_blocks();
        assert_eq!(kinds(&blocks), vec!["paragraph", "group"]);
        assert_eq!(blocks[1].plain_text(), "inner");
        assert!(matches!(
            diagnostics.warnings.as_slice(),
            [ParseWarning::UnclosedGroup { .. }]
        ));
    }

    #[test]
    fn test_horizontal_line_and_verbatim() {
        let blocks = parse("----\n{{{\n**raw**\n}}}");
        assert_eq!(kinds(&blocks), vec!["horizontalLine", "verbatimStandalone"]);
        assert_eq!(
            blocks[1].kind,
            BlockKind::VerbatimStandalone("\n**raw**\n".into())
        );
    }

    #[test]
    fn test_nul_is_fatal() {
        let err = XWikiParser::new().parse("a\0").unwrap_err();
        assert_eq!(err.location.column, 2);
    }

    #[test]
    fn test_syntax_is_recorded() {
        let xdom = XWikiParser::new().parse("x").unwrap();
        assert_eq!(xdom.syntax(), Some(&Syntax::XWIKI_2_1));
    }
}
