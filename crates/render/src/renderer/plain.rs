use super::Renderer;
use crate::error::RenderError;
use wikiflow_core::{Block, BlockKind, Syntax, Xdom};

/// Renders the text content only.
///
/// Block-level pieces are separated by a blank line, list items and table
/// rows by a newline and table cells by a tab. Links without a label show
/// their reference. Images, unexpanded macros and non-plain raw content
/// produce nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRenderer;

impl PlainRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PlainRenderer {
    fn syntax(&self) -> Syntax {
        Syntax::PLAIN_1_0
    }

    fn render(&self, xdom: &Xdom) -> Result<String, RenderError> {
        let root = xdom.to_block(xdom.root());
        let mut pieces = Vec::new();
        for child in &root.children {
            collect_pieces(child, &mut pieces);
        }
        pieces.retain(|piece| !piece.is_empty());
        Ok(pieces.join("\n\n"))
    }
}

fn collect_pieces(block: &Block, pieces: &mut Vec<String>) {
    match &block.kind {
        BlockKind::Document | BlockKind::Section | BlockKind::MetaData(_) | BlockKind::Group => {
            for child in &block.children {
                collect_pieces(child, pieces);
            }
        }
        BlockKind::MacroMarker(call) if !call.inline => {
            for child in &block.children {
                collect_pieces(child, pieces);
            }
        }
        BlockKind::List(_) => {
            let mut lines = Vec::new();
            list_lines(block, &mut lines);
            pieces.push(lines.join("\n"));
        }
        BlockKind::Table => {
            let rows: Vec<String> = block
                .children
                .iter()
                .map(|row| {
                    row.children
                        .iter()
                        .map(|cell| inline_text(&cell.children))
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect();
            pieces.push(rows.join("\n"));
        }
        BlockKind::VerbatimStandalone(text) => pieces.push(text.clone()),
        BlockKind::HorizontalLine | BlockKind::Macro(_) => {}
        _ => pieces.push(inline_text([block])),
    }
}

fn list_lines(list: &Block, lines: &mut Vec<String>) {
    for item in &list.children {
        let (nested, content): (Vec<&Block>, Vec<&Block>) = item
            .children
            .iter()
            .partition(|child| matches!(child.kind, BlockKind::List(_)));
        if !content.is_empty() {
            lines.push(inline_text(content));
        }
        for list in nested {
            list_lines(list, lines);
        }
    }
}

fn inline_text<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    let mut text = String::new();
    for block in blocks {
        push_inline(block, &mut text);
    }
    text
}

fn push_inline(block: &Block, text: &mut String) {
    match &block.kind {
        BlockKind::Word(word) => text.push_str(word),
        BlockKind::Space => text.push(' '),
        BlockKind::SpecialSymbol(c) => text.push(*c),
        BlockKind::NewLine => text.push('\n'),
        BlockKind::VerbatimInline(verbatim) | BlockKind::VerbatimStandalone(verbatim) => {
            text.push_str(verbatim)
        }
        BlockKind::Link { reference, .. } if block.children.is_empty() => {
            text.push_str(&reference.reference)
        }
        BlockKind::Raw { content, syntax } if syntax.syntax_type() == "plain" => {
            text.push_str(content)
        }
        BlockKind::Raw { .. } | BlockKind::Image { .. } | BlockKind::Macro(_) => {}
        _ => {
            for child in &block.children {
                push_inline(child, text);
            }
        }
    }
}
