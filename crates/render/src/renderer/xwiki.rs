use super::Renderer;
use crate::error::RenderError;
use wikiflow_core::{
    Block, BlockKind, Format, ListKind, MacroCall, Parameters, ResourceReference, ResourceType,
    Syntax, Xdom,
};

/// Characters that start markup when written twice in a row.
const DOUBLED: [char; 12] = ['*', '/', '_', '-', '^', ',', '#', '[', ']', '{', '>', ')'];

/// Renders `xwiki/2.1` source that parses back to the same tree.
///
/// Sections and metadata are not written; the parser rebuilds sections
/// from the headers. Macro markers are written as the original call, so a
/// transformed document renders back to its source form. Text is escaped
/// with `~` only where the parser would otherwise see markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct XWikiRenderer;

impl XWikiRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for XWikiRenderer {
    fn syntax(&self) -> Syntax {
        Syntax::XWIKI_2_1
    }

    fn render(&self, xdom: &Xdom) -> Result<String, RenderError> {
        render_blocks(&xdom.to_block(xdom.root()).children)
    }
}

/// Where a run of inline content sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Paragraph,
    Header,
    ListItem,
    TableCell,
    /// Format or link label.
    Nested,
}

enum Piece {
    Symbol(char),
    LineBreak,
    Markup(String),
}

impl Piece {
    fn first_char(&self) -> Option<char> {
        match self {
            Piece::Symbol(c) => Some(*c),
            Piece::LineBreak => Some('\n'),
            Piece::Markup(markup) => markup.chars().next(),
        }
    }
}

fn render_blocks(blocks: &[Block]) -> Result<String, RenderError> {
    let mut rendered = Vec::new();
    collect_blocks(blocks, &mut rendered)?;
    Ok(rendered.join("\n\n"))
}

fn collect_blocks(blocks: &[Block], rendered: &mut Vec<String>) -> Result<(), RenderError> {
    let mut index = 0;
    while index < blocks.len() {
        let block = &blocks[index];
        match &block.kind {
            BlockKind::Document | BlockKind::Section | BlockKind::MetaData(_) => {
                collect_blocks(&block.children, rendered)?
            }
            kind if kind.is_inline() => {
                // stray inline blocks form one paragraph
                let start = index;
                while index + 1 < blocks.len() && blocks[index + 1].kind.is_inline() {
                    index += 1;
                }
                rendered.push(inline(&blocks[start..=index], Container::Paragraph, None, None)?);
            }
            _ => rendered.push(block_markup(block)?),
        }
        index += 1;
    }
    Ok(())
}

fn block_markup(block: &Block) -> Result<String, RenderError> {
    let markup = match &block.kind {
        BlockKind::Macro(call) | BlockKind::MacroMarker(call) => {
            return Ok(macro_call(call, &block.parameters));
        }
        BlockKind::Paragraph => inline(&block.children, Container::Paragraph, None, None)?,
        BlockKind::Header { level, .. } => {
            let marks = "=".repeat(usize::from((*level).clamp(1, 6)));
            let content = inline(&block.children, Container::Header, Some(' '), Some(' '))?;
            format!("{} {} {}", marks, content, marks)
        }
        BlockKind::HorizontalLine => "----".to_string(),
        BlockKind::List(_) => {
            let mut lines = Vec::new();
            list_lines(block, &mut Vec::new(), &mut lines)?;
            lines.join("\n")
        }
        BlockKind::Table => table(block)?,
        BlockKind::Group => format!("(((\n{}\n)))", render_blocks(&block.children)?),
        BlockKind::VerbatimStandalone(text) => ["{{{", &escape_verbatim(text), "}}}"].concat(),
        BlockKind::Raw { content, syntax } => raw(content, syntax)?,
        BlockKind::Document | BlockKind::Section | BlockKind::MetaData(_) => {
            render_blocks(&block.children)?
        }
        BlockKind::ListItem | BlockKind::TableRow | BlockKind::TableCell { .. } => {
            return Err(RenderError::UnexpectedBlock {
                kind: block.kind.name(),
                context: "block content",
            });
        }
        _ => inline(std::slice::from_ref(block), Container::Paragraph, None, None)?,
    };
    Ok(format!("{}{}", parameters_line(&block.parameters), markup))
}

fn parameters_line(parameters: &Parameters) -> String {
    if parameters.is_empty() {
        return String::new();
    }
    format!("(% {} %)\n", parameter_list(parameters))
}

/// `name="value"` pairs; `~` and `"` are escaped in values.
fn parameter_list(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(name, value)| {
            let mut pair = format!("{}=\"", name);
            for c in value.chars() {
                if matches!(c, '~' | '"') {
                    pair.push('~');
                }
                pair.push(c);
            }
            pair.push('"');
            pair
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn macro_call(call: &MacroCall, parameters: &Parameters) -> String {
    let mut markup = format!("{{{{{}", call.id);
    if !parameters.is_empty() {
        markup.push(' ');
        markup.push_str(&parameter_list(parameters));
    }
    match &call.content {
        None => markup.push_str("/}}"),
        Some(content) => {
            markup.push_str("}}");
            // the parser drops one newline on each side of multi-line content
            if content.contains('\n') {
                markup.push('\n');
                markup.push_str(content);
                markup.push('\n');
            } else {
                markup.push_str(content);
            }
            markup.push_str(&format!("{{{{/{}}}}}", call.id));
        }
    }
    markup
}

fn escape_verbatim(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '~' | '}') {
            escaped.push('~');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_reference(reference: &str) -> String {
    let mut escaped = String::with_capacity(reference.len());
    for c in reference.chars() {
        if matches!(c, '~' | ']' | '>' | '|' | '{') {
            escaped.push('~');
        }
        escaped.push(c);
    }
    escaped
}

fn reference_markup(reference: &ResourceReference) -> String {
    let inferred = if reference.reference.contains("://") {
        ResourceType::Url
    } else {
        ResourceType::Doc
    };
    let body = escape_reference(&reference.reference);
    if reference.typed || reference.kind != inferred {
        format!("{}:{}", reference.kind.prefix(), body)
    } else {
        body
    }
}

fn raw(content: &str, syntax: &Syntax) -> Result<String, RenderError> {
    if syntax.syntax_type() == Syntax::XWIKI_2_1.syntax_type() {
        Ok(content.to_string())
    } else {
        Err(RenderError::UnsupportedRawSyntax {
            syntax: syntax.clone(),
            target: Syntax::XWIKI_2_1,
        })
    }
}

fn list_marker(path: &[ListKind]) -> String {
    let mut marker: String = path
        .iter()
        .map(|kind| match kind {
            ListKind::Bulleted => '*',
            ListKind::Numbered => '1',
        })
        .collect();
    if path.last() == Some(&ListKind::Numbered) {
        marker.push('.');
    }
    marker.push(' ');
    marker
}

fn list_lines(
    list: &Block,
    path: &mut Vec<ListKind>,
    lines: &mut Vec<String>,
) -> Result<(), RenderError> {
    let BlockKind::List(kind) = list.kind else {
        return Err(RenderError::UnexpectedBlock {
            kind: list.kind.name(),
            context: "list item",
        });
    };
    path.push(kind);
    for item in &list.children {
        if item.kind != BlockKind::ListItem {
            return Err(RenderError::UnexpectedBlock {
                kind: item.kind.name(),
                context: "list",
            });
        }
        let split = item
            .children
            .iter()
            .position(|child| matches!(child.kind, BlockKind::List(_)))
            .unwrap_or(item.children.len());
        let (content, nested) = item.children.split_at(split);
        // an item holding only a nested list is implied by the deeper markers
        if !content.is_empty() || nested.is_empty() {
            let text = inline(content, Container::ListItem, Some(' '), None)?;
            lines.push(list_marker(path) + &text);
        }
        for child in nested {
            list_lines(child, path, lines)?;
        }
    }
    path.pop();
    Ok(())
}

fn table(block: &Block) -> Result<String, RenderError> {
    let mut rows = Vec::new();
    for row in &block.children {
        if row.kind != BlockKind::TableRow {
            return Err(RenderError::UnexpectedBlock {
                kind: row.kind.name(),
                context: "table",
            });
        }
        let mut line = String::new();
        for cell in &row.children {
            let BlockKind::TableCell { header } = cell.kind else {
                return Err(RenderError::UnexpectedBlock {
                    kind: cell.kind.name(),
                    context: "table row",
                });
            };
            line.push_str(if header { "|=" } else { "|" });
            line.push_str(&inline(&cell.children, Container::TableCell, None, None)?);
        }
        if !line.is_empty() {
            rows.push(line);
        }
    }
    Ok(rows.join("\n"))
}

/// Whether a newline before `next` can be written as a real line break.
fn breaks_line(next: Option<&Block>) -> bool {
    match next.map(|block| &block.kind) {
        Some(BlockKind::Word(_)) => true,
        Some(BlockKind::SpecialSymbol(c)) => !c.is_whitespace(),
        _ => false,
    }
}

fn inline(
    children: &[Block],
    container: Container,
    before: Option<char>,
    after: Option<char>,
) -> Result<String, RenderError> {
    let mut pieces = Vec::with_capacity(children.len());
    for (index, child) in children.iter().enumerate() {
        let piece = match &child.kind {
            BlockKind::SpecialSymbol(c) => Piece::Symbol(*c),
            BlockKind::NewLine
                if container == Container::Paragraph
                    && index > 0
                    && breaks_line(children.get(index + 1)) =>
            {
                Piece::LineBreak
            }
            _ => Piece::Markup(inline_markup(child)?),
        };
        pieces.push(piece);
    }

    let mut out = String::new();
    let mut line_starts = Vec::new();
    if container == Container::Paragraph {
        line_starts.push(0);
    }
    for (index, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Markup(markup) => out.push_str(markup),
            Piece::LineBreak => {
                let line_start = line_starts.last().copied().unwrap_or(0);
                if out[line_start..].trim().is_empty() {
                    out.push_str("\\\\");
                } else {
                    out.push('\n');
                    line_starts.push(out.len());
                }
            }
            Piece::Symbol(c) => {
                let prev = out.chars().next_back().or(before);
                let next = pieces[index + 1..]
                    .iter()
                    .find_map(Piece::first_char)
                    .or(after);
                if needs_escape(*c, prev, next, &out, container) {
                    out.push('~');
                }
                out.push(*c);
            }
        }
    }
    for start in line_starts.into_iter().rev() {
        if opens_block(&out[start..]) {
            out.insert(start, '~');
        }
    }
    Ok(out)
}

fn needs_escape(
    c: char,
    prev: Option<char>,
    next: Option<char>,
    out: &str,
    container: Container,
) -> bool {
    match c {
        '~' | '|' | '\\' => true,
        '=' => {
            container == Container::Header || (container == Container::TableCell && prev.is_none())
        }
        ':' => out.ends_with("http") || out.ends_with("https"),
        '(' => matches!(next, Some('(' | '%')) || prev == Some('('),
        _ => DOUBLED.contains(&c) && (prev == Some(c) || next == Some(c)),
    }
}

/// Whether a paragraph line starting with `line` would be read as a header or a list.
fn opens_block(line: &str) -> bool {
    if line.starts_with('=') {
        return true;
    }
    let marker_len = line
        .chars()
        .take_while(|c| matches!(c, '*' | '1'))
        .count();
    let tail = &line[marker_len..];
    match line[..marker_len].chars().last() {
        Some('1') => tail.starts_with(". "),
        Some(_) => tail.starts_with(' '),
        None => false,
    }
}

fn format_marker(format: Format) -> Option<&'static str> {
    match format {
        Format::Bold => Some("**"),
        Format::Italic => Some("//"),
        Format::Underlined => Some("__"),
        Format::StrikedOut => Some("--"),
        Format::Superscript => Some("^^"),
        Format::Subscript => Some(",,"),
        Format::Monospace => Some("##"),
        Format::None => None,
    }
}

fn inline_markup(block: &Block) -> Result<String, RenderError> {
    let markup = match &block.kind {
        BlockKind::Word(word) => word.clone(),
        BlockKind::Space => " ".to_string(),
        BlockKind::NewLine => "\\\\".to_string(),
        BlockKind::SpecialSymbol(c) => format!("~{}", c),
        BlockKind::VerbatimInline(text) | BlockKind::VerbatimStandalone(text) => {
            ["{{{", &escape_verbatim(text), "}}}"].concat()
        }
        BlockKind::Format(format) => {
            let body = match format_marker(*format) {
                Some(marker) => {
                    let content = inline(
                        &block.children,
                        Container::Nested,
                        marker.chars().next_back(),
                        marker.chars().next(),
                    )?;
                    [marker, &content, marker].concat()
                }
                None => inline(&block.children, Container::Nested, Some(')'), Some('('))?,
            };
            if *format == Format::None || !block.parameters.is_empty() {
                let open = if block.parameters.is_empty() {
                    "(% %)".to_string()
                } else {
                    format!("(% {} %)", parameter_list(&block.parameters))
                };
                format!("{}{}(%%)", open, body)
            } else {
                body
            }
        }
        BlockKind::Link {
            reference,
            free_standing,
        } => {
            let bare = *free_standing
                && block.children.is_empty()
                && block.parameters.is_empty()
                && reference.kind == ResourceType::Url
                && !reference.typed;
            if bare {
                reference.reference.clone()
            } else {
                let mut markup = String::from("[[");
                if !block.children.is_empty() {
                    markup.push_str(&inline(
                        &block.children,
                        Container::Nested,
                        Some('['),
                        Some('>'),
                    )?);
                    markup.push_str(">>");
                }
                markup.push_str(&reference_markup(reference));
                push_link_parameters(&mut markup, &block.parameters);
                markup.push_str("]]");
                markup
            }
        }
        BlockKind::Image { reference, .. } => {
            let mut markup = format!("[[image:{}", escape_reference(&reference.reference));
            push_link_parameters(&mut markup, &block.parameters);
            markup.push_str("]]");
            markup
        }
        BlockKind::Macro(call) | BlockKind::MacroMarker(call) => {
            macro_call(call, &block.parameters)
        }
        BlockKind::Raw { content, syntax } => raw(content, syntax)?,
        _ => {
            return Err(RenderError::UnexpectedBlock {
                kind: block.kind.name(),
                context: "inline content",
            });
        }
    };
    Ok(markup)
}

fn push_link_parameters(markup: &mut String, parameters: &Parameters) {
    if !parameters.is_empty() {
        markup.push_str("||");
        markup.push_str(&parameter_list(parameters));
    }
}
