//! Inline grammar: text, escapes, formats, links, images, verbatim and macros.

use super::scan::{
    MacroScan, match_parameters_tag, match_verbatim, parse_parameter_list, scan_macro,
    skip_construct, starts_with,
};
use super::source::Source;
use crate::block::{
    Block, BlockKind, Format, MacroCall, Parameters, ResourceReference, ResourceType,
};
use crate::error::{ParseDiagnostics, ParseWarning};

/// Format markers in the order they are tried.
pub(crate) const FORMAT_MARKERS: [(&str, Format); 7] = [
    ("**", Format::Bold),
    ("//", Format::Italic),
    ("__", Format::Underlined),
    ("--", Format::StrikedOut),
    ("^^", Format::Superscript),
    (",,", Format::Subscript),
    ("##", Format::Monospace),
];

/// Type prefixes recognized at the start of a link reference.
const TYPED_PREFIXES: [&str; 4] = ["doc:", "url:", "mailto:", "attach:"];

const URL_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Characters that may appear in a free-standing URL.
pub(crate) fn is_url_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '~' | '[' | ']' | '{' | '}' | '|' | '<' | '>' | '"')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Format(&'static str),
    ParametersFormat,
    TableCell,
}

/// Collects characters into word, space, symbol and newline blocks.
#[derive(Default)]
struct Inline {
    blocks: Vec<Block>,
    word: String,
}

impl Inline {
    fn push_char(&mut self, c: char) {
        if c.is_alphanumeric() {
            self.word.push(c);
            return;
        }
        self.flush();
        self.blocks.push(Block::new(match c {
            ' ' => BlockKind::Space,
            '\n' => BlockKind::NewLine,
            other => BlockKind::SpecialSymbol(other),
        }));
    }

    fn push_block(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    fn flush(&mut self) {
        if !self.word.is_empty() {
            self.blocks
                .push(Block::word(std::mem::take(&mut self.word)));
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

pub(crate) struct InlineParser<'a> {
    source: &'a Source,
    chars: &'a [char],
    diagnostics: &'a mut ParseDiagnostics,
}

impl<'a> InlineParser<'a> {
    pub(crate) fn new(source: &'a Source, diagnostics: &'a mut ParseDiagnostics) -> Self {
        Self {
            source,
            chars: source.chars(),
            diagnostics,
        }
    }

    /// Parses `start..end` as inline content.
    pub(crate) fn parse(&mut self, start: usize, end: usize) -> Vec<Block> {
        let mut pos = start;
        self.parse_until(&mut pos, end, &[]).0
    }

    /// Parses one table cell, leaving `pos` on the next `|` or at `end`.
    pub(crate) fn parse_cell(&mut self, pos: &mut usize, end: usize) -> Vec<Block> {
        self.parse_until(pos, end, &[Stop::TableCell]).0
    }

    fn stop_matches(&self, stop: Stop, pos: usize, end: usize) -> bool {
        match stop {
            Stop::Format(marker) => starts_with(self.chars, pos, end, marker),
            Stop::ParametersFormat => starts_with(self.chars, pos, end, "(%%)"),
            Stop::TableCell => self.chars[pos] == '|',
        }
    }

    /// Parses until one of `stops` matches or `end`. The stop token is not
    /// consumed; the matching stop is returned.
    fn parse_until(
        &mut self,
        pos: &mut usize,
        end: usize,
        stops: &[Stop],
    ) -> (Vec<Block>, Option<Stop>) {
        let chars = self.chars;
        let mut out = Inline::default();
        while *pos < end {
            let i = *pos;
            if let Some(stop) = stops
                .iter()
                .rev()
                .find(|stop| self.stop_matches(**stop, i, end))
            {
                return (out.finish(), Some(*stop));
            }
            match chars[i] {
                '~' => {
                    if i + 1 < end {
                        out.push_char(chars[i + 1]);
                        *pos += 2;
                    } else {
                        out.push_char('~');
                        *pos += 1;
                    }
                }
                '\\' if starts_with(chars, i, end, "\\\\") => {
                    out.push_block(Block::new(BlockKind::NewLine));
                    *pos += 2;
                }
                '{' => self.read_brace(pos, end, &mut out),
                '[' if starts_with(chars, i, end, "[[") => match self.match_link(i, end) {
                    Some((block, after)) => {
                        out.push_block(block);
                        *pos = after;
                    }
                    None => {
                        out.push_char('[');
                        *pos += 1;
                    }
                },
                '(' if starts_with(chars, i, end, "(%") && !starts_with(chars, i, end, "(%%)") => {
                    match match_parameters_tag(chars, i, end) {
                        Some((parameters, after)) => {
                            *pos = after;
                            let mut nested = stops.to_vec();
                            nested.push(Stop::ParametersFormat);
                            let (children, stop) = self.parse_until(pos, end, &nested);
                            if stop == Some(Stop::ParametersFormat) {
                                *pos += 4;
                            }
                            out.push_block(
                                Block::format(Format::None, children).with_parameters(parameters),
                            );
                        }
                        None => {
                            out.push_char('(');
                            *pos += 1;
                        }
                    }
                }
                'h' if self.url_starts_at(i, end) => {
                    let after = self.url_end(i, end);
                    let url: String = chars[i..after].iter().collect();
                    out.push_block(Block::new(BlockKind::Link {
                        reference: ResourceReference::new(ResourceType::Url, url),
                        free_standing: true,
                    }));
                    *pos = after;
                }
                _ => {
                    if let Some((marker, format)) = FORMAT_MARKERS
                        .iter()
                        .find(|(marker, _)| starts_with(chars, i, end, marker))
                    {
                        self.read_format(pos, end, stops, *marker, *format, &mut out);
                    } else {
                        out.push_char(chars[i]);
                        *pos += 1;
                    }
                }
            }
        }
        (out.finish(), None)
    }

    fn read_brace(&mut self, pos: &mut usize, end: usize, out: &mut Inline) {
        let i = *pos;
        if starts_with(self.chars, i, end, "{{{") {
            match match_verbatim(self.chars, i, end) {
                Some((content, after)) => {
                    out.push_block(Block::new(BlockKind::VerbatimInline(content)));
                    *pos = after;
                }
                None => {
                    self.diagnostics
                        .add_warning(ParseWarning::UnterminatedVerbatim {
                            location: self.source.location(i),
                        });
                    for _ in 0..3 {
                        out.push_char('{');
                    }
                    *pos += 3;
                }
            }
            return;
        }
        match scan_macro(self.chars, i, end) {
            MacroScan::Complete(found) => {
                let call = MacroCall {
                    id: found.id,
                    content: found.content,
                    inline: true,
                };
                out.push_block(Block::macro_call(call, found.parameters));
                *pos = found.end;
            }
            MacroScan::Unclosed(id) => {
                self.diagnostics.add_warning(ParseWarning::UnclosedMacro {
                    location: self.source.location(i),
                    id,
                });
                out.push_char('{');
                out.push_char('{');
                *pos += 2;
            }
            MacroScan::NotAMacro => {
                out.push_char('{');
                *pos += 1;
            }
        }
    }

    fn read_format(
        &mut self,
        pos: &mut usize,
        end: usize,
        stops: &[Stop],
        marker: &'static str,
        format: Format,
        out: &mut Inline,
    ) {
        let open = *pos;
        let mark = self.diagnostics.warnings.len();
        *pos = open + 2;
        let mut nested = stops.to_vec();
        nested.push(Stop::Format(marker));
        let (children, stop) = self.parse_until(pos, end, &nested);
        if stop == Some(Stop::Format(marker)) {
            *pos += 2;
            out.push_block(Block::format(format, children));
            return;
        }
        // unclosed: the marker is literal text and its content is read again
        self.diagnostics.warnings.truncate(mark);
        *pos = open + 2;
        for c in marker.chars() {
            out.push_char(c);
        }
    }

    fn url_starts_at(&self, pos: usize, end: usize) -> bool {
        if pos > 0 && self.chars[pos - 1].is_alphanumeric() {
            return false;
        }
        URL_SCHEMES.iter().any(|scheme| {
            let scheme_len = scheme.chars().count();
            starts_with(self.chars, pos, end, scheme)
                && pos + scheme_len < end
                && is_url_char(self.chars[pos + scheme_len])
        })
    }

    fn url_end(&self, pos: usize, end: usize) -> usize {
        let mut after = pos;
        while after < end && is_url_char(self.chars[after]) {
            after += 1;
        }
        while after > pos && matches!(self.chars[after - 1], '.' | ',' | ';' | ':' | '!' | '?') {
            after -= 1;
        }
        after
    }

    fn find_token(&self, from: usize, to: usize, token: &str) -> Option<usize> {
        let mut i = from;
        while i < to {
            if starts_with(self.chars, i, to, token) {
                return Some(i);
            }
            i = skip_construct(self.chars, i, to).unwrap_or(i + 1);
        }
        None
    }

    /// `[[label>>reference||parameters]]`, `[[reference]]` or `[[image:reference]]`.
    fn match_link(&mut self, pos: usize, end: usize) -> Option<(Block, usize)> {
        let start = pos + 2;
        let close = self.find_token(start, end, "]]")?;
        let (label, target_start) = match self.find_token(start, close, ">>") {
            Some(separator) => (Some((start, separator)), separator + 2),
            None => (None, start),
        };
        let (target_end, parameters) = match self.find_token(target_start, close, "||") {
            Some(separator) => (
                separator,
                parse_parameter_list(self.chars, separator + 2, close)?,
            ),
            None => (close, Parameters::new()),
        };
        if target_start == target_end {
            return None;
        }

        let after = close + 2;
        if label.is_none() && starts_with(self.chars, target_start, target_end, "image:") {
            let reference = unescape(&self.chars[target_start + 6..target_end]);
            let kind = if reference.contains("://") {
                ResourceType::Url
            } else {
                ResourceType::Attach
            };
            let block = Block::new(BlockKind::Image {
                reference: ResourceReference::new(kind, reference),
                free_standing: false,
            })
            .with_parameters(parameters);
            return Some((block, after));
        }

        let reference = self.read_reference(target_start, target_end);
        let children = match label {
            Some((label_start, label_end)) => self.parse(label_start, label_end),
            None => Vec::new(),
        };
        let block = Block::new(BlockKind::Link {
            reference,
            free_standing: false,
        })
        .with_parameters(parameters)
        .with_children(children);
        Some((block, after))
    }

    fn read_reference(&self, start: usize, end: usize) -> ResourceReference {
        for prefix in TYPED_PREFIXES {
            if starts_with(self.chars, start, end, prefix) {
                let name = prefix.trim_end_matches(':');
                if let Some(kind) = ResourceType::from_prefix(name) {
                    let body = unescape(&self.chars[start + prefix.len()..end]);
                    return ResourceReference::typed(kind, body);
                }
            }
        }
        let reference = unescape(&self.chars[start..end]);
        let kind = if reference.contains("://") {
            ResourceType::Url
        } else {
            ResourceType::Doc
        };
        ResourceReference::new(kind, reference)
    }
}

/// Drops `~` escapes.
fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '~' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
