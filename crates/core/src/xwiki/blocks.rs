//! Block grammar: paragraphs, headers, lists, tables, groups and standalone constructs.

use super::inline::InlineParser;
use super::scan::{
    MacroScan, at_line_end, is_blank_line, logical_line_end, match_parameters_tag,
    match_verbatim, physical_line_end, scan_macro, starts_with,
};
use super::source::Source;
use crate::block::{Block, BlockKind, ListKind, MacroCall, Parameters};
use crate::error::{ParseDiagnostics, ParseWarning};
use crate::header_id::HeaderIdGenerator;

pub(crate) struct BlockParser<'a> {
    source: &'a Source,
    chars: &'a [char],
    end: usize,
    pos: usize,
    diagnostics: ParseDiagnostics,
    header_ids: HeaderIdGenerator,
}

struct HeaderLine {
    level: u8,
    content_start: usize,
    content_end: usize,
    line_end: usize,
}

impl<'a> BlockParser<'a> {
    pub(crate) fn new(source: &'a Source) -> Self {
        let chars = source.chars();
        Self {
            source,
            chars,
            end: chars.len(),
            pos: 0,
            diagnostics: ParseDiagnostics::new(),
            header_ids: HeaderIdGenerator::new(),
        }
    }

    pub(crate) fn parse_document(mut self) -> (Vec<Block>, ParseDiagnostics) {
        let (blocks, _) = self.parse_blocks(false);
        (sectionize(blocks), self.diagnostics)
    }

    fn inline(&mut self, start: usize, end: usize) -> Vec<Block> {
        InlineParser::new(self.source, &mut self.diagnostics).parse(start, end)
    }

    fn consume_newline(&mut self) {
        if self.pos < self.end && self.chars[self.pos] == '\n' {
            self.pos += 1;
        }
    }

    fn skip_blank_lines(&mut self) {
        while self.pos < self.end && is_blank_line(self.chars, self.pos, self.end) {
            self.pos = physical_line_end(self.chars, self.pos, self.end);
            self.consume_newline();
        }
    }

    fn at_group_close(&self, pos: usize) -> bool {
        starts_with(self.chars, pos, self.end, ")))") && at_line_end(self.chars, pos + 3, self.end)
    }

    /// Parses blocks until the end of input, or until `)))` when inside a group.
    /// The flag reports whether the group was closed.
    fn parse_blocks(&mut self, in_group: bool) -> (Vec<Block>, bool) {
        let mut blocks = Vec::new();
        let mut pending: Option<Parameters> = None;
        loop {
            self.skip_blank_lines();
            if self.pos >= self.end {
                return (blocks, false);
            }
            if in_group && self.at_group_close(self.pos) {
                self.pos += 3;
                self.consume_newline();
                return (blocks, true);
            }
            if let Some((parameters, after)) = match_parameters_tag(self.chars, self.pos, self.end)
                && at_line_end(self.chars, after, self.end)
            {
                pending.get_or_insert_with(Parameters::new).extend(parameters);
                self.pos = after;
                self.consume_newline();
                continue;
            }

            let start = self.pos;
            let mut block = self.parse_block(in_group);
            if let Some(parameters) = pending.take() {
                if matches!(block.kind, BlockKind::Macro(_)) {
                    self.diagnostics.add_warning(ParseWarning::SuspiciousMarkup {
                        location: self.source.location(start),
                        message: "block parameters before a macro call are ignored".into(),
                    });
                } else {
                    block.parameters.extend(parameters);
                }
            }
            blocks.push(block);
            self.consume_newline();
        }
    }

    fn parse_block(&mut self, in_group: bool) -> Block {
        if let Some(block) = self.standalone_verbatim() {
            return block;
        }
        if let Some(block) = self.standalone_macro() {
            return block;
        }
        if let Some(block) = self.group() {
            return block;
        }
        if let Some(header) = self.match_header(self.pos) {
            return self.header(header);
        }
        if let Some(line_end) = self.match_horizontal_line(self.pos) {
            self.pos = line_end;
            return Block::new(BlockKind::HorizontalLine);
        }
        if let Some(block) = self.list() {
            return block;
        }
        if let Some(block) = self.table() {
            return block;
        }
        self.paragraph(in_group)
    }

    fn standalone_verbatim(&mut self) -> Option<Block> {
        let (content, after) = match_verbatim(self.chars, self.pos, self.end)?;
        if !at_line_end(self.chars, after, self.end) {
            return None;
        }
        self.pos = after;
        Some(Block::new(BlockKind::VerbatimStandalone(content)))
    }

    fn standalone_macro(&mut self) -> Option<Block> {
        let MacroScan::Complete(found) = scan_macro(self.chars, self.pos, self.end) else {
            return None;
        };
        if !at_line_end(self.chars, found.end, self.end) {
            return None;
        }
        self.pos = found.end;
        let call = MacroCall {
            id: found.id,
            content: found.content,
            inline: false,
        };
        Some(Block::macro_call(call, found.parameters))
    }

    fn group(&mut self) -> Option<Block> {
        let open = self.pos;
        if !starts_with(self.chars, open, self.end, "(((")
            || !at_line_end(self.chars, open + 3, self.end)
        {
            return None;
        }
        if !self.group_is_closed(open) {
            self.diagnostics.add_warning(ParseWarning::UnclosedGroup {
                location: self.source.location(open),
            });
            return None;
        }
        let ids = self.header_ids.clone();
        let mark = self.diagnostics.warnings.len();
        self.pos = open + 3;
        self.consume_newline();
        let (children, closed) = self.parse_blocks(true);
        if closed {
            // leave pos on the newline that followed `)))`
            if self.pos > 0 && self.chars[self.pos - 1] == '\n' {
                self.pos -= 1;
            }
            return Some(Block::group(sectionize(children)));
        }
        self.header_ids = ids;
        self.diagnostics.warnings.truncate(mark);
        self.diagnostics.add_warning(ParseWarning::UnclosedGroup {
            location: self.source.location(open),
        });
        self.pos = open;
        None
    }

    fn match_header(&self, pos: usize) -> Option<HeaderLine> {
        let chars = self.chars;
        let line_end = logical_line_end(chars, pos, self.end);
        let mut i = pos;
        while i < line_end && chars[i] == '=' {
            i += 1;
        }
        let level = i - pos;
        if level == 0 || level > 6 {
            return None;
        }
        while i < line_end && matches!(chars[i], ' ' | '\t') {
            i += 1;
        }
        let content_start = i;
        let mut k = line_end;
        while k > content_start && matches!(chars[k - 1], ' ' | '\t') {
            k -= 1;
        }
        while k > content_start && chars[k - 1] == '=' && !is_escaped(chars, k - 1, content_start) {
            k -= 1;
        }
        while k > content_start && matches!(chars[k - 1], ' ' | '\t') {
            k -= 1;
        }
        if k == content_start {
            return None;
        }
        Some(HeaderLine {
            level: level as u8,
            content_start,
            content_end: k,
            line_end,
        })
    }

    fn header(&mut self, line: HeaderLine) -> Block {
        let children = self.inline(line.content_start, line.content_end);
        let text = Block::paragraph(children.clone()).plain_text();
        let id = self.header_ids.generate(&text);
        self.pos = line.line_end;
        Block::new(BlockKind::Header {
            level: line.level,
            id: Some(id),
        })
        .with_children(children)
    }

    fn match_horizontal_line(&self, pos: usize) -> Option<usize> {
        let line_end = physical_line_end(self.chars, pos, self.end);
        let dashes = self.chars[pos..line_end]
            .iter()
            .take_while(|c| **c == '-')
            .count();
        let rest_blank = self.chars[pos + dashes..line_end]
            .iter()
            .all(|c| matches!(c, ' ' | '\t'));
        (dashes >= 4 && rest_blank).then_some(line_end)
    }

    /// `*`, `1.`, `**`, `*1.` ... followed by a space.
    fn match_list_marker(&self, pos: usize) -> Option<(Vec<ListKind>, usize)> {
        let chars = self.chars;
        let mut i = pos;
        let mut path = Vec::new();
        while i < self.end && matches!(chars[i], '*' | '1') {
            path.push(if chars[i] == '*' {
                ListKind::Bulleted
            } else {
                ListKind::Numbered
            });
            i += 1;
        }
        let last = *path.last()?;
        if last == ListKind::Numbered {
            if i >= self.end || chars[i] != '.' {
                return None;
            }
            i += 1;
        }
        if i >= self.end || chars[i] != ' ' {
            return None;
        }
        Some((path, i + 1))
    }

    fn list(&mut self) -> Option<Block> {
        let mut items: Vec<(Vec<ListKind>, Vec<Block>)> = Vec::new();
        while let Some((path, content_start)) = self.match_list_marker(self.pos) {
            if let Some((first, _)) = items.first()
                && first[0] != path[0]
            {
                break;
            }
            let line_end = logical_line_end(self.chars, content_start, self.end);
            let content = self.inline(content_start, line_end);
            items.push((path, content));
            self.pos = line_end;
            let next = line_end + 1;
            if line_end < self.end
                && self
                    .match_list_marker(next)
                    .is_some_and(|(path, _)| path[0] == items[0].0[0])
            {
                self.pos = next;
            } else {
                break;
            }
        }
        if items.is_empty() {
            return None;
        }
        let mut index = 0;
        Some(build_list(&mut items, &mut index, 0))
    }

    fn table(&mut self) -> Option<Block> {
        if self.chars[self.pos] != '|' {
            return None;
        }
        let mut rows = Vec::new();
        loop {
            let line_end = logical_line_end(self.chars, self.pos, self.end);
            let mut cells = Vec::new();
            let mut i = self.pos;
            while i < line_end && self.chars[i] == '|' {
                i += 1;
                let header = i < line_end && self.chars[i] == '=';
                if header {
                    i += 1;
                }
                let content =
                    InlineParser::new(self.source, &mut self.diagnostics).parse_cell(&mut i, line_end);
                cells.push(
                    Block::new(BlockKind::TableCell { header }).with_children(content),
                );
            }
            rows.push(Block::new(BlockKind::TableRow).with_children(cells));
            self.pos = line_end;
            if line_end + 1 < self.end && self.chars[line_end + 1] == '|' {
                self.pos = line_end + 1;
            } else {
                break;
            }
        }
        Some(Block::new(BlockKind::Table).with_children(rows))
    }

    /// Whether the line at `pos` opens a construct that ends a paragraph.
    /// Whether the group opening at `open` has a matching `)))` line, counting
    /// nested group lines and stepping over multi-line constructs.
    fn group_is_closed(&self, open: usize) -> bool {
        let mut depth = 1usize;
        let mut line = logical_line_end(self.chars, open, self.end);
        while line < self.end {
            let start = line + 1;
            if self.at_group_close(start) {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            } else if starts_with(self.chars, start, self.end, "(((")
                && at_line_end(self.chars, start + 3, self.end)
            {
                depth += 1;
            }
            line = logical_line_end(self.chars, start, self.end);
        }
        false
    }

    fn starts_block(&self, pos: usize, in_group: bool) -> bool {
        let chars = self.chars;
        self.match_header(pos).is_some()
            || self.match_horizontal_line(pos).is_some()
            || self.match_list_marker(pos).is_some()
            || chars[pos] == '|'
            || (starts_with(chars, pos, self.end, "(((") && at_line_end(chars, pos + 3, self.end))
            || (in_group && self.at_group_close(pos))
    }

    fn paragraph_end(&self, start: usize, in_group: bool) -> usize {
        let mut i = start;
        loop {
            let line_end = logical_line_end(self.chars, i, self.end);
            let next = line_end + 1;
            if next >= self.end
                || is_blank_line(self.chars, next, self.end)
                || self.starts_block(next, in_group)
            {
                return line_end;
            }
            i = next;
        }
    }

    fn paragraph(&mut self, in_group: bool) -> Block {
        let end = self.paragraph_end(self.pos, in_group);
        let children = self.inline(self.pos, end);
        self.pos = end;
        Block::paragraph(children)
    }
}

/// Whether the char at `index` is preceded by an odd run of `~`.
fn is_escaped(chars: &[char], index: usize, lower: usize) -> bool {
    let mut tildes = 0;
    let mut i = index;
    while i > lower && chars[i - 1] == '~' {
        tildes += 1;
        i -= 1;
    }
    tildes % 2 == 1
}

/// Builds one list at `depth` from consecutive items, nesting deeper items.
fn build_list(
    items: &mut [(Vec<ListKind>, Vec<Block>)],
    index: &mut usize,
    depth: usize,
) -> Block {
    let kind = items[*index].0[depth];
    let mut list_items = Vec::new();
    while *index < items.len() {
        let path_len = items[*index].0.len();
        if path_len <= depth || (path_len == depth + 1 && items[*index].0[depth] != kind) {
            break;
        }
        let mut item = Block::new(BlockKind::ListItem);
        if path_len == depth + 1 {
            item.children = std::mem::take(&mut items[*index].1);
            *index += 1;
        }
        while *index < items.len() && items[*index].0.len() > depth + 1 {
            item.children.push(build_list(items, index, depth + 1));
        }
        list_items.push(item);
    }
    Block::new(BlockKind::List(kind)).with_children(list_items)
}

/// Wraps each header and the blocks that follow it, up to the next header of
/// the same or a higher level, into a `Section`.
pub(crate) fn sectionize(blocks: Vec<Block>) -> Vec<Block> {
    let mut out = Vec::new();
    let mut open: Vec<(u8, Block)> = Vec::new();

    fn close_one(open: &mut Vec<(u8, Block)>, out: &mut Vec<Block>) {
        if let Some((_, section)) = open.pop() {
            match open.last_mut() {
                Some((_, parent)) => parent.children.push(section),
                None => out.push(section),
            }
        }
    }

    for block in blocks {
        if let BlockKind::Header { level, .. } = block.kind {
            while open.last().is_some_and(|(open_level, _)| *open_level >= level) {
                close_one(&mut open, &mut out);
            }
            open.push((level, Block::new(BlockKind::Section).with_children(vec![block])));
        } else {
            match open.last_mut() {
                Some((_, section)) => section.children.push(block),
                None => out.push(block),
            }
        }
    }
    while !open.is_empty() {
        close_one(&mut open, &mut out);
    }
    out
}
