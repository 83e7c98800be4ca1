//! Block model: node kinds, parameters, metadata and the detached `Block` builder.
//!
//! A [`Block`] owns its children and is the form in which parsers build
//! trees and macros return their output. Once grafted into an
//! [`Xdom`](crate::Xdom) the same data lives in an arena with parent links.

use crate::syntax::Syntax;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Block parameters: unique names, order irrelevant.
pub type Parameters = BTreeMap<String, String>;

/// Inline formatting styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Format {
    /// `**bold**`
    Bold,
    /// `//italic//`
    Italic,
    /// `__underlined__`
    Underlined,
    /// `--striked out--`
    StrikedOut,
    /// `^^superscript^^`
    Superscript,
    /// `,,subscript,,`
    Subscript,
    /// `##monospace##`
    Monospace,
    /// Parameter-only span.
    None,
}

impl Format {
    /// Upper-case name used in event traces.
    pub fn name(self) -> &'static str {
        match self {
            Format::Bold => "BOLD",
            Format::Italic => "ITALIC",
            Format::Underlined => "UNDERLINED",
            Format::StrikedOut => "STRIKEDOUT",
            Format::Superscript => "SUPERSCRIPT",
            Format::Subscript => "SUBSCRIPT",
            Format::Monospace => "MONOSPACE",
            Format::None => "NONE",
        }
    }
}

/// Kind of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    /// `*` items.
    Bulleted,
    /// `1.` items.
    Numbered,
}

/// Type of resource a link or image points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    /// Wiki document.
    Doc,
    /// Absolute URL.
    Url,
    /// Email address.
    Mailto,
    /// Document attachment.
    Attach,
}

impl ResourceType {
    /// Prefix used in typed references, without the colon.
    pub fn prefix(self) -> &'static str {
        match self {
            ResourceType::Doc => "doc",
            ResourceType::Url => "url",
            ResourceType::Mailto => "mailto",
            ResourceType::Attach => "attach",
        }
    }

    /// Looks up a type by its prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "doc" => Some(ResourceType::Doc),
            "url" => Some(ResourceType::Url),
            "mailto" => Some(ResourceType::Mailto),
            "attach" => Some(ResourceType::Attach),
            _ => None,
        }
    }
}

/// Target of a link or image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    /// Resource type.
    pub kind: ResourceType,
    /// Reference string, without any type prefix.
    pub reference: String,
    /// Whether the source spelled the type prefix explicitly.
    pub typed: bool,
}

impl ResourceReference {
    /// Creates an untyped reference.
    pub fn new(kind: ResourceType, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            typed: false,
        }
    }

    /// Creates a reference whose prefix was written explicitly.
    pub fn typed(kind: ResourceType, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            typed: true,
        }
    }
}

/// A macro call as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroCall {
    /// Macro identifier.
    pub id: String,
    /// Raw, unparsed content; `None` for self-closing calls.
    pub content: Option<String>,
    /// Whether the call sits inside inline content.
    pub inline: bool,
}

impl MacroCall {
    /// Creates a call with no content.
    pub fn new(id: impl Into<String>, inline: bool) -> Self {
        Self {
            id: id.into(),
            content: None,
            inline,
        }
    }

    /// Sets the raw content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Key/value annotations carried by a `MetaData` block and inherited by its subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaData(BTreeMap<String, String>);

impl MetaData {
    /// Reference of the document the subtree came from.
    pub const SOURCE: &'static str = "source";
    /// Syntax the subtree was parsed from.
    pub const SYNTAX: &'static str = "syntax";
    /// Reference relative references resolve against.
    pub const BASE: &'static str = "base";
    /// Marks content that was written by hand rather than generated.
    pub const NON_GENERATED_CONTENT: &'static str = "non-generated-content";

    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets an entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds entries from `outer` that are not already set here.
    pub fn inherit(&mut self, outer: &MetaData) {
        for (key, value) in &outer.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// Closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum BlockKind {
    /// Document root.
    Document,
    /// Run of alphanumeric characters.
    Word(String),
    /// A single space.
    Space,
    /// A single non-alphanumeric character.
    SpecialSymbol(char),
    /// Line break inside inline content.
    NewLine,
    /// Literal text inside a paragraph.
    VerbatimInline(String),
    /// Literal text block.
    VerbatimStandalone(String),
    /// Paragraph of inline content.
    Paragraph,
    /// A header and the blocks it governs.
    Section,
    /// Header with level 1 to 6 and a generated anchor id.
    Header {
        /// Level, 1 to 6.
        level: u8,
        /// Anchor id.
        id: Option<String>,
    },
    /// Bulleted or numbered list.
    List(ListKind),
    /// List item: inline content, then nested lists.
    ListItem,
    /// Table.
    Table,
    /// Table row.
    TableRow,
    /// Table cell.
    TableCell {
        /// Head cell (`|=`).
        header: bool,
    },
    /// Link; children are the label.
    Link {
        /// Target.
        reference: ResourceReference,
        /// Bare URL in running text.
        free_standing: bool,
    },
    /// Image.
    Image {
        /// Target.
        reference: ResourceReference,
        /// Bare URL in running text.
        free_standing: bool,
    },
    /// Unexpanded macro call; parameters are the block parameters.
    Macro(MacroCall),
    /// Output of an expanded macro, remembering the call.
    MacroMarker(MacroCall),
    /// Generic container.
    Group,
    /// Metadata inherited by the subtree.
    MetaData(MetaData),
    /// Foreign-syntax fragment passed through as is.
    Raw {
        /// Raw text.
        content: String,
        /// Syntax of the fragment.
        syntax: Syntax,
    },
    /// Inline formatting.
    Format(Format),
    /// Horizontal rule.
    HorizontalLine,
}

impl BlockKind {
    /// Whether this kind belongs inside inline content.
    pub fn is_inline(&self) -> bool {
        match self {
            BlockKind::Word(_)
            | BlockKind::Space
            | BlockKind::SpecialSymbol(_)
            | BlockKind::NewLine
            | BlockKind::VerbatimInline(_)
            | BlockKind::Link { .. }
            | BlockKind::Image { .. }
            | BlockKind::Format(_) => true,
            BlockKind::Macro(call) | BlockKind::MacroMarker(call) => call.inline,
            _ => false,
        }
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Document => "document",
            BlockKind::Word(_) => "word",
            BlockKind::Space => "space",
            BlockKind::SpecialSymbol(_) => "specialSymbol",
            BlockKind::NewLine => "newLine",
            BlockKind::VerbatimInline(_) => "verbatimInline",
            BlockKind::VerbatimStandalone(_) => "verbatimStandalone",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Section => "section",
            BlockKind::Header { .. } => "header",
            BlockKind::List(_) => "list",
            BlockKind::ListItem => "listItem",
            BlockKind::Table => "table",
            BlockKind::TableRow => "tableRow",
            BlockKind::TableCell { .. } => "tableCell",
            BlockKind::Link { .. } => "link",
            BlockKind::Image { .. } => "image",
            BlockKind::Macro(_) => "macro",
            BlockKind::MacroMarker(_) => "macroMarker",
            BlockKind::Group => "group",
            BlockKind::MetaData(_) => "metaData",
            BlockKind::Raw { .. } => "raw",
            BlockKind::Format(_) => "format",
            BlockKind::HorizontalLine => "horizontalLine",
        }
    }
}

/// Detached block with owned children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Node kind.
    pub kind: BlockKind,
    /// Parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// Creates a leaf block.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            parameters: Parameters::new(),
            children: Vec::new(),
        }
    }

    /// Sets the children.
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    /// Adds one parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Replaces all parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// `Word` block.
    pub fn word(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Word(text.into()))
    }

    /// `Paragraph` wrapping inline children.
    pub fn paragraph(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Paragraph).with_children(children)
    }

    /// `Group` wrapping children.
    pub fn group(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Group).with_children(children)
    }

    /// `Format` wrapping inline children.
    pub fn format(format: Format, children: Vec<Block>) -> Self {
        Self::new(BlockKind::Format(format)).with_children(children)
    }

    /// `MetaData` wrapping children.
    pub fn metadata(metadata: MetaData, children: Vec<Block>) -> Self {
        Self::new(BlockKind::MetaData(metadata)).with_children(children)
    }

    /// `Macro` block for a call.
    pub fn macro_call(call: MacroCall, parameters: Parameters) -> Self {
        Self::new(BlockKind::Macro(call)).with_parameters(parameters)
    }

    /// Splits text into word, space, special symbol and newline blocks.
    pub fn text(text: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut word = String::new();
        for c in text.chars() {
            if c.is_alphanumeric() {
                word.push(c);
                continue;
            }
            if !word.is_empty() {
                blocks.push(Block::word(std::mem::take(&mut word)));
            }
            blocks.push(Block::new(match c {
                ' ' => BlockKind::Space,
                '\n' => BlockKind::NewLine,
                other => BlockKind::SpecialSymbol(other),
            }));
        }
        if !word.is_empty() {
            blocks.push(Block::word(word));
        }
        blocks
    }

    /// Gets a parameter value.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Concatenated text of word, space, symbol and verbatim descendants.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        collect_text(self, &mut text);
        text
    }
}

fn collect_text(block: &Block, buffer: &mut String) {
    match &block.kind {
        BlockKind::Word(word) => buffer.push_str(word),
        BlockKind::Space => buffer.push(' '),
        BlockKind::SpecialSymbol(c) => buffer.push(*c),
        BlockKind::NewLine => buffer.push('\n'),
        BlockKind::VerbatimInline(text) => buffer.push_str(text),
        _ => {
            for child in &block.children {
                collect_text(child, buffer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_split() {
        let blocks = Block::text("Hello, wiki!\nok");
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Word("Hello".into()),
                BlockKind::SpecialSymbol(','),
                BlockKind::Space,
                BlockKind::Word("wiki".into()),
                BlockKind::SpecialSymbol('!'),
                BlockKind::NewLine,
                BlockKind::Word("ok".into()),
            ]
        );
    }

    #[test]
    fn test_plain_text_of_nested_blocks() {
        let block = Block::paragraph(vec![
            Block::format(Format::Bold, Block::text("bold text")),
            Block::new(BlockKind::Space),
            Block::new(BlockKind::VerbatimInline("**raw**".into())),
        ]);
        assert_eq!(block.plain_text(), "bold text **raw**");
    }

    #[test]
    fn test_metadata_inherit_keeps_nearest() {
        let mut inner = MetaData::new().with(MetaData::SOURCE, "B");
        let outer = MetaData::new()
            .with(MetaData::SOURCE, "A")
            .with(MetaData::SYNTAX, "xwiki/2.1");
        inner.inherit(&outer);
        assert_eq!(inner.get(MetaData::SOURCE), Some("B"));
        assert_eq!(inner.get(MetaData::SYNTAX), Some("xwiki/2.1"));
    }

    #[test]
    fn test_inline_classification() {
        assert!(BlockKind::Space.is_inline());
        assert!(!BlockKind::Paragraph.is_inline());
        assert!(BlockKind::Macro(MacroCall::new("toc", true)).is_inline());
        assert!(!BlockKind::Macro(MacroCall::new("toc", false)).is_inline());
    }

    #[test]
    fn test_resource_prefixes() {
        for kind in [
            ResourceType::Doc,
            ResourceType::Url,
            ResourceType::Mailto,
            ResourceType::Attach,
        ] {
            assert_eq!(ResourceType::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(ResourceType::from_prefix("image"), None);
    }
}
