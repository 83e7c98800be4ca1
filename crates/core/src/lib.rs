#![deny(missing_docs)]
//! Wikiflow core: syntax identifiers, the block tree and the wiki parsers.
//!
//! Parsing turns source text into an [`Xdom`]. Macro calls are recognized
//! but never executed here; expansion and rendering live in
//! `wikiflow-render`.

/// Block kinds and the detached block builder.
pub mod block;
/// Core error and diagnostic types.
pub mod error;
/// Header anchor id generation.
pub mod header_id;
/// Parser trait and registry.
pub mod parser;
/// `plain/1.0` parser.
pub mod plain;
/// Copy-on-write registry storage.
pub mod registry;
/// Syntax identifiers and the syntax registry.
pub mod syntax;
/// Arena document tree.
pub mod xdom;
/// `xwiki/2.1` parser.
pub mod xwiki;

pub use block::{
    Block, BlockKind, Format, ListKind, MacroCall, MetaData, Parameters, ResourceReference,
    ResourceType,
};
pub use error::{
    ParseDiagnostics, ParseError, ParseWarning, SourceLocation, WikiflowError, XdomError,
};
pub use header_id::{HeaderIdGenerator, header_id};
pub use parser::{Parser, ParserRegistry};
pub use plain::PlainParser;
pub use registry::CopyOnWrite;
pub use syntax::{Syntax, SyntaxRegistry};
pub use xdom::{BlockId, Xdom};
pub use xwiki::XWikiParser;
