//! Parser abstraction and the parser registry.

use crate::error::{ParseDiagnostics, ParseError, WikiflowError};
use crate::plain::PlainParser;
use crate::registry::CopyOnWrite;
use crate::syntax::Syntax;
use crate::xdom::Xdom;
use crate::xwiki::XWikiParser;
use std::collections::HashMap;
use std::sync::Arc;

/// Converts source text in one syntax into an [`Xdom`].
///
/// Parsers only recognize macro call syntax; they never execute macros.
pub trait Parser: Send + Sync {
    /// Syntax this parser reads.
    fn syntax(&self) -> Syntax;

    /// Parses `text`, collecting recoverable problems as warnings.
    fn parse_with_diagnostics(&self, text: &str)
    -> Result<(Xdom, ParseDiagnostics), ParseError>;

    /// Parses `text`.
    fn parse(&self, text: &str) -> Result<Xdom, ParseError> {
        self.parse_with_diagnostics(text).map(|(xdom, _)| xdom)
    }
}

/// Parsers keyed by syntax.
pub struct ParserRegistry {
    parsers: CopyOnWrite<HashMap<Syntax, Arc<dyn Parser>>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            parsers: CopyOnWrite::default(),
        }
    }

    /// Creates a registry with the `xwiki/2.1` and `plain/1.0` parsers.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(XWikiParser::new()));
        registry.register(Arc::new(PlainParser::new()));
        registry
    }

    /// Registers a parser under its own syntax, replacing any previous one.
    pub fn register(&self, parser: Arc<dyn Parser>) {
        let syntax = parser.syntax();
        log::debug!("registering parser for [{}]", syntax);
        self.parsers.update(|map| {
            map.insert(syntax, parser);
        });
    }

    /// Looks up the parser for `syntax`.
    pub fn get(&self, syntax: &Syntax) -> Result<Arc<dyn Parser>, WikiflowError> {
        self.parsers
            .load()
            .get(syntax)
            .cloned()
            .ok_or_else(|| WikiflowError::MissingParser(syntax.clone()))
    }

    /// Check if a parser exists for `syntax`
    pub fn has(&self, syntax: &Syntax) -> bool {
        self.parsers.load().contains_key(syntax)
    }

    /// Parses `text` with the parser registered for `syntax`.
    pub fn parse(&self, text: &str, syntax: &Syntax) -> Result<Xdom, WikiflowError> {
        let parser = self.get(syntax)?;
        Ok(parser.parse(text)?)
    }

    /// Syntaxes with a registered parser, sorted.
    pub fn syntaxes(&self) -> Vec<Syntax> {
        let mut syntaxes: Vec<_> = self.parsers.load().keys().cloned().collect();
        syntaxes.sort();
        syntaxes
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
