//! Syntax identifiers and the syntax registry.

use crate::WikiflowError;
use crate::registry::CopyOnWrite;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A markup dialect, identified by `type/version`.
///
/// Equality, ordering and hashing are by value, so a syntax built from
/// owned strings compares equal to one of the built-in constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Syntax {
    syntax_type: Cow<'static, str>,
    version: Cow<'static, str>,
}

impl Syntax {
    /// XWiki 2.1 wiki syntax.
    pub const XWIKI_2_1: Syntax = Syntax::from_static("xwiki", "2.1");
    /// Plain text.
    pub const PLAIN_1_0: Syntax = Syntax::from_static("plain", "1.0");
    /// XHTML 1.0 output.
    pub const XHTML_1_0: Syntax = Syntax::from_static("xhtml", "1.0");
    /// Structural event trace, used for testing.
    pub const EVENT_1_0: Syntax = Syntax::from_static("event", "1.0");

    /// Creates a syntax from owned parts.
    pub fn new(syntax_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            syntax_type: Cow::Owned(syntax_type.into()),
            version: Cow::Owned(version.into()),
        }
    }

    /// Creates a syntax from static parts (usable in constants).
    pub const fn from_static(syntax_type: &'static str, version: &'static str) -> Self {
        Self {
            syntax_type: Cow::Borrowed(syntax_type),
            version: Cow::Borrowed(version),
        }
    }

    /// Parses a `type/version` identifier.
    pub fn parse(id: &str) -> Result<Self, WikiflowError> {
        let (syntax_type, version) = id
            .split_once('/')
            .ok_or_else(|| WikiflowError::InvalidSyntaxId(id.to_string()))?;
        if syntax_type.is_empty() || version.is_empty() || version.contains('/') {
            return Err(WikiflowError::InvalidSyntaxId(id.to_string()));
        }
        Ok(Self::new(syntax_type, version))
    }

    /// The syntax type, e.g. `xwiki`.
    pub fn syntax_type(&self) -> &str {
        &self.syntax_type
    }

    /// The syntax version, e.g. `2.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The `type/version` identifier.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.syntax_type, self.version)
    }
}

impl FromStr for Syntax {
    type Err = WikiflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Syntax::parse(s)
    }
}

impl TryFrom<String> for Syntax {
    type Error = WikiflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Syntax::parse(&value)
    }
}

impl From<Syntax> for String {
    fn from(value: Syntax) -> Self {
        value.to_string()
    }
}

/// Lookup table from identifier strings to known syntaxes.
///
/// Reads take a snapshot of the table; registration swaps in a new copy.
#[derive(Debug)]
pub struct SyntaxRegistry {
    syntaxes: CopyOnWrite<BTreeMap<String, Syntax>>,
}

impl SyntaxRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            syntaxes: CopyOnWrite::default(),
        }
    }

    /// Creates a registry holding the built-in syntaxes.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for syntax in [
            Syntax::XWIKI_2_1,
            Syntax::PLAIN_1_0,
            Syntax::XHTML_1_0,
            Syntax::EVENT_1_0,
        ] {
            registry.register(syntax);
        }
        registry
    }

    /// Registers a syntax, replacing any entry with the same identifier.
    pub fn register(&self, syntax: Syntax) {
        log::debug!("registering syntax [{}]", syntax);
        self.syntaxes.update(|map| {
            map.insert(syntax.id(), syntax);
        });
    }

    /// Resolves an identifier to a registered syntax.
    pub fn resolve(&self, id: &str) -> Result<Syntax, WikiflowError> {
        let parsed = Syntax::parse(id)?;
        self.syntaxes
            .load()
            .get(&parsed.id())
            .cloned()
            .ok_or_else(|| WikiflowError::UnknownSyntax(id.to_string()))
    }

    /// Check if a syntax is registered
    pub fn contains(&self, syntax: &Syntax) -> bool {
        self.syntaxes.load().contains_key(&syntax.id())
    }

    /// All registered syntaxes, sorted by identifier.
    pub fn syntaxes(&self) -> Vec<Syntax> {
        self.syntaxes.load().values().cloned().collect()
    }
}

impl Default for SyntaxRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let syntax = Syntax::parse("xwiki/2.1").unwrap();
        assert_eq!(syntax, Syntax::XWIKI_2_1);
        assert_eq!(syntax.syntax_type(), "xwiki");
        assert_eq!(syntax.version(), "2.1");
        assert_eq!(Syntax::PLAIN_1_0.to_string(), "plain/1.0");
    }

    #[test]
    fn test_invalid_ids() {
        for id in ["xwiki", "/2.1", "xwiki/", "a/b/c"] {
            assert!(
                matches!(Syntax::parse(id), Err(WikiflowError::InvalidSyntaxId(_))),
                "{id} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Syntax::EVENT_1_0).unwrap();
        assert_eq!(json, "\"event/1.0\"");
        let back: Syntax = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Syntax::EVENT_1_0);
        assert!(serde_json::from_str::<Syntax>("\"event\"").is_err());
    }

    #[test]
    fn test_registry_resolve() {
        let registry = SyntaxRegistry::with_defaults();
        assert_eq!(registry.resolve("plain/1.0").unwrap(), Syntax::PLAIN_1_0);
        assert!(matches!(
            registry.resolve("markdown/1.2"),
            Err(WikiflowError::UnknownSyntax(_))
        ));

        registry.register(Syntax::new("markdown", "1.2"));
        assert!(registry.contains(&Syntax::new("markdown", "1.2")));
        assert_eq!(registry.syntaxes().len(), 5);
    }
}
