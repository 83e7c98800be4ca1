use crate::syntax::Syntax;
use crate::xdom::BlockId;
use thiserror::Error;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Optional document reference or file path
    pub file: Option<String>,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            file: None,
            line,
            column,
        }
    }

    /// Create a source location with file information
    pub fn with_file(file: String, line: usize, column: usize) -> Self {
        Self {
            file: Some(file),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Unrecoverable lexical error raised by a parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at {location}: {message}")]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Source location
    pub location: SourceLocation,
}

impl ParseError {
    /// Create a parse error with location
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            location: SourceLocation::new(line, column),
        }
    }
}

/// Structural misuse of an [`Xdom`](crate::Xdom).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XdomError {
    /// The root block cannot be replaced or removed.
    #[error("the document root cannot be replaced or removed")]
    RootMutation,
    /// The block is no longer part of the tree.
    #[error("block {0:?} is detached from the document")]
    Detached(BlockId),
    /// The block id does not belong to this tree.
    #[error("block {0:?} does not exist")]
    UnknownBlock(BlockId),
}

/// Errors raised by the core registries and parsers.
#[derive(Debug, Error)]
pub enum WikiflowError {
    /// Source text could not be lexed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// No parser is registered for the requested syntax.
    #[error("no parser registered for syntax [{0}]")]
    MissingParser(Syntax),
    /// No renderer is registered for the requested syntax.
    #[error("no renderer registered for syntax [{0}]")]
    MissingRenderer(Syntax),
    /// A syntax identifier was not of the form `type/version`.
    #[error("invalid syntax identifier [{0}], expected <type>/<version>")]
    InvalidSyntaxId(String),
    /// A well-formed syntax identifier that nothing registered.
    #[error("unknown syntax [{0}]")]
    UnknownSyntax(String),
    /// Tree mutation error.
    #[error(transparent)]
    Tree(#[from] XdomError),
}

/// Non-fatal warnings that don't prevent parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// Macro start tag without a matching close tag; kept as literal text
    UnclosedMacro {
        /// Where the start tag begins
        location: SourceLocation,
        /// Macro id read from the start tag
        id: String,
    },
    /// `{{{` without a closing `}}}`; kept as literal text
    UnterminatedVerbatim {
        /// Where the verbatim opener begins
        location: SourceLocation,
    },
    /// `(((` without a closing `)))`; the opener line is read as a paragraph
    UnclosedGroup {
        /// Where the group opener begins
        location: SourceLocation,
    },
    /// Other recoverable markup problems
    SuspiciousMarkup {
        /// Source location where the suspicious markup was found
        location: SourceLocation,
        /// Warning message
        message: String,
    },
}

impl ParseWarning {
    /// Get the location of this warning
    pub fn location(&self) -> &SourceLocation {
        match self {
            ParseWarning::UnclosedMacro { location, .. } => location,
            ParseWarning::UnterminatedVerbatim { location } => location,
            ParseWarning::UnclosedGroup { location } => location,
            ParseWarning::SuspiciousMarkup { location, .. } => location,
        }
    }
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::UnclosedMacro { location, id } => {
                write!(f, "{}: macro [{}] is never closed", location, id)
            }
            ParseWarning::UnterminatedVerbatim { location } => {
                write!(f, "{}: unterminated verbatim block", location)
            }
            ParseWarning::UnclosedGroup { location } => {
                write!(f, "{}: group is never closed", location)
            }
            ParseWarning::SuspiciousMarkup { location, message } => {
                write!(f, "{}: {}", location, message)
            }
        }
    }
}

/// Collection of parse diagnostics
#[derive(Debug, Clone, Default)]
pub struct ParseDiagnostics {
    /// List of non-fatal warnings
    pub warnings: Vec<ParseWarning>,
}

impl ParseDiagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the diagnostics collection
    pub fn add_warning(&mut self, warning: ParseWarning) {
        log::debug!("parse warning: {}", warning);
        self.warnings.push(warning);
    }

    /// Add a warning with location
    pub fn add_warning_at(&mut self, message: impl Into<String>, line: usize, column: usize) {
        self.add_warning(ParseWarning::SuspiciousMarkup {
            location: SourceLocation::new(line, column),
            message: message.into(),
        });
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get total count of all diagnostics
    pub fn count(&self) -> usize {
        self.warnings.len()
    }
}
