use crate::documents::DocumentAccessError;
use thiserror::Error;
use wikiflow_core::{Syntax, WikiflowError, XdomError};

type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

/// A macro call whose parameters or placement do not match its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// The call passes a parameter the descriptor does not declare.
    #[error("Unknown parameter [{0}]")]
    Unknown(String),
    /// A mandatory parameter is missing and has no default.
    #[error("Mandatory parameter [{0}] is missing")]
    MissingMandatory(String),
    /// A value could not be converted to the declared kind.
    #[error("Invalid value [{value}] for parameter [{name}]: {reason}")]
    InvalidValue {
        /// Parameter name as declared.
        name: String,
        /// Raw value from the call.
        value: String,
        /// Why conversion failed.
        reason: String,
    },
    /// The macro requires content but the call has none.
    #[error("The [{0}] macro requires content")]
    MissingContent(String),
    /// The macro takes no content but the call has some.
    #[error("The [{0}] macro does not accept content")]
    ContentForbidden(String),
    /// A block-only macro was called inside inline content.
    #[error("The [{0}] macro is a standalone macro and it cannot be used inline")]
    InlineModeUnsupported(String),
}

/// Failure of a single macro call.
///
/// Every variant except [`MacroError::Transformation`] is recovered where it
/// happens: the call is replaced with an error marker and the rest of the
/// document is still transformed.
#[derive(Debug, Error)]
pub enum MacroError {
    /// No macro is registered under the id.
    #[error("Unknown macro: {id}.")]
    Lookup {
        /// Requested macro id.
        id: String,
    },
    /// Parameter validation failed.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    /// The macro's own logic failed.
    #[error("{message}")]
    Execution {
        /// User-facing message.
        message: String,
        /// Underlying cause, kept for the error description.
        #[source]
        source: Option<BoxedCause>,
    },
    /// A document includes itself, directly or transitively.
    #[error("Found recursive inclusion of document [{reference}]")]
    CircularInclude {
        /// Reference entered a second time.
        reference: String,
    },
    /// A nested transformation failed fatally; aborts the whole render.
    #[error(transparent)]
    Transformation(#[from] TransformationError),
}

impl MacroError {
    /// Execution failure without a cause.
    pub fn execution(message: impl Into<String>) -> Self {
        MacroError::Execution {
            message: message.into(),
            source: None,
        }
    }

    /// Execution failure caused by `source`.
    pub fn execution_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        MacroError::Execution {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the error must abort the render instead of producing an error marker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MacroError::Transformation(_))
    }
}

/// Fatal failure of a transformation pass.
#[derive(Debug, Error)]
pub enum TransformationError {
    /// Macro expansion nested deeper than the configured bound.
    #[error("Maximum macro recursion depth of {max_depth} exceeded")]
    RecursionDepthExceeded {
        /// Configured bound.
        max_depth: usize,
    },
    /// Illegal tree edit.
    #[error(transparent)]
    Tree(#[from] XdomError),
    /// A registered transformation reported a failure.
    #[error("transformation [{transformation}] failed: {message}")]
    Failed {
        /// Transformation name.
        transformation: String,
        /// Failure description.
        message: String,
    },
}

/// Serialization failure in a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A raw block's syntax cannot be embedded in the target syntax.
    #[error("raw content of syntax [{syntax}] cannot be rendered to [{target}]")]
    UnsupportedRawSyntax {
        /// Syntax of the raw block.
        syntax: Syntax,
        /// Renderer syntax.
        target: Syntax,
    },
    /// A block appears where the target syntax cannot express it.
    #[error("cannot render a {kind} block inside {context}")]
    UnexpectedBlock {
        /// Offending block kind.
        kind: &'static str,
        /// Enclosing construct.
        context: &'static str,
    },
}

/// Malformed rendering configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON input could not be read.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// YAML input could not be read.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// `defaultSyntax` is not a `type/version` identifier.
    #[error("invalid default syntax: {0}")]
    Syntax(#[source] WikiflowError),
}

/// Any error that fails a whole render call.
#[derive(Debug, Error)]
pub enum RenderingError {
    /// Parse failure or missing parser/renderer.
    #[error(transparent)]
    Wikiflow(#[from] WikiflowError),
    /// Fatal transformation failure.
    #[error(transparent)]
    Transformation(#[from] TransformationError),
    /// Renderer failure.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The requested document could not be loaded.
    #[error(transparent)]
    DocumentAccess(#[from] DocumentAccessError),
}

impl From<wikiflow_core::ParseError> for RenderingError {
    fn from(err: wikiflow_core::ParseError) -> Self {
        RenderingError::Wikiflow(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_macro_error_messages() {
        let err = MacroError::Lookup {
            id: "unknownMacro".into(),
        };
        assert_eq!(err.to_string(), "Unknown macro: unknownMacro.");

        let err = MacroError::CircularInclude {
            reference: "Main.A".into(),
        };
        assert_eq!(
            err.to_string(),
            "Found recursive inclusion of document [Main.A]"
        );
    }

    #[test]
    fn test_execution_keeps_cause() {
        let cause = DocumentAccessError::NotFound("Main.B".into());
        let err = MacroError::execution_with_source("Failed to get content", cause);
        assert_eq!(err.to_string(), "Failed to get content");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("Document [Main.B] does not exist".to_string())
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_only_transformation_errors_are_fatal() {
        let err: MacroError = TransformationError::RecursionDepthExceeded { max_depth: 3 }.into();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Maximum macro recursion depth of 3 exceeded"
        );
        let err: MacroError = ParameterError::Unknown("foo".into()).into();
        assert!(!err.is_fatal());
    }
}
