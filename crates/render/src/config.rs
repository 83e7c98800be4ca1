//! Rendering configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use wikiflow_core::Syntax;

/// Settings shared by every render of a [`Converter`](crate::Converter).
///
/// Every field has a default, so partial JSON or YAML documents are accepted.
///
/// # Example
///
/// ```
/// use wikiflow_render::RenderingConfig;
///
/// let config = RenderingConfig::from_json(r#"{"maxRecursionDepth": 5}"#).unwrap();
/// assert_eq!(config.max_recursion_depth, 5);
/// assert!(config.keep_macro_markers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderingConfig {
    /// Deepest macro nesting allowed before the render fails.
    pub max_recursion_depth: usize,
    /// Wrap macro output in a marker that remembers the original call.
    pub keep_macro_markers: bool,
    /// Run renders in restricted mode.
    pub restricted: bool,
    /// Attach a cause description to error markers.
    pub error_descriptions: bool,
    /// Syntax used when a caller does not name one.
    pub default_syntax: String,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 100,
            keep_macro_markers: true,
            restricted: false,
            error_descriptions: true,
            default_syntax: Syntax::XWIKI_2_1.id(),
        }
    }
}

impl RenderingConfig {
    /// Reads a configuration from JSON.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from YAML.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_syntax().map(|_| ())
    }

    /// The default syntax as a [`Syntax`].
    pub fn default_syntax(&self) -> Result<Syntax, ConfigError> {
        Syntax::parse(&self.default_syntax).map_err(ConfigError::Syntax)
    }
}
