//! Macro descriptors and parameter validation.

use crate::error::ParameterError;
use std::collections::BTreeMap;
use wikiflow_core::Parameters;

/// Type a parameter value is converted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// Any text.
    String,
    /// `true` or `false`, case-insensitive.
    Boolean,
    /// Signed integer.
    Integer,
    /// One of a fixed set of values, case-insensitive.
    Enum(Vec<String>),
}

/// Declaration of one macro parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Parameter name; matched case-insensitively.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Value type.
    pub kind: ParameterKind,
    /// Whether the call must pass it.
    pub mandatory: bool,
    /// Value used when the call does not pass it.
    pub default: Option<String>,
}

impl ParameterDescriptor {
    fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            mandatory: false,
            default: None,
        }
    }

    /// Text parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::String)
    }

    /// Boolean parameter.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Boolean)
    }

    /// Integer parameter.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Integer)
    }

    /// Parameter restricted to `values`.
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ParameterKind::Enum(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Marks the parameter mandatory.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn convert(&self, value: &str) -> Result<ParameterValue, ParameterError> {
        let invalid = |reason: String| ParameterError::InvalidValue {
            name: self.name.clone(),
            value: value.to_string(),
            reason,
        };
        match &self.kind {
            ParameterKind::String => Ok(ParameterValue::String(value.to_string())),
            ParameterKind::Boolean => {
                if value.eq_ignore_ascii_case("true") {
                    Ok(ParameterValue::Boolean(true))
                } else if value.eq_ignore_ascii_case("false") {
                    Ok(ParameterValue::Boolean(false))
                } else {
                    Err(invalid("expected true or false".to_string()))
                }
            }
            ParameterKind::Integer => value
                .trim()
                .parse()
                .map(ParameterValue::Integer)
                .map_err(|err: std::num::ParseIntError| invalid(err.to_string())),
            ParameterKind::Enum(values) => values
                .iter()
                .find(|allowed| allowed.eq_ignore_ascii_case(value))
                .map(|allowed| ParameterValue::String(allowed.clone()))
                .ok_or_else(|| invalid(format!("expected one of {}", values.join(", ")))),
        }
    }
}

/// Whether a macro takes content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDescriptor {
    /// Content is an error.
    Forbidden,
    /// Content may be omitted.
    Optional,
    /// Content must be present, possibly empty.
    Mandatory,
}

/// Parameter schema and execution constraints of a macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDescriptor {
    /// Macro id as used in calls.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared parameters.
    pub parameters: Vec<ParameterDescriptor>,
    /// Content expectations.
    pub content: ContentDescriptor,
    /// Whether the macro may run when the context is restricted.
    pub allowed_in_restricted_mode: bool,
}

impl MacroDescriptor {
    /// Descriptor with optional content, no parameters and no restrictions.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            content: ContentDescriptor::Optional,
            allowed_in_restricted_mode: true,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares a parameter.
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the content expectations.
    pub fn with_content(mut self, content: ContentDescriptor) -> Self {
        self.content = content;
        self
    }

    /// Refuses execution in restricted mode.
    pub fn restricted(mut self) -> Self {
        self.allowed_in_restricted_mode = false;
        self
    }

    /// Looks up a parameter declaration, ignoring case.
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name.eq_ignore_ascii_case(name))
    }

    /// Checks a call against the descriptor and converts its parameters.
    ///
    /// Defaults fill in parameters the call omits.
    pub fn validate(
        &self,
        parameters: &Parameters,
        content: Option<&str>,
    ) -> Result<ParsedParameters, ParameterError> {
        let mut values = BTreeMap::new();
        for (name, value) in parameters {
            let descriptor = self
                .parameter(name)
                .ok_or_else(|| ParameterError::Unknown(name.clone()))?;
            values.insert(descriptor.name.clone(), descriptor.convert(value)?);
        }
        for descriptor in &self.parameters {
            if values.contains_key(&descriptor.name) {
                continue;
            }
            match &descriptor.default {
                Some(default) => {
                    values.insert(descriptor.name.clone(), descriptor.convert(default)?);
                }
                None if descriptor.mandatory => {
                    return Err(ParameterError::MissingMandatory(descriptor.name.clone()));
                }
                None => {}
            }
        }
        match (self.content, content) {
            (ContentDescriptor::Mandatory, None) => {
                Err(ParameterError::MissingContent(self.id.clone()))
            }
            (ContentDescriptor::Forbidden, Some(content)) if !content.is_empty() => {
                Err(ParameterError::ContentForbidden(self.id.clone()))
            }
            _ => Ok(ParsedParameters { values }),
        }
    }
}

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// Text or enum value.
    String(String),
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
}

/// Parameters of a call after validation, keyed by declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedParameters {
    values: BTreeMap<String, ParameterValue>,
}

impl ParsedParameters {
    /// Gets a value, ignoring case.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Gets a text or enum value.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParameterValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Gets a boolean value.
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParameterValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Gets an integer value.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ParameterValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
