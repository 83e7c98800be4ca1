//! Macro execution protocol: the [`Macro`] trait, descriptors, the registry
//! and the transformation that expands macro calls.

pub mod builtin;
mod descriptor;
mod error_marker;
mod transformation;

pub use descriptor::{
    ContentDescriptor, MacroDescriptor, ParameterDescriptor, ParameterKind, ParameterValue,
    ParsedParameters,
};
pub use error_marker::{ERROR_CLASS, ERROR_DESCRIPTION_CLASS, error_blocks};
pub use transformation::{MacroTransformation, MacroTransformationContext};
pub(crate) use transformation::unwrap_inline;

use crate::documents::{DocumentAccess, Permissions};
use crate::error::MacroError;
use std::collections::HashMap;
use std::sync::Arc;
use wikiflow_core::{Block, CopyOnWrite, Syntax};

/// A content-generating unit invoked by a macro call.
pub trait Macro: Send + Sync {
    /// Parameter schema and constraints.
    fn descriptor(&self) -> &MacroDescriptor;

    /// Id used in calls.
    fn id(&self) -> &str {
        &self.descriptor().id
    }

    /// Lower values run first among the calls of one pass.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether the macro may be called inside inline content.
    fn supports_inline_mode(&self) -> bool {
        false
    }

    /// Produces the blocks that replace the call.
    fn execute(
        &self,
        parameters: &ParsedParameters,
        content: Option<&str>,
        ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError>;
}

/// Registry key: a macro id, optionally bound to one syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacroId {
    /// Macro id.
    pub id: String,
    /// Syntax the registration applies to; `None` for every syntax.
    pub syntax: Option<Syntax>,
}

impl MacroId {
    /// Key valid for every syntax.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            syntax: None,
        }
    }

    /// Key valid for `syntax` only.
    pub fn for_syntax(id: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            id: id.into(),
            syntax: Some(syntax),
        }
    }
}

/// Macros keyed by [`MacroId`].
///
/// Lookups prefer a registration for the caller's syntax and fall back to
/// the syntax-agnostic one.
#[derive(Default)]
pub struct MacroRegistry {
    macros: CopyOnWrite<HashMap<MacroId, Arc<dyn Macro>>>,
}

impl MacroRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in macros.
    pub fn with_defaults(
        documents: Arc<dyn DocumentAccess>,
        permissions: Arc<dyn Permissions>,
    ) -> Self {
        let registry = Self::new();
        builtin::register_defaults(&registry, documents, permissions);
        registry
    }

    /// Registers a macro for every syntax, replacing any previous one.
    pub fn register(&self, macro_impl: Arc<dyn Macro>) {
        let key = MacroId::new(macro_impl.id());
        self.register_as(key, macro_impl);
    }

    /// Registers a macro that only applies to content in `syntax`.
    pub fn register_for_syntax(&self, macro_impl: Arc<dyn Macro>, syntax: Syntax) {
        let key = MacroId::for_syntax(macro_impl.id(), syntax);
        self.register_as(key, macro_impl);
    }

    fn register_as(&self, key: MacroId, macro_impl: Arc<dyn Macro>) {
        log::debug!(
            "registering macro [{}] for {}",
            key.id,
            key.syntax
                .as_ref()
                .map_or_else(|| "all syntaxes".to_string(), |s| format!("syntax [{}]", s))
        );
        self.macros.update(|macros| {
            macros.insert(key, macro_impl);
        });
    }

    /// Finds the macro for `id`, preferring a registration for `syntax`.
    pub fn lookup(&self, id: &str, syntax: Option<&Syntax>) -> Result<Arc<dyn Macro>, MacroError> {
        let macros = self.macros.load();
        syntax
            .and_then(|syntax| macros.get(&MacroId::for_syntax(id, syntax.clone())))
            .or_else(|| macros.get(&MacroId::new(id)))
            .cloned()
            .ok_or_else(|| MacroError::Lookup { id: id.to_string() })
    }

    /// Whether any registration exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.macros.load().keys().any(|key| key.id == id)
    }

    /// All registration keys, sorted.
    pub fn ids(&self) -> Vec<MacroId> {
        let mut ids: Vec<MacroId> = self.macros.load().keys().cloned().collect();
        ids.sort();
        ids
    }
}
