#![deny(missing_docs)]
//! Wikiflow rendering: macro expansion, renderers and the conversion facade.
//!
//! A [`Converter`] parses text with a `wikiflow-core` parser, runs the
//! registered transformations (the macro transformation by default) and
//! serializes the result with a [`Renderer`].

/// Batch rendering inputs and results.
pub mod batch;
/// Rendering configuration.
pub mod config;
/// The conversion facade.
pub mod converter;
/// Document storage and permission collaborators.
pub mod documents;
/// Error types for macros, transformations and renderers.
pub mod error;
/// Macro protocol, registry and built-in macros.
pub mod macros;
/// Target syntax renderers.
pub mod renderer;
/// Transformations and their context.
pub mod transformation;

pub use batch::{BatchInput, BatchOptions, BatchProcessingResult, BatchResult, BatchStats};
pub use config::RenderingConfig;
pub use converter::{Components, Converter};
pub use documents::{
    AllowAll, DenyList, DocumentAccess, DocumentAccessError, DocumentContent, InMemoryDocuments,
    Permissions,
};
pub use error::{
    ConfigError, MacroError, ParameterError, RenderError, RenderingError, TransformationError,
};
pub use macros::{
    Macro, MacroDescriptor, MacroRegistry, MacroTransformation, MacroTransformationContext,
};
pub use renderer::{
    EventRenderer, PlainRenderer, Renderer, RendererRegistry, XWikiRenderer, XhtmlRenderer,
};
pub use transformation::{Transformation, TransformationContext, TransformationManager};
