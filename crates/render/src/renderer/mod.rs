//! Renderers: serialize a transformed tree into a target syntax.
//!
//! Every renderer is a pure function of the tree. They walk the detached
//! [`Block`](wikiflow_core::Block) form of the root, which keeps the
//! recursive code close to the shape of the output.

mod event;
mod output;
mod plain;
mod xhtml;
mod xwiki;

pub use event::EventRenderer;
pub use plain::PlainRenderer;
pub use xhtml::XhtmlRenderer;
pub use xwiki::XWikiRenderer;

use crate::error::RenderError;
use std::collections::HashMap;
use std::sync::Arc;
use wikiflow_core::{CopyOnWrite, Syntax, WikiflowError, Xdom};

/// Serializes an [`Xdom`] into one target syntax.
pub trait Renderer: Send + Sync {
    /// Syntax this renderer produces.
    fn syntax(&self) -> Syntax;

    /// Renders the whole tree.
    fn render(&self, xdom: &Xdom) -> Result<String, RenderError>;
}

/// Renderers keyed by target syntax.
pub struct RendererRegistry {
    renderers: CopyOnWrite<HashMap<Syntax, Arc<dyn Renderer>>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            renderers: CopyOnWrite::new(HashMap::new()),
        }
    }

    /// Registry holding the xwiki, plain, xhtml and event renderers.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(XWikiRenderer::new()));
        registry.register(Arc::new(PlainRenderer::new()));
        registry.register(Arc::new(XhtmlRenderer::new()));
        registry.register(Arc::new(EventRenderer::new()));
        registry
    }

    /// Registers a renderer under its syntax, replacing any previous one.
    pub fn register(&self, renderer: Arc<dyn Renderer>) {
        let syntax = renderer.syntax();
        log::debug!("registering renderer for [{}]", syntax);
        self.renderers.update(|renderers| {
            renderers.insert(syntax, renderer);
        });
    }

    /// Looks up the renderer for `syntax`.
    pub fn get(&self, syntax: &Syntax) -> Result<Arc<dyn Renderer>, WikiflowError> {
        self.renderers
            .load()
            .get(syntax)
            .cloned()
            .ok_or_else(|| WikiflowError::MissingRenderer(syntax.clone()))
    }

    /// Whether a renderer is registered for `syntax`.
    pub fn has(&self, syntax: &Syntax) -> bool {
        self.renderers.load().contains_key(syntax)
    }

    /// Renders `xdom` with the renderer for `syntax`.
    pub fn render(&self, xdom: &Xdom, syntax: &Syntax) -> Result<String, crate::RenderingError> {
        let renderer = self.get(syntax)?;
        Ok(renderer.render(xdom)?)
    }

    /// Registered target syntaxes, sorted by id.
    pub fn syntaxes(&self) -> Vec<Syntax> {
        let mut syntaxes: Vec<Syntax> = self.renderers.load().keys().cloned().collect();
        syntaxes.sort_by_key(|syntax| syntax.id());
        syntaxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikiflow_core::{Block, Xdom};

    #[test]
    fn test_defaults_cover_builtin_targets() {
        let registry = RendererRegistry::with_defaults();
        for syntax in [
            Syntax::XWIKI_2_1,
            Syntax::PLAIN_1_0,
            Syntax::XHTML_1_0,
            Syntax::EVENT_1_0,
        ] {
            assert!(registry.has(&syntax), "missing {}", syntax);
        }
        assert_eq!(registry.syntaxes().len(), 4);
    }

    #[test]
    fn test_missing_renderer() {
        let registry = RendererRegistry::new();
        let xdom = Xdom::from_blocks(vec![Block::paragraph(Block::text("x"))]);
        let err = registry.render(&xdom, &Syntax::PLAIN_1_0).unwrap_err();
        assert!(err.to_string().contains("plain/1.0"), "{}", err);
    }
}
