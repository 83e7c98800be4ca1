//! Per-render transformation state.

use super::TransformationManager;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use wikiflow_core::Syntax;

/// Document references currently being transformed.
///
/// Clones share the same set, so a nested context sees the references its
/// parents entered.
#[derive(Debug, Clone, Default)]
pub struct InProgress(Rc<RefCell<BTreeSet<String>>>);

impl InProgress {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `reference` is being transformed.
    pub fn contains(&self, reference: &str) -> bool {
        self.0.borrow().contains(reference)
    }

    /// Marks `reference` as in progress until the guard is dropped.
    ///
    /// Returns `None` if it already is.
    pub fn enter(&self, reference: &str) -> Option<InProgressGuard> {
        if !self.0.borrow_mut().insert(reference.to_string()) {
            return None;
        }
        Some(InProgressGuard {
            set: self.clone(),
            reference: reference.to_string(),
        })
    }

    /// Snapshot of the references, sorted.
    pub fn references(&self) -> Vec<String> {
        self.0.borrow().iter().cloned().collect()
    }
}

/// Removes its reference from the [`InProgress`] set on drop.
#[derive(Debug)]
pub struct InProgressGuard {
    set: InProgress,
    reference: String,
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.set.0.borrow_mut().remove(&self.reference);
    }
}

/// State threaded through one render's transformations.
///
/// A context is created per top-level render and never crosses threads.
/// [`nested`](Self::nested) derives the context for a recursive step.
#[derive(Clone)]
pub struct TransformationContext {
    source_syntax: Syntax,
    target_syntax: Option<Syntax>,
    restricted: bool,
    depth: usize,
    id: Option<String>,
    in_progress: InProgress,
    pipeline: Option<Arc<TransformationManager>>,
}

impl TransformationContext {
    /// Creates a top-level context for content written in `source_syntax`.
    pub fn new(source_syntax: Syntax) -> Self {
        Self {
            source_syntax,
            target_syntax: None,
            restricted: false,
            depth: 0,
            id: None,
            in_progress: InProgress::new(),
            pipeline: None,
        }
    }

    /// Sets the syntax the result will be rendered to.
    pub fn with_target_syntax(mut self, syntax: Syntax) -> Self {
        self.target_syntax = Some(syntax);
        self
    }

    /// Sets restricted mode.
    pub fn with_restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Sets the id of the transformed content, usually a document reference.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the syntax of the transformed content.
    pub fn with_source_syntax(mut self, syntax: Syntax) -> Self {
        self.source_syntax = syntax;
        self
    }

    /// Sets the transformations macros run on content they parse.
    pub fn with_pipeline(mut self, pipeline: Arc<TransformationManager>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Context one level deeper, sharing the in-progress set.
    pub fn nested(&self) -> Self {
        let mut nested = self.clone();
        nested.depth += 1;
        nested
    }

    /// Syntax of the transformed content.
    pub fn source_syntax(&self) -> &Syntax {
        &self.source_syntax
    }

    /// Syntax the result will be rendered to, if known.
    pub fn target_syntax(&self) -> Option<&Syntax> {
        self.target_syntax.as_ref()
    }

    /// Whether restricted mode is on.
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Current macro nesting depth, 0 at the top level.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Id of the transformed content.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// References being transformed.
    pub fn in_progress(&self) -> &InProgress {
        &self.in_progress
    }

    /// Transformations to run on nested content, if configured.
    pub fn pipeline(&self) -> Option<&Arc<TransformationManager>> {
        self.pipeline.as_ref()
    }
}

impl fmt::Debug for TransformationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationContext")
            .field("source_syntax", &self.source_syntax)
            .field("target_syntax", &self.target_syntax)
            .field("restricted", &self.restricted)
            .field("depth", &self.depth)
            .field("id", &self.id)
            .field("in_progress", &self.in_progress.references())
            .field("pipeline", &self.pipeline.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_reference() {
        let set = InProgress::new();
        {
            let guard = set.enter("Main.A");
            assert!(guard.is_some());
            assert!(set.contains("Main.A"));
            assert!(set.enter("Main.A").is_none());
        }
        assert!(!set.contains("Main.A"));
    }

    #[test]
    fn test_nested_shares_in_progress() {
        let ctx = TransformationContext::new(Syntax::XWIKI_2_1)
            .with_restricted(true)
            .with_id("Main.A");
        let nested = ctx.nested();
        assert_eq!(nested.depth(), 1);
        assert!(nested.is_restricted());
        assert_eq!(nested.id(), Some("Main.A"));

        let _guard = nested.in_progress().enter("Main.B");
        assert!(ctx.in_progress().contains("Main.B"));
    }
}
