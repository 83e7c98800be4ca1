//! Tree-rewriting passes and the priority-ordered manager that runs them.

mod context;

pub use context::{InProgress, InProgressGuard, TransformationContext};

use crate::error::TransformationError;
use std::sync::Arc;
use wikiflow_core::{CopyOnWrite, Xdom};

/// A pass that rewrites an [`Xdom`] in place.
pub trait Transformation: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Lower values run first.
    fn priority(&self) -> i32 {
        1000
    }

    /// Applies the pass.
    fn transform(&self, xdom: &mut Xdom, ctx: &TransformationContext)
    -> Result<(), TransformationError>;
}

/// Registered transformations, kept sorted by priority.
#[derive(Default)]
pub struct TransformationManager {
    transformations: CopyOnWrite<Vec<Arc<dyn Transformation>>>,
}

impl TransformationManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transformation. Equal priorities keep registration order.
    pub fn register(&self, transformation: Arc<dyn Transformation>) {
        log::debug!(
            "registering transformation [{}] with priority {}",
            transformation.name(),
            transformation.priority()
        );
        self.transformations.update(|transformations| {
            transformations.push(transformation);
            transformations.sort_by_key(|t| t.priority());
        });
    }

    /// Names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.transformations
            .load()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Runs every transformation in priority order, stopping at the first failure.
    pub fn transform(
        &self,
        xdom: &mut Xdom,
        ctx: &TransformationContext,
    ) -> Result<(), TransformationError> {
        for transformation in self.transformations.load().iter() {
            log::trace!(
                "applying transformation [{}] at depth {}",
                transformation.name(),
                ctx.depth()
            );
            transformation.transform(xdom, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wikiflow_core::{Block, Syntax};

    struct Recording {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Transformation for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn transform(
            &self,
            xdom: &mut Xdom,
            _ctx: &TransformationContext,
        ) -> Result<(), TransformationError> {
            self.log.lock().unwrap().push(self.name);
            let root = xdom.root();
            xdom.append(root, Block::word(self.name))?;
            Ok(())
        }
    }

    #[test]
    fn test_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = TransformationManager::new();
        for (name, priority) in [("late", 500), ("early", 10), ("tie", 500)] {
            manager.register(Arc::new(Recording {
                name,
                priority,
                log: Arc::clone(&log),
            }));
        }
        assert_eq!(manager.names(), vec!["early", "late", "tie"]);

        let mut xdom = Xdom::new();
        manager
            .transform(&mut xdom, &TransformationContext::new(Syntax::XWIKI_2_1))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["early", "late", "tie"]);
        assert_eq!(xdom.children(xdom.root()).len(), 3);
    }
}
