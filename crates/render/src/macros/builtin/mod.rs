//! Macros registered by default.

mod format;
mod html;
mod include;

pub use format::FormatMacro;
pub use html::HtmlMacro;
pub use include::IncludeMacro;

use super::MacroRegistry;
use crate::documents::{DocumentAccess, Permissions};
use std::sync::Arc;

/// Registers `include`, `html`, `bold`, `italic` and `monospace`.
pub fn register_defaults(
    registry: &MacroRegistry,
    documents: Arc<dyn DocumentAccess>,
    permissions: Arc<dyn Permissions>,
) {
    registry.register(Arc::new(IncludeMacro::new(documents, permissions)));
    registry.register(Arc::new(HtmlMacro::new()));
    registry.register(Arc::new(FormatMacro::bold()));
    registry.register(Arc::new(FormatMacro::italic()));
    registry.register(Arc::new(FormatMacro::monospace()));
}
