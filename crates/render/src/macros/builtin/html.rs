use crate::error::MacroError;
use crate::macros::{
    ContentDescriptor, Macro, MacroDescriptor, MacroTransformationContext, ParsedParameters,
};
use wikiflow_core::{Block, BlockKind, Syntax};

/// Passes its content through as raw XHTML.
pub struct HtmlMacro {
    descriptor: MacroDescriptor,
}

impl HtmlMacro {
    /// Creates the macro.
    pub fn new() -> Self {
        Self {
            descriptor: MacroDescriptor::new("html", "HTML")
                .with_description("Inserts raw HTML or XHTML code into the page.")
                .with_content(ContentDescriptor::Mandatory)
                .restricted(),
        }
    }
}

impl Default for HtmlMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for HtmlMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn supports_inline_mode(&self) -> bool {
        true
    }

    fn execute(
        &self,
        _parameters: &ParsedParameters,
        content: Option<&str>,
        _ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError> {
        Ok(vec![Block::new(BlockKind::Raw {
            content: content.unwrap_or_default().to_string(),
            syntax: Syntax::XHTML_1_0,
        })])
    }
}
