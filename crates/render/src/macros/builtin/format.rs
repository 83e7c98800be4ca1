use crate::error::MacroError;
use crate::macros::{Macro, MacroDescriptor, MacroTransformationContext, ParsedParameters};
use wikiflow_core::{Block, Format};

/// Applies one inline format to its content.
///
/// The content is parsed with the surrounding syntax and must be inline.
/// Standalone calls produce a paragraph.
pub struct FormatMacro {
    descriptor: MacroDescriptor,
    format: Format,
}

impl FormatMacro {
    fn new(id: &str, name: &str, format: Format) -> Self {
        Self {
            descriptor: MacroDescriptor::new(id, name)
                .with_description(format!("Renders its content in {}.", name.to_lowercase())),
            format,
        }
    }

    /// `bold`
    pub fn bold() -> Self {
        Self::new("bold", "Bold", Format::Bold)
    }

    /// `italic`
    pub fn italic() -> Self {
        Self::new("italic", "Italic", Format::Italic)
    }

    /// `monospace`
    pub fn monospace() -> Self {
        Self::new("monospace", "Monospace", Format::Monospace)
    }
}

impl Macro for FormatMacro {
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
        ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError> {
        let children = ctx.parse_inline_content(content.unwrap_or_default())?;
        let formatted = Block::format(self.format, children);
        if ctx.is_inline() {
            Ok(vec![formatted])
        } else {
            Ok(vec![Block::paragraph(vec![formatted])])
        }
    }
}
