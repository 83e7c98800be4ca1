use crate::documents::{DocumentAccess, Permissions};
use crate::error::MacroError;
use crate::macros::{
    ContentDescriptor, Macro, MacroDescriptor, MacroTransformationContext, ParameterDescriptor,
    ParsedParameters, unwrap_inline,
};
use std::sync::Arc;
use wikiflow_core::{Block, BlockKind, MetaData, Xdom};

const CONTEXT_NEW: &str = "new";
const CONTEXT_CURRENT: &str = "current";

/// Inserts the content of another document.
///
/// With `context=current` the included blocks are spliced in untransformed
/// and their macros run as part of the including document. With
/// `context=new` they are transformed on their own first, with the included
/// document as the content id. Either way the result is wrapped in
/// `MetaData` naming its source, which is what cycle detection walks.
pub struct IncludeMacro {
    descriptor: MacroDescriptor,
    documents: Arc<dyn DocumentAccess>,
    permissions: Arc<dyn Permissions>,
}

impl IncludeMacro {
    /// Creates the macro over the given collaborators.
    pub fn new(documents: Arc<dyn DocumentAccess>, permissions: Arc<dyn Permissions>) -> Self {
        let descriptor = MacroDescriptor::new("include", "Include")
            .with_description("Include other pages into the current page.")
            .with_content(ContentDescriptor::Forbidden)
            .with_parameter(
                ParameterDescriptor::string("reference")
                    .mandatory()
                    .with_description("The reference of the document to include."),
            )
            .with_parameter(
                ParameterDescriptor::string("section")
                    .with_description("The id of the section to include."),
            )
            .with_parameter(
                ParameterDescriptor::boolean("excludeFirstHeading").with_default("false"),
            )
            .with_parameter(
                ParameterDescriptor::enumeration("context", [CONTEXT_CURRENT, CONTEXT_NEW])
                    .with_default(CONTEXT_CURRENT),
            );
        Self {
            descriptor,
            documents,
            permissions,
        }
    }

    fn check_recursion(
        &self,
        reference: &str,
        ctx: &MacroTransformationContext<'_>,
    ) -> Result<(), MacroError> {
        let included = ctx.in_progress().contains(reference)
            || ctx.ancestor_sources().iter().any(|source| source == reference);
        if included {
            return Err(MacroError::CircularInclude {
                reference: reference.to_string(),
            });
        }
        Ok(())
    }
}

impl Macro for IncludeMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn supports_inline_mode(&self) -> bool {
        true
    }

    fn execute(
        &self,
        parameters: &ParsedParameters,
        _content: Option<&str>,
        ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError> {
        let reference = parameters
            .string("reference")
            .ok_or_else(|| MacroError::execution("You must specify a 'reference' parameter"))?;
        self.check_recursion(reference, ctx)?;

        if !self.documents.exists(reference) {
            return Err(MacroError::execution(format!(
                "Document [{}] does not exist",
                reference
            )));
        }
        if !self.permissions.can_view(reference) {
            return Err(MacroError::execution(format!(
                "Current user doesn't have view rights on document [{}]",
                reference
            )));
        }
        let document = self.documents.content(reference).map_err(|err| {
            MacroError::execution_with_source(
                format!("Failed to get content for document [{}]", reference),
                err,
            )
        })?;
        log::debug!(
            "including document [{}] in syntax [{}] at depth {}",
            reference,
            document.syntax,
            ctx.depth()
        );

        let mut blocks = ctx.parse(&document.text, &document.syntax)?.to_blocks();
        if let Some(section) = parameters.string("section") {
            blocks = find_section(blocks, section).ok_or_else(|| {
                MacroError::execution(format!(
                    "Cannot find section [{}] in document [{}]",
                    section, reference
                ))
            })?;
        }
        if parameters.boolean("excludeFirstHeading").unwrap_or(false) {
            drop_first_heading(&mut blocks);
        }
        if ctx.is_inline() {
            blocks = unwrap_inline(blocks).map_err(|_| {
                MacroError::execution(format!(
                    "Cannot include document [{}] inline: its content is not a single paragraph",
                    reference
                ))
            })?;
        }

        let mut metadata = MetaData::new()
            .with(MetaData::SOURCE, reference)
            .with(MetaData::SYNTAX, document.syntax.id());
        if parameters.string("context") != Some(CONTEXT_NEW) {
            return Ok(vec![Block::metadata(metadata, blocks)]);
        }

        metadata.insert(MetaData::BASE, reference);
        let _guard = ctx
            .in_progress()
            .enter(reference)
            .ok_or_else(|| MacroError::CircularInclude {
                reference: reference.to_string(),
            })?;
        let mut xdom = Xdom::from_blocks(vec![Block::metadata(metadata, blocks)])
            .with_syntax(document.syntax.clone());
        let nested = ctx
            .nested()
            .with_source_syntax(document.syntax.clone())
            .with_id(reference);
        ctx.transform(&mut xdom, &nested)?;
        Ok(xdom.to_blocks())
    }
}

/// Blocks of the section whose header id is `id`, header included.
fn find_section(blocks: Vec<Block>, id: &str) -> Option<Vec<Block>> {
    for block in blocks {
        if block.kind != BlockKind::Section {
            continue;
        }
        let matches = block.children.first().is_some_and(|header| {
            matches!(&header.kind, BlockKind::Header { id: Some(header_id), .. } if header_id == id)
        });
        if matches {
            return Some(block.children);
        }
        if let Some(found) = find_section(block.children, id) {
            return Some(found);
        }
    }
    None
}

/// Removes the header at the very start of `blocks`, looking into a leading section.
fn drop_first_heading(blocks: &mut Vec<Block>) {
    let Some(first) = blocks.first_mut() else {
        return;
    };
    if first.kind == BlockKind::Section {
        drop_first_heading(&mut first.children);
    } else if matches!(first.kind, BlockKind::Header { .. }) {
        blocks.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, rest: Vec<Block>) -> Block {
        let mut children = vec![
            Block::new(BlockKind::Header {
                level: 1,
                id: Some(id.to_string()),
            })
            .with_children(Block::text(id)),
        ];
        children.extend(rest);
        Block::new(BlockKind::Section).with_children(children)
    }

    #[test]
    fn test_find_nested_section() {
        let blocks = vec![
            Block::paragraph(Block::text("intro")),
            section(
                "HOne",
                vec![section("HTwo", vec![Block::paragraph(Block::text("body"))])],
            ),
        ];
        let found = find_section(blocks, "HTwo").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].plain_text(), "body");
        assert!(find_section(vec![], "HTwo").is_none());
    }

    #[test]
    fn test_drop_first_heading() {
        let mut blocks = vec![section("HOne", vec![Block::paragraph(Block::text("body"))])];
        drop_first_heading(&mut blocks);
        assert_eq!(blocks[0].children.len(), 1);
        assert_eq!(blocks[0].children[0].kind, BlockKind::Paragraph);

        let mut blocks = vec![Block::paragraph(Block::text("no heading"))];
        drop_first_heading(&mut blocks);
        assert_eq!(blocks.len(), 1);
    }
}
