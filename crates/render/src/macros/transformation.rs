//! The macro transformation: finds macro calls, executes them and splices
//! their output into the tree.

use super::error_marker::error_blocks;
use super::{MacroDescriptor, MacroRegistry};
use crate::config::RenderingConfig;
use crate::error::{MacroError, ParameterError, TransformationError};
use crate::transformation::{Transformation, TransformationContext};
use std::ops::Deref;
use std::sync::Arc;
use wikiflow_core::{
    Block, BlockId, BlockKind, MacroCall, MetaData, Parameters, ParserRegistry, Syntax, Xdom,
};

/// Expands every macro call of a document, recursively.
///
/// Calls under the given roots run in priority order, ties in document
/// order. The output of each call is transformed before the next call runs,
/// one level deeper. Recoverable failures become error markers; exceeding
/// the depth bound aborts the pass.
pub struct MacroTransformation {
    macros: Arc<MacroRegistry>,
    parsers: Arc<ParserRegistry>,
    max_depth: usize,
    keep_macro_markers: bool,
    error_descriptions: bool,
}

impl MacroTransformation {
    /// Creates the transformation with the default configuration.
    pub fn new(macros: Arc<MacroRegistry>, parsers: Arc<ParserRegistry>) -> Self {
        Self::with_config(macros, parsers, &RenderingConfig::default())
    }

    /// Creates the transformation with the relevant settings of `config`.
    pub fn with_config(
        macros: Arc<MacroRegistry>,
        parsers: Arc<ParserRegistry>,
        config: &RenderingConfig,
    ) -> Self {
        Self {
            macros,
            parsers,
            max_depth: config.max_recursion_depth,
            keep_macro_markers: config.keep_macro_markers,
            error_descriptions: config.error_descriptions,
        }
    }

    /// Macro registry used for lookups.
    pub fn macros(&self) -> &Arc<MacroRegistry> {
        &self.macros
    }

    /// Parser registry handed to macros.
    pub fn parsers(&self) -> &Arc<ParserRegistry> {
        &self.parsers
    }

    /// Expands the macro calls in the subtrees rooted at `roots`.
    pub fn transform_blocks(
        &self,
        xdom: &mut Xdom,
        roots: &[BlockId],
        ctx: &TransformationContext,
    ) -> Result<(), TransformationError> {
        let tree: &Xdom = xdom;
        let mut calls: Vec<(i32, BlockId)> = roots
            .iter()
            .flat_map(|root| tree.descendants(*root))
            .filter(|id| matches!(tree.kind(*id), BlockKind::Macro(_)))
            .map(|id| (self.call_priority(tree, id, ctx), id))
            .collect();
        calls.sort_by_key(|(priority, _)| *priority);

        for (_, id) in calls {
            if !xdom.is_attached(id) {
                continue;
            }
            if ctx.depth() >= self.max_depth {
                return Err(TransformationError::RecursionDepthExceeded {
                    max_depth: self.max_depth,
                });
            }
            let inserted = self.expand(xdom, id, ctx)?;
            if !inserted.is_empty() {
                self.transform_blocks(xdom, &inserted, &ctx.nested())?;
            }
        }
        Ok(())
    }

    fn call_priority(&self, xdom: &Xdom, id: BlockId, ctx: &TransformationContext) -> i32 {
        match xdom.kind(id) {
            BlockKind::Macro(call) => self
                .macros
                .lookup(&call.id, Some(&content_syntax(xdom, id, ctx)))
                .map_or(0, |found| found.priority()),
            _ => 0,
        }
    }

    /// Replaces one call with its output, or with an error marker.
    fn expand(
        &self,
        xdom: &mut Xdom,
        id: BlockId,
        ctx: &TransformationContext,
    ) -> Result<Vec<BlockId>, TransformationError> {
        let BlockKind::Macro(call) = xdom.kind(id).clone() else {
            return Ok(Vec::new());
        };
        let parameters = xdom.parameters(id).clone();
        let inline = call.inline || in_inline_container(xdom, id);

        let blocks = match self.execute(xdom, id, &call, &parameters, inline, ctx) {
            Ok(blocks) => blocks,
            Err(MacroError::Transformation(fatal)) => return Err(fatal),
            Err(err) => {
                log::warn!("macro [{}] failed: {}", call.id, err);
                error_blocks(&err, inline, self.error_descriptions)
            }
        };
        let blocks = if self.keep_macro_markers {
            vec![
                Block::new(BlockKind::MacroMarker(call))
                    .with_parameters(parameters)
                    .with_children(blocks),
            ]
        } else {
            blocks
        };
        Ok(xdom.replace(id, blocks)?)
    }

    fn execute(
        &self,
        xdom: &Xdom,
        id: BlockId,
        call: &MacroCall,
        parameters: &Parameters,
        inline: bool,
        ctx: &TransformationContext,
    ) -> Result<Vec<Block>, MacroError> {
        let syntax = content_syntax(xdom, id, ctx);
        let macro_impl = self.macros.lookup(&call.id, Some(&syntax))?;
        if inline && !macro_impl.supports_inline_mode() {
            return Err(ParameterError::InlineModeUnsupported(call.id.clone()).into());
        }
        let descriptor = macro_impl.descriptor();
        if ctx.is_restricted() && !descriptor.allowed_in_restricted_mode {
            return Err(MacroError::execution(format!(
                "The [{}] macro is not allowed in restricted mode",
                call.id
            )));
        }
        let parsed = descriptor.validate(parameters, call.content.as_deref())?;

        log::debug!(
            "executing macro [{}] at depth {} (inline: {})",
            call.id,
            ctx.depth(),
            inline
        );
        let macro_ctx = MacroTransformationContext {
            context: ctx,
            xdom,
            block: id,
            call,
            parameters,
            descriptor,
            inline,
            syntax,
            transformation: self,
        };
        macro_impl.execute(&parsed, call.content.as_deref(), &macro_ctx)
    }
}

impl Transformation for MacroTransformation {
    fn name(&self) -> &str {
        "macro"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn transform(
        &self,
        xdom: &mut Xdom,
        ctx: &TransformationContext,
    ) -> Result<(), TransformationError> {
        let root = xdom.root();
        self.transform_blocks(xdom, &[root], ctx)?;
        let dropped = xdom.compact();
        if dropped > 0 {
            log::trace!("dropped {} expanded macro nodes", dropped);
        }
        Ok(())
    }
}

/// Syntax of the content around `id`: the nearest `syntax` metadata, or
/// the context's source syntax.
fn content_syntax(xdom: &Xdom, id: BlockId, ctx: &TransformationContext) -> Syntax {
    xdom.metadata(id)
        .get(MetaData::SYNTAX)
        .and_then(|syntax| Syntax::parse(syntax).ok())
        .unwrap_or_else(|| ctx.source_syntax().clone())
}

/// Whether `id` sits in inline content. Macro markers and metadata wrappers
/// are transparent: the output of a macro inherits the position of its call.
fn in_inline_container(xdom: &Xdom, id: BlockId) -> bool {
    for ancestor in xdom.ancestors(id) {
        match xdom.kind(ancestor) {
            BlockKind::MacroMarker(call) if call.inline => return true,
            BlockKind::MacroMarker(_) | BlockKind::MetaData(_) => {}
            BlockKind::Paragraph
            | BlockKind::Header { .. }
            | BlockKind::Format(_)
            | BlockKind::Link { .. }
            | BlockKind::TableCell { .. }
            | BlockKind::ListItem => return true,
            _ => return false,
        }
    }
    false
}

/// What a macro sees while it executes.
///
/// Dereferences to the [`TransformationContext`] of the call.
pub struct MacroTransformationContext<'a> {
    context: &'a TransformationContext,
    xdom: &'a Xdom,
    block: BlockId,
    call: &'a MacroCall,
    parameters: &'a Parameters,
    descriptor: &'a MacroDescriptor,
    inline: bool,
    syntax: Syntax,
    transformation: &'a MacroTransformation,
}

impl<'a> MacroTransformationContext<'a> {
    /// Context of the transformation running the call.
    pub fn context(&self) -> &'a TransformationContext {
        self.context
    }

    /// Document being transformed.
    pub fn xdom(&self) -> &'a Xdom {
        self.xdom
    }

    /// Id of the call's block.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// The call being executed.
    pub fn call(&self) -> &'a MacroCall {
        self.call
    }

    /// Raw parameters of the call.
    pub fn parameters(&self) -> &'a Parameters {
        self.parameters
    }

    /// Descriptor of the executing macro.
    pub fn descriptor(&self) -> &'a MacroDescriptor {
        self.descriptor
    }

    /// Whether the call sits in inline content.
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Syntax of the content around the call.
    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Metadata in effect at the call.
    pub fn metadata(&self) -> MetaData {
        self.xdom.metadata(self.block)
    }

    /// `source` references of every enclosing `MetaData` block, nearest first.
    pub fn ancestor_sources(&self) -> Vec<String> {
        self.xdom
            .ancestors(self.block)
            .filter_map(|ancestor| match self.xdom.kind(ancestor) {
                BlockKind::MetaData(metadata) => metadata.get(MetaData::SOURCE).map(String::from),
                _ => None,
            })
            .collect()
    }

    /// Parses text in `syntax`.
    pub fn parse(&self, text: &str, syntax: &Syntax) -> Result<Xdom, MacroError> {
        self.transformation
            .parsers
            .parse(text, syntax)
            .map_err(|err| {
                MacroError::execution_with_source(
                    format!("Failed to parse content as [{}]", syntax),
                    err,
                )
            })
    }

    /// Parses macro content in the surrounding syntax.
    ///
    /// For inline calls a lone paragraph is unwrapped and a lone standalone
    /// macro call becomes an inline one.
    pub fn parse_content(&self, content: &str) -> Result<Vec<Block>, MacroError> {
        let blocks = self.parse(content, &self.syntax)?.to_blocks();
        if self.inline {
            Ok(unwrap_inline(blocks).unwrap_or_else(|blocks| blocks))
        } else {
            Ok(blocks)
        }
    }

    /// Parses macro content that must be inline.
    ///
    /// Fails when the content holds anything but a single paragraph or a
    /// single macro call.
    pub fn parse_inline_content(&self, content: &str) -> Result<Vec<Block>, MacroError> {
        let blocks = self.parse(content, &self.syntax)?.to_blocks();
        unwrap_inline(blocks).map_err(|_| {
            MacroError::execution(format!(
                "The content of the [{}] macro must be inline",
                self.call.id
            ))
        })
    }

    /// Runs the configured transformations on `xdom`, or only the macro
    /// transformation when no pipeline is configured.
    pub fn transform(
        &self,
        xdom: &mut Xdom,
        ctx: &TransformationContext,
    ) -> Result<(), TransformationError> {
        match ctx.pipeline() {
            Some(pipeline) => pipeline.transform(xdom, ctx),
            None => self.transformation.transform(xdom, ctx),
        }
    }
}

impl Deref for MacroTransformationContext<'_> {
    type Target = TransformationContext;

    fn deref(&self) -> &TransformationContext {
        self.context
    }
}

/// Unwraps a single paragraph; returns the blocks unchanged as `Err` when
/// they are not inline content.
pub(crate) fn unwrap_inline(mut blocks: Vec<Block>) -> Result<Vec<Block>, Vec<Block>> {
    if blocks.len() > 1 {
        return Err(blocks);
    }
    match blocks.pop() {
        None => Ok(Vec::new()),
        Some(block) if block.kind == BlockKind::Paragraph => Ok(block.children),
        Some(mut block) => {
            let is_macro = if let BlockKind::Macro(call) = &mut block.kind {
                call.inline = true;
                true
            } else {
                false
            };
            if is_macro { Ok(vec![block]) } else { Err(vec![block]) }
        }
    }
}
