//! The conversion facade: parse, transform, render.

use crate::batch::{BatchInput, BatchOptions, BatchProcessingResult, BatchResult, BatchStats};
use crate::config::RenderingConfig;
use crate::documents::{DocumentAccess, Permissions};
use crate::error::{ConfigError, RenderingError};
use crate::macros::{MacroRegistry, MacroTransformation};
use crate::renderer::RendererRegistry;
use crate::transformation::{TransformationContext, TransformationManager};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use wikiflow_core::{ParserRegistry, Syntax, SyntaxRegistry, Xdom};

/// Everything a [`Converter`] needs, built once and shared by every render.
///
/// All registries are read-mostly and may be extended after construction.
#[derive(Clone)]
pub struct Components {
    /// Known syntaxes.
    pub syntaxes: Arc<SyntaxRegistry>,
    /// Parsers by syntax.
    pub parsers: Arc<ParserRegistry>,
    /// Renderers by syntax.
    pub renderers: Arc<RendererRegistry>,
    /// Macros by id.
    pub macros: Arc<MacroRegistry>,
    /// Transformations run between parsing and rendering.
    pub transformations: Arc<TransformationManager>,
    /// Store used by [`Converter::render_document`] and the `include` macro.
    pub documents: Arc<dyn DocumentAccess>,
    /// Shared settings.
    pub config: RenderingConfig,
}

impl Components {
    /// Built-in syntaxes, parsers, renderers and macros with the default
    /// configuration.
    pub fn with_defaults(
        documents: Arc<dyn DocumentAccess>,
        permissions: Arc<dyn Permissions>,
    ) -> Self {
        Self::with_config(documents, permissions, RenderingConfig::default())
    }

    /// Built-in components configured by `config`.
    pub fn with_config(
        documents: Arc<dyn DocumentAccess>,
        permissions: Arc<dyn Permissions>,
        config: RenderingConfig,
    ) -> Self {
        let parsers = Arc::new(ParserRegistry::with_defaults());
        let macros = Arc::new(MacroRegistry::with_defaults(documents.clone(), permissions));
        let transformations = Arc::new(TransformationManager::new());
        transformations.register(Arc::new(MacroTransformation::with_config(
            macros.clone(),
            parsers.clone(),
            &config,
        )));
        Self {
            syntaxes: Arc::new(SyntaxRegistry::with_defaults()),
            parsers,
            renderers: Arc::new(RendererRegistry::with_defaults()),
            macros,
            transformations,
            documents,
            config,
        }
    }
}

/// Converts text between syntaxes, expanding macros on the way.
///
/// A converter is `Send + Sync`; each call builds its own tree and context,
/// so concurrent calls share nothing mutable.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use wikiflow_core::Syntax;
/// use wikiflow_render::{AllowAll, Components, Converter, InMemoryDocuments};
///
/// let components = Components::with_defaults(Arc::new(InMemoryDocuments::new()), Arc::new(AllowAll));
/// let converter = Converter::new(components);
/// let html = converter
///     .convert("Hello {{bold}}world{{/bold}}", &Syntax::XWIKI_2_1, &Syntax::XHTML_1_0)
///     .unwrap();
/// assert_eq!(html, "<p>Hello <strong>world</strong></p>");
/// ```
pub struct Converter {
    components: Components,
}

impl Converter {
    /// Creates a converter.
    pub fn new(components: Components) -> Self {
        Self { components }
    }

    /// The shared components.
    pub fn components(&self) -> &Components {
        &self.components
    }

    /// A fresh root context for a render from `source` to `target`.
    pub fn context(&self, source: &Syntax, target: &Syntax) -> TransformationContext {
        TransformationContext::new(source.clone())
            .with_target_syntax(target.clone())
            .with_restricted(self.components.config.restricted)
            .with_pipeline(self.components.transformations.clone())
    }

    /// Parses `text` without transforming it.
    pub fn parse(&self, text: &str, source: &Syntax) -> Result<Xdom, RenderingError> {
        Ok(self.components.parsers.parse(text, source)?)
    }

    /// Runs every registered transformation over `xdom`.
    pub fn transform(
        &self,
        xdom: &mut Xdom,
        ctx: &TransformationContext,
    ) -> Result<(), RenderingError> {
        Ok(self.components.transformations.transform(xdom, ctx)?)
    }

    /// Serializes an already transformed tree.
    pub fn render(&self, xdom: &Xdom, target: &Syntax) -> Result<String, RenderingError> {
        self.components.renderers.render(xdom, target)
    }

    /// Parses, transforms and renders `text`.
    pub fn convert(
        &self,
        text: &str,
        source: &Syntax,
        target: &Syntax,
    ) -> Result<String, RenderingError> {
        let ctx = self.context(source, target);
        self.convert_in(text, target, &ctx)
    }

    /// [`convert`](Self::convert) with syntaxes given as identifiers, resolved
    /// through the syntax registry.
    pub fn convert_ids(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, RenderingError> {
        let source = self.components.syntaxes.resolve(source)?;
        let target = self.components.syntaxes.resolve(target)?;
        self.convert(text, &source, &target)
    }

    /// Loads a stored document and converts it.
    ///
    /// The reference is marked in progress for the whole render, so a
    /// document that includes itself, directly or not, is caught.
    pub fn render_document(
        &self,
        reference: &str,
        target: &Syntax,
    ) -> Result<String, RenderingError> {
        let document = self.components.documents.content(reference)?;
        log::debug!(
            "rendering document [{}] from [{}] to [{}]",
            reference,
            document.syntax,
            target
        );
        let ctx = self.context(&document.syntax, target).with_id(reference);
        let _guard = ctx.in_progress().enter(reference);
        self.convert_in(&document.text, target, &ctx)
    }

    /// Converts every input to `target`, in parallel unless
    /// `continue_on_error` is off.
    ///
    /// Results keep the input order. Inputs without a syntax use the
    /// configured default syntax.
    pub fn render_batch(
        &self,
        inputs: Vec<BatchInput>,
        target: &Syntax,
        options: &BatchOptions,
    ) -> Result<BatchProcessingResult, ConfigError> {
        let start = Instant::now();
        let default_syntax = self.components.config.default_syntax()?;

        let pool = options.max_threads.and_then(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| log::warn!("falling back to the global thread pool: {}", err))
                .ok()
        });

        let total = inputs.len() as u32;
        let succeeded = AtomicU32::new(0);
        let failed = AtomicU32::new(0);

        let process_input = |input: BatchInput| -> BatchResult {
            let source = input.syntax.unwrap_or_else(|| default_syntax.clone());
            match self.convert(&input.text, &source, target) {
                Ok(output) => {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    BatchResult {
                        id: input.id,
                        output: Some(output),
                        error: None,
                    }
                }
                Err(err) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    log::debug!("batch input [{}] failed: {}", input.id, err);
                    BatchResult {
                        id: input.id,
                        output: None,
                        error: Some(err.to_string()),
                    }
                }
            }
        };

        let results: Vec<BatchResult> = if options.continue_on_error {
            match pool {
                Some(pool) => pool.install(|| inputs.into_par_iter().map(process_input).collect()),
                None => inputs.into_par_iter().map(process_input).collect(),
            }
        } else {
            let mut results = Vec::with_capacity(inputs.len());
            for input in inputs {
                let result = process_input(input);
                let stop = !result.is_ok();
                results.push(result);
                if stop {
                    break;
                }
            }
            results
        };

        Ok(BatchProcessingResult {
            results,
            stats: BatchStats {
                total,
                succeeded: succeeded.load(Ordering::Relaxed),
                failed: failed.load(Ordering::Relaxed),
                processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
        })
    }

    fn convert_in(
        &self,
        text: &str,
        target: &Syntax,
        ctx: &TransformationContext,
    ) -> Result<String, RenderingError> {
        let mut xdom = self.parse(text, ctx.source_syntax())?;
        self.transform(&mut xdom, ctx)?;
        self.render(&xdom, target)
    }
}
