use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use wikiflow_core::{Block, MacroCall, Parameters, Syntax};
use wikiflow_render::{
    AllowAll, BatchInput, BatchOptions, Components, Converter, DenyList, InMemoryDocuments, Macro,
    MacroDescriptor, MacroError, MacroTransformationContext, RenderingConfig, RenderingError,
    TransformationError, macros::ParsedParameters,
};

static WIKI: Lazy<Converter> = Lazy::new(|| {
    let documents = InMemoryDocuments::new()
        .with_document(
            "Main.A",
            "a text\n\n{{include reference=\"Main.B\"/}}",
            Syntax::XWIKI_2_1,
        )
        .with_document(
            "Main.B",
            "b text\n\n{{include reference=\"Main.A\"/}}",
            Syntax::XWIKI_2_1,
        )
        .with_document(
            "Main.Sections",
            "= One =\n\nfirst\n\n= Two =\n\nsecond",
            Syntax::XWIKI_2_1,
        )
        .with_document("Main.Plain", "**not bold**", Syntax::PLAIN_1_0)
        .with_document("Main.One", "just **one**", Syntax::XWIKI_2_1)
        .with_document("Main.Two", "a\n\nb", Syntax::XWIKI_2_1)
        .with_document("Secret.Page", "classified", Syntax::XWIKI_2_1);
    Converter::new(Components::with_defaults(
        Arc::new(documents),
        Arc::new(DenyList::new(["Secret.Page"])),
    ))
});

fn plain(text: &str) -> String {
    WIKI.convert(text, &Syntax::XWIKI_2_1, &Syntax::PLAIN_1_0)
        .expect("render should succeed")
}

fn converter_with(config: RenderingConfig) -> Converter {
    Converter::new(Components::with_config(
        Arc::new(InMemoryDocuments::new()),
        Arc::new(AllowAll),
        config,
    ))
}

/// Appends its id to a shared log and outputs the log position.
struct Recorder {
    descriptor: MacroDescriptor,
    priority: i32,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn new(id: &str, priority: i32, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            descriptor: MacroDescriptor::new(id, id),
            priority,
            log: log.clone(),
        }
    }
}

impl Macro for Recorder {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn execute(
        &self,
        _parameters: &ParsedParameters,
        _content: Option<&str>,
        _ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError> {
        let mut log = self.log.lock().unwrap();
        log.push(self.descriptor.id.clone());
        Ok(vec![Block::paragraph(Block::text(&format!(
            "{} ran {}",
            self.descriptor.id,
            log.len()
        )))])
    }
}

/// Inline macro whose output calls a standalone-only macro.
struct Wrap {
    descriptor: MacroDescriptor,
    inner: String,
}

impl Macro for Wrap {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn supports_inline_mode(&self) -> bool {
        true
    }

    fn execute(
        &self,
        _parameters: &ParsedParameters,
        _content: Option<&str>,
        _ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError> {
        Ok(vec![Block::macro_call(
            MacroCall::new(&self.inner, false),
            Parameters::new(),
        )])
    }
}

/// Emits another call to itself and counts its executions.
struct Runaway {
    descriptor: MacroDescriptor,
    runs: Arc<Mutex<usize>>,
}

impl Macro for Runaway {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        _parameters: &ParsedParameters,
        _content: Option<&str>,
        _ctx: &MacroTransformationContext<'_>,
    ) -> Result<Vec<Block>, MacroError> {
        *self.runs.lock().unwrap() += 1;
        Ok(vec![Block::macro_call(
            MacroCall::new("runaway", false),
            Parameters::new(),
        )])
    }
}

#[test]
fn unknown_macro_leaves_the_rest_of_the_page() {
    let output = plain("{{bold}}hi{{/bold}}\n{{unknownMacro/}}");

    let hi = output.find("hi").expect("bold content is rendered");
    let marker = output
        .find("Unknown macro: unknownMacro.")
        .expect("error marker is rendered");
    assert!(hi < marker, "unexpected output {:?}", output);
}

#[test]
fn one_bad_macro_yields_one_marker() {
    let html = WIKI
        .convert(
            "{{bold}}a{{/bold}}\n\n{{nope/}}\n\n{{italic}}b{{/italic}}",
            &Syntax::XWIKI_2_1,
            &Syntax::XHTML_1_0,
        )
        .expect("render should succeed");

    assert_eq!(html.matches("class=\"wikiflow-error\"").count(), 1);
    let bold = html.find("<strong>a</strong>").expect("bold expanded");
    let error = html.find("Unknown macro: nope.").expect("marker present");
    let italic = html.find("<em>b</em>").expect("italic expanded");
    assert!(bold < error && error < italic);
}

#[test]
fn runaway_expansion_stops_at_the_configured_depth() {
    let converter = converter_with(RenderingConfig {
        max_recursion_depth: 5,
        ..RenderingConfig::default()
    });
    let runs = Arc::new(Mutex::new(0));
    converter.components().macros.register(Arc::new(Runaway {
        descriptor: MacroDescriptor::new("runaway", "Runaway"),
        runs: runs.clone(),
    }));

    let err = converter
        .convert("{{runaway/}}", &Syntax::XWIKI_2_1, &Syntax::PLAIN_1_0)
        .unwrap_err();

    assert!(matches!(
        err,
        RenderingError::Transformation(TransformationError::RecursionDepthExceeded {
            max_depth: 5
        })
    ));
    assert_eq!(*runs.lock().unwrap(), 5);
}

#[test]
fn mutual_inclusion_is_detected_on_second_entry() {
    let output = WIKI
        .render_document("Main.A", &Syntax::PLAIN_1_0)
        .expect("render should succeed");

    assert!(output.starts_with("a text\n\nb text"), "got {:?}", output);
    assert!(output.contains("Found recursive inclusion of document [Main.A]"));
    assert_eq!(output.matches("b text").count(), 1);
}

#[test]
fn mutual_inclusion_without_a_document_context() {
    let output = plain("{{include reference=\"Main.A\"/}}");

    assert_eq!(output.matches("a text").count(), 1);
    assert_eq!(output.matches("b text").count(), 1);
    assert!(output.contains("Found recursive inclusion of document [Main.A]"));
}

#[test]
fn lower_priority_runs_first() {
    let converter = converter_with(RenderingConfig::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let macros = &converter.components().macros;
    macros.register(Arc::new(Recorder::new("late", 20, &log)));
    macros.register(Arc::new(Recorder::new("early", 10, &log)));

    let output = converter
        .convert("{{late/}}\n\n{{early/}}", &Syntax::XWIKI_2_1, &Syntax::PLAIN_1_0)
        .expect("render should succeed");

    assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
    // document order is kept in the output
    assert_eq!(output, "late ran 2\n\nearly ran 1");
}

#[test]
fn standalone_macro_used_inline_is_an_error() {
    let converter = converter_with(RenderingConfig::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    converter
        .components()
        .macros
        .register(Arc::new(Recorder::new("box", 0, &log)));

    let output = converter
        .convert("text {{box/}} more", &Syntax::XWIKI_2_1, &Syntax::PLAIN_1_0)
        .expect("render should succeed");

    assert!(log.lock().unwrap().is_empty());
    assert!(output.starts_with("text "));
    assert!(output.contains("The [box] macro is a standalone macro and it cannot be used inline"));
}

#[test]
fn standalone_macro_emitted_by_an_inline_macro_is_an_error() {
    let converter = converter_with(RenderingConfig::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let macros = &converter.components().macros;
    macros.register(Arc::new(Recorder::new("box", 0, &log)));
    macros.register(Arc::new(Wrap {
        descriptor: MacroDescriptor::new("wrap", "Wrap"),
        inner: "box".into(),
    }));

    let html = converter
        .convert("text {{wrap/}} more", &Syntax::XWIKI_2_1, &Syntax::XHTML_1_0)
        .expect("render should succeed");

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(html.matches("<p>").count(), 1, "got {:?}", html);
    assert!(html.contains("The [box] macro is a standalone macro and it cannot be used inline"));
}

#[test]
fn inline_include_needs_inline_content() {
    let one = WIKI
        .convert(
            "x {{include reference=\"Main.One\"/}} y",
            &Syntax::XWIKI_2_1,
            &Syntax::XHTML_1_0,
        )
        .expect("render should succeed");
    assert_eq!(one.matches("<p>").count(), 1, "got {:?}", one);
    assert!(one.contains("just <strong>one</strong>"));

    let two = WIKI
        .convert(
            "x {{include reference=\"Main.Two\"/}} y",
            &Syntax::XWIKI_2_1,
            &Syntax::XHTML_1_0,
        )
        .expect("render should succeed");
    assert_eq!(two.matches("<p>").count(), 1, "got {:?}", two);
    assert!(two.contains("Cannot include document [Main.Two] inline"));
}

#[test]
fn include_a_single_section() {
    assert_eq!(
        plain("{{include reference=\"Main.Sections\" section=\"HTwo\"/}}"),
        "Two\n\nsecond"
    );
    assert_eq!(
        plain(
            "{{include reference=\"Main.Sections\" section=\"HTwo\" excludeFirstHeading=\"true\"/}}"
        ),
        "second"
    );
    assert!(
        plain("{{include reference=\"Main.Sections\" section=\"HThree\"/}}")
            .contains("Cannot find section [HThree] in document [Main.Sections]")
    );
}

#[test]
fn included_document_keeps_its_own_syntax() {
    assert_eq!(
        plain("{{include reference=\"Main.Plain\"/}}"),
        "**not bold**"
    );
}

#[test]
fn include_checks_existence_and_rights() {
    assert!(
        plain("{{include reference=\"Secret.Page\"/}}")
            .contains("Current user doesn't have view rights on document [Secret.Page]")
    );
    assert!(
        plain("{{include reference=\"Main.Missing\"/}}")
            .contains("Document [Main.Missing] does not exist")
    );
    assert!(plain("{{include/}}").contains("Mandatory parameter [reference] is missing"));
}

#[test]
fn restricted_mode_blocks_raw_html() {
    let text = "{{html}}<b>x</b>{{/html}}";

    let open = converter_with(RenderingConfig::default())
        .convert(text, &Syntax::XWIKI_2_1, &Syntax::XHTML_1_0)
        .expect("render should succeed");
    assert_eq!(open, "<b>x</b>");

    let restricted = converter_with(RenderingConfig {
        restricted: true,
        ..RenderingConfig::default()
    })
    .convert(text, &Syntax::XWIKI_2_1, &Syntax::XHTML_1_0)
    .expect("render should succeed");
    assert!(!restricted.contains("<b>x</b>"));
    assert!(restricted.contains("The [html] macro is not allowed in restricted mode"));
}

#[test]
fn markers_can_be_dropped_from_the_tree() {
    let text = "{{bold}}hi{{/bold}}";
    let kept = converter_with(RenderingConfig::default())
        .convert(text, &Syntax::XWIKI_2_1, &Syntax::EVENT_1_0)
        .expect("render should succeed");
    let dropped = converter_with(RenderingConfig {
        keep_macro_markers: false,
        ..RenderingConfig::default()
    })
    .convert(text, &Syntax::XWIKI_2_1, &Syntax::EVENT_1_0)
    .expect("render should succeed");

    assert!(kept.contains("beginMacroMarkerStandalone [bold] [] [hi]"));
    assert!(!dropped.contains("MacroMarker"));
    assert!(dropped.contains("beginFormat [BOLD]"));
}

#[test]
fn batch_renders_in_parallel_and_keeps_order() {
    let inputs = vec![
        BatchInput::new("first", "**one**"),
        BatchInput::new("second", "two").with_syntax(Syntax::new("markdown", "1.0")),
        BatchInput::new("third", "{{italic}}three{{/italic}}"),
    ];
    let options = BatchOptions {
        max_threads: Some(2),
        ..BatchOptions::default()
    };

    let batch = WIKI
        .render_batch(inputs, &Syntax::PLAIN_1_0, &options)
        .expect("default syntax is valid");

    let ids: Vec<&str> = batch.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
    assert_eq!(batch.results[0].output.as_deref(), Some("one"));
    assert!(batch.results[1].error.as_deref().unwrap().contains("markdown/1.0"));
    assert_eq!(batch.results[2].output.as_deref(), Some("three"));
    assert_eq!(batch.stats.total, 3);
    assert_eq!(batch.stats.succeeded, 2);
    assert_eq!(batch.stats.failed, 1);
}

#[test]
fn batch_stops_at_first_error_when_asked() {
    let inputs = vec![
        BatchInput::new("ok", "fine"),
        BatchInput::new("bad", "x").with_syntax(Syntax::new("markdown", "1.0")),
        BatchInput::new("never", "unreached"),
    ];
    let options = BatchOptions {
        continue_on_error: false,
        ..BatchOptions::default()
    };

    let batch = WIKI
        .render_batch(inputs, &Syntax::PLAIN_1_0, &options)
        .expect("default syntax is valid");

    assert_eq!(batch.results.len(), 2);
    assert!(batch.results[1].error.is_some());
    assert_eq!(batch.stats.total, 3);
    assert_eq!(batch.stats.succeeded, 1);
    assert_eq!(batch.stats.failed, 1);
}
