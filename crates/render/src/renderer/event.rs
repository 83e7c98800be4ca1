use super::Renderer;
use crate::error::RenderError;
use wikiflow_core::{Block, BlockKind, ListKind, MacroCall, Parameters, ResourceReference, Syntax, Xdom};

/// Renders a trace of structural events, one per line.
///
/// Used by tests to compare trees in a readable form. Containers emit a
/// `begin`/`end` pair, leaves a single `on` line. Non-empty block
/// parameters are appended as `[[name]=[value]...]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventRenderer;

impl EventRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for EventRenderer {
    fn syntax(&self) -> Syntax {
        Syntax::EVENT_1_0
    }

    fn render(&self, xdom: &Xdom) -> Result<String, RenderError> {
        let mut events = Vec::new();
        emit(&xdom.to_block(xdom.root()), &mut events);
        Ok(events.join("\n"))
    }
}

fn bracketed_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::from("[");
    for (name, value) in pairs {
        out.push_str(&format!("[{}]=[{}]", name, value));
    }
    out.push(']');
    out
}

fn with_parameters(event: String, parameters: &Parameters) -> String {
    if parameters.is_empty() {
        return event;
    }
    let pairs = parameters
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()));
    format!("{} {}", event, bracketed_pairs(pairs))
}

fn macro_arguments(call: &MacroCall, parameters: &Parameters) -> String {
    let parameters: Vec<String> = parameters
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    format!(
        "[{}] [{}] [{}]",
        call.id,
        parameters.join("|"),
        call.content.as_deref().unwrap_or_default()
    )
}

fn reference_arguments(reference: &ResourceReference, free_standing: bool) -> String {
    format!(
        "[Typed = [{}] Type = [{}] Reference = [{}]] [{}]",
        reference.typed,
        reference.kind.prefix(),
        reference.reference,
        free_standing
    )
}

fn list_name(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bulleted => "BULLETED",
        ListKind::Numbered => "NUMBERED",
    }
}

fn mode(inline: bool) -> &'static str {
    if inline { "Inline" } else { "Standalone" }
}

/// Name and arguments of a container, or `None` for a leaf.
fn container(block: &Block) -> Option<(String, String)> {
    let container = match &block.kind {
        BlockKind::Document => ("Document".to_string(), String::new()),
        BlockKind::Paragraph => ("Paragraph".to_string(), String::new()),
        BlockKind::Section => ("Section".to_string(), String::new()),
        BlockKind::Header { level, id } => (
            "Header".to_string(),
            format!(" [{}, {}]", level, id.as_deref().unwrap_or_default()),
        ),
        BlockKind::List(kind) => ("List".to_string(), format!(" [{}]", list_name(*kind))),
        BlockKind::ListItem => ("ListItem".to_string(), String::new()),
        BlockKind::Table => ("Table".to_string(), String::new()),
        BlockKind::TableRow => ("TableRow".to_string(), String::new()),
        BlockKind::TableCell { header: true } => ("TableHeadCell".to_string(), String::new()),
        BlockKind::TableCell { header: false } => ("TableCell".to_string(), String::new()),
        BlockKind::Group => ("Group".to_string(), String::new()),
        BlockKind::Format(format) => ("Format".to_string(), format!(" [{}]", format.name())),
        BlockKind::MetaData(metadata) => (
            "MetaData".to_string(),
            format!(" {}", bracketed_pairs(metadata.iter())),
        ),
        BlockKind::MacroMarker(call) => (
            format!("MacroMarker{}", mode(call.inline)),
            format!(" {}", macro_arguments(call, &block.parameters)),
        ),
        BlockKind::Link {
            reference,
            free_standing,
        } => (
            "Link".to_string(),
            format!(" {}", reference_arguments(reference, *free_standing)),
        ),
        _ => return None,
    };
    Some(container)
}

fn emit(block: &Block, events: &mut Vec<String>) {
    // macro parameters are part of the macro arguments, not block parameters
    let none = Parameters::new();
    let parameters = match block.kind {
        BlockKind::Macro(_) | BlockKind::MacroMarker(_) => &none,
        _ => &block.parameters,
    };
    if let Some((name, arguments)) = container(block) {
        events.push(with_parameters(
            format!("begin{}{}", name, arguments),
            parameters,
        ));
        for child in &block.children {
            emit(child, events);
        }
        events.push(with_parameters(format!("end{}{}", name, arguments), parameters));
        return;
    }
    let event = match &block.kind {
        BlockKind::Word(word) => format!("onWord [{}]", word),
        BlockKind::Space => "onSpace".to_string(),
        BlockKind::SpecialSymbol(c) => format!("onSpecialSymbol [{}]", c),
        BlockKind::NewLine => "onNewLine".to_string(),
        BlockKind::VerbatimInline(text) => format!("onVerbatim [{}] [true]", text),
        BlockKind::VerbatimStandalone(text) => format!("onVerbatim [{}] [false]", text),
        BlockKind::HorizontalLine => "onHorizontalLine".to_string(),
        BlockKind::Raw { content, syntax } => format!("onRawText [{}] [{}]", content, syntax),
        BlockKind::Image {
            reference,
            free_standing,
        } => format!("onImage {}", reference_arguments(reference, *free_standing)),
        BlockKind::Macro(call) => format!(
            "onMacro{} {}",
            mode(call.inline),
            macro_arguments(call, &block.parameters)
        ),
        other => format!("on{}", other.name()),
    };
    events.push(with_parameters(event, parameters));
}
