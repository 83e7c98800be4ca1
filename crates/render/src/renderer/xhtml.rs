use super::Renderer;
use super::output::{HtmlOutput, Scope};
use crate::error::RenderError;
use wikiflow_core::{Block, BlockKind, Format, ListKind, ResourceType, Syntax, Xdom};

/// Renders XHTML 1.0 fragments.
///
/// Block parameters become attributes. Raw blocks pass through when they
/// are XHTML or HTML, are escaped when plain, and are dropped otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct XhtmlRenderer;

impl XhtmlRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for XhtmlRenderer {
    fn syntax(&self) -> Syntax {
        Syntax::XHTML_1_0
    }

    fn render(&self, xdom: &Xdom) -> Result<String, RenderError> {
        let root = xdom.to_block(xdom.root());
        let mut out = HtmlOutput::new();
        render_children(&root, &mut out);
        Ok(out.finish())
    }
}

fn render_children(block: &Block, out: &mut HtmlOutput) {
    for child in &block.children {
        render_block(child, out);
    }
}

fn phrasing(tag: &str, attributes: &[(&str, &str)], block: &Block, out: &mut HtmlOutput) {
    out.open_tag(tag, attributes, &block.parameters);
    out.enter(Scope::Paragraph);
    render_children(block, out);
    out.exit();
    out.close_tag(tag);
}

fn href(kind: ResourceType, reference: &str) -> String {
    match kind {
        ResourceType::Mailto if !reference.starts_with("mailto:") => format!("mailto:{}", reference),
        _ => reference.to_string(),
    }
}

fn format_tag(format: Format) -> &'static str {
    match format {
        Format::Bold => "strong",
        Format::Italic => "em",
        Format::Underlined => "ins",
        Format::StrikedOut => "del",
        Format::Superscript => "sup",
        Format::Subscript => "sub",
        Format::Monospace => "tt",
        Format::None => "span",
    }
}

fn render_block(block: &Block, out: &mut HtmlOutput) {
    match &block.kind {
        BlockKind::Document
        | BlockKind::Section
        | BlockKind::MetaData(_)
        | BlockKind::MacroMarker(_) => render_children(block, out),
        BlockKind::Paragraph => phrasing("p", &[], block, out),
        BlockKind::Header { level, id } => {
            let tag = format!("h{}", (*level).clamp(1, 6));
            let attributes: Vec<(&str, &str)> = id.iter().map(|id| ("id", id.as_str())).collect();
            out.open_tag(&tag, &attributes, &block.parameters);
            out.enter(Scope::Paragraph);
            out.push_raw("<span>");
            render_children(block, out);
            out.push_raw("</span>");
            out.exit();
            out.close_tag(&tag);
        }
        BlockKind::List(kind) => {
            let tag = match kind {
                ListKind::Bulleted => "ul",
                ListKind::Numbered => "ol",
            };
            out.open_tag(tag, &[], &block.parameters);
            out.enter(Scope::Root);
            render_children(block, out);
            out.exit();
            out.close_tag(tag);
        }
        BlockKind::ListItem => phrasing("li", &[], block, out),
        BlockKind::Table => {
            out.open_tag("table", &[], &block.parameters);
            out.push_raw("<tbody>");
            out.enter(Scope::Root);
            render_children(block, out);
            out.exit();
            out.push_raw("</tbody>");
            out.close_tag("table");
        }
        BlockKind::TableRow => {
            out.open_tag("tr", &[], &block.parameters);
            render_children(block, out);
            out.close_tag("tr");
        }
        BlockKind::TableCell { header } => {
            phrasing(if *header { "th" } else { "td" }, &[], block, out)
        }
        BlockKind::Group => {
            let tag = if out.is_in_paragraph() { "span" } else { "div" };
            out.open_tag(tag, &[], &block.parameters);
            out.enter(Scope::Root);
            render_children(block, out);
            out.exit();
            out.close_tag(tag);
        }
        BlockKind::Format(Format::None) if block.parameters.is_empty() => {
            render_children(block, out)
        }
        BlockKind::Format(format) => phrasing(format_tag(*format), &[], block, out),
        BlockKind::Link { reference, .. } => {
            let target = href(reference.kind, &reference.reference);
            out.open_tag("a", &[("href", target.as_str())], &block.parameters);
            if block.children.is_empty() {
                out.push_raw("<span class=\"wikigeneratedlinkcontent\">");
                out.push_text(&reference.reference);
                out.push_raw("</span>");
            } else {
                render_children(block, out);
            }
            out.close_tag("a");
        }
        BlockKind::Image { reference, .. } => {
            out.void_tag(
                "img",
                &[("src", reference.reference.as_str()), ("alt", reference.reference.as_str())],
                &block.parameters,
            );
        }
        BlockKind::Word(word) => out.push_text(word),
        BlockKind::Space => out.push_raw(" "),
        BlockKind::SpecialSymbol(c) => out.push_text(c.encode_utf8(&mut [0; 4])),
        BlockKind::NewLine => out.push_raw("<br/>"),
        BlockKind::VerbatimInline(text) => {
            out.open_tag("tt", &[("class", "wikimodel-verbatim")], &block.parameters);
            out.push_text(text);
            out.close_tag("tt");
        }
        BlockKind::VerbatimStandalone(text) => {
            let tag = if out.is_in_paragraph() { "tt" } else { "pre" };
            out.open_tag(tag, &[], &block.parameters);
            out.push_text(text);
            out.close_tag(tag);
        }
        BlockKind::HorizontalLine => out.push_raw("<hr/>"),
        BlockKind::Raw { content, syntax } => match syntax.syntax_type() {
            "xhtml" | "html" => out.push_raw(content),
            "plain" => out.push_text(content),
            _ => log::warn!("dropping raw content of syntax [{}] from xhtml output", syntax),
        },
        BlockKind::Macro(call) => {
            log::debug!("unexpanded macro [{}] produces no xhtml", call.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikiflow_core::{MacroCall, Parser, XWikiParser};

    fn render(text: &str) -> String {
        let xdom = XWikiParser::new().parse(text).unwrap();
        XhtmlRenderer::new().render(&xdom).unwrap()
    }

    #[test]
    fn test_paragraph_and_formats() {
        assert_eq!(
            render("a **b** //c// 1 < 2"),
            "<p>a <strong>b</strong> <em>c</em> 1 &lt; 2</p>"
        );
    }

    #[test]
    fn test_header_carries_id() {
        assert_eq!(
            render("= Hello World ="),
            r#"<h1 id="HHelloWorld"><span>Hello World</span></h1>"#
        );
    }

    #[test]
    fn test_lists_and_tables() {
        assert_eq!(
            render("* a\n** b\n* c"),
            "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"
        );
        assert_eq!(
            render("|=h|c"),
            "<table><tbody><tr><th>h</th><td>c</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_parameters_become_attributes() {
        assert_eq!(
            render("(% class=\"note\" %)\n(((\ninside\n)))"),
            r#"<div class="note"><p>inside</p></div>"#
        );
        assert_eq!(
            render("(% style=\"color:red\" %)red(%%)"),
            r#"<p><span style="color:red">red</span></p>"#
        );
    }

    #[test]
    fn test_image() {
        assert_eq!(
            render("[[image:logo.png||width=\"20\"]]"),
            r#"<p><img src="logo.png" alt="logo.png" width="20"/></p>"#
        );
    }

    #[test]
    fn test_links_and_verbatim() {
        assert_eq!(
            render("[[Main.Page]] [[x>>https://e.org]] {{{<b>}}}"),
            concat!(
                r#"<p><a href="Main.Page"><span class="wikigeneratedlinkcontent">Main.Page</span></a> "#,
                r#"<a href="https://e.org">x</a> <tt class="wikimodel-verbatim">&lt;b&gt;</tt></p>"#
            )
        );
    }

    #[test]
    fn test_raw_and_unexpanded_macros() {
        let xdom = Xdom::from_blocks(vec![
            Block::new(BlockKind::Raw {
                content: "<b>raw</b>".into(),
                syntax: Syntax::XHTML_1_0,
            }),
            Block::new(BlockKind::Raw {
                content: "**x**".into(),
                syntax: Syntax::XWIKI_2_1,
            }),
            Block::macro_call(MacroCall::new("toc", false), Default::default()),
        ]);
        assert_eq!(XhtmlRenderer::new().render(&xdom).unwrap(), "<b>raw</b>");
    }
}
