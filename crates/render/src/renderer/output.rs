//! Output buffer for the XHTML renderer.

use wikiflow_core::Parameters;

/// Construct the writer is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Scope {
    /// Top level or a block container.
    Root,
    /// Inside phrasing content: `<p>`, a heading, a list item or a cell.
    Paragraph,
}

/// HTML buffer with a scope stack.
pub(super) struct HtmlOutput {
    html: String,
    stack: Vec<Scope>,
}

impl HtmlOutput {
    pub(super) fn new() -> Self {
        Self {
            html: String::with_capacity(4096),
            stack: vec![Scope::Root],
        }
    }

    /// Writes markup as is.
    pub(super) fn push_raw(&mut self, s: &str) {
        self.html.push_str(s);
    }

    /// Writes a text node.
    pub(super) fn push_text(&mut self, s: &str) {
        html_escape::encode_text_to_string(s, &mut self.html);
    }

    /// Writes the inside of a double-quoted attribute value.
    pub(super) fn push_attr_value(&mut self, s: &str) {
        html_escape::encode_double_quoted_attribute_to_string(s, &mut self.html);
    }

    /// Writes ` name="value"`.
    pub(super) fn push_attr(&mut self, name: &str, value: &str) {
        self.html.push(' ');
        self.html.push_str(name);
        self.html.push_str("=\"");
        self.push_attr_value(value);
        self.html.push('"');
    }

    fn start_tag(&mut self, tag: &str, attributes: &[(&str, &str)], parameters: &Parameters) {
        self.html.push('<');
        self.html.push_str(tag);
        for (name, value) in attributes {
            self.push_attr(name, value);
        }
        for (name, value) in parameters {
            if attributes.iter().any(|(taken, _)| taken == name) {
                continue;
            }
            self.push_attr(name, value);
        }
    }

    /// Writes `<tag attrs...>`, block parameters becoming attributes.
    pub(super) fn open_tag(&mut self, tag: &str, attributes: &[(&str, &str)], parameters: &Parameters) {
        self.start_tag(tag, attributes, parameters);
        self.html.push('>');
    }

    /// Writes `<tag attrs.../>`.
    pub(super) fn void_tag(&mut self, tag: &str, attributes: &[(&str, &str)], parameters: &Parameters) {
        self.start_tag(tag, attributes, parameters);
        self.html.push_str("/>");
    }

    pub(super) fn close_tag(&mut self, tag: &str) {
        self.html.push_str("</");
        self.html.push_str(tag);
        self.html.push('>');
    }

    pub(super) fn is_in_paragraph(&self) -> bool {
        self.stack.iter().any(|scope| *scope == Scope::Paragraph)
    }

    pub(super) fn enter(&mut self, scope: Scope) {
        self.stack.push(scope);
    }

    pub(super) fn exit(&mut self) -> Option<Scope> {
        self.stack.pop()
    }

    pub(super) fn finish(self) -> String {
        self.html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        let mut out = HtmlOutput::new();
        let parameters = Parameters::from([("title".to_string(), "a \"b\"".to_string())]);
        out.open_tag("span", &[("class", "x<y")], &parameters);
        out.push_text("1 < 2 & 3");
        out.close_tag("span");
        assert_eq!(
            out.finish(),
            r#"<span class="x&lt;y" title="a &quot;b&quot;">1 &lt; 2 &amp; 3</span>"#
        );
    }

    #[test]
    fn test_scopes() {
        let mut out = HtmlOutput::new();
        assert!(!out.is_in_paragraph());
        out.enter(Scope::Paragraph);
        out.enter(Scope::Root);
        assert!(out.is_in_paragraph());
        assert_eq!(out.exit(), Some(Scope::Root));
        assert_eq!(out.exit(), Some(Scope::Paragraph));
        assert!(!out.is_in_paragraph());
    }
}
