//! Low-level matchers shared by the block and inline parsers.
//!
//! Every matcher works on the normalized char slice between `pos` and
//! `end` and returns `None` when the construct is not complete, leaving
//! the caller to read the opener as literal text.

use crate::block::Parameters;

pub(crate) fn starts_with(chars: &[char], pos: usize, end: usize, pattern: &str) -> bool {
    let mut i = pos;
    for expected in pattern.chars() {
        if i >= end || chars[i] != expected {
            return false;
        }
        i += 1;
    }
    true
}

pub(crate) fn is_macro_id_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

pub(crate) fn is_parameter_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn skip_inline_whitespace(chars: &[char], mut i: usize, end: usize) -> usize {
    while i < end && matches!(chars[i], ' ' | '\t') {
        i += 1;
    }
    i
}

/// `{{{content}}}` starting at `pos`. Inside, `~~` and `~}` are escapes.
pub(crate) fn match_verbatim(chars: &[char], pos: usize, end: usize) -> Option<(String, usize)> {
    if !starts_with(chars, pos, end, "{{{") {
        return None;
    }
    let mut content = String::new();
    let mut i = pos + 3;
    while i < end {
        if chars[i] == '~' && i + 1 < end && matches!(chars[i + 1], '~' | '}') {
            content.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if starts_with(chars, i, end, "}}}") {
            return Some((content, i + 3));
        }
        content.push(chars[i]);
        i += 1;
    }
    None
}

/// A complete macro call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MacroMatch {
    pub(crate) id: String,
    pub(crate) parameters: Parameters,
    pub(crate) content: Option<String>,
    pub(crate) end: usize,
}

/// Start tag at `pos` was well formed but nothing closes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MacroScan {
    Complete(MacroMatch),
    Unclosed(String),
    NotAMacro,
}

/// Opening tag of a macro call: `{{id params}}` or `{{id params/}}`.
struct StartTag {
    id: String,
    parameters: Parameters,
    self_closing: bool,
    end: usize,
}

fn scan_start_tag(chars: &[char], pos: usize, end: usize) -> Option<StartTag> {
    if !starts_with(chars, pos, end, "{{") || starts_with(chars, pos, end, "{{{") {
        return None;
    }
    let mut i = pos + 2;
    let id_start = i;
    while i < end && is_macro_id_char(chars[i]) {
        i += 1;
    }
    if i == id_start {
        return None;
    }
    let id: String = chars[id_start..i].iter().collect();

    let mut parameters = Parameters::new();
    loop {
        i = skip_inline_whitespace(chars, i, end);
        if starts_with(chars, i, end, "/}}") {
            return Some(StartTag {
                id,
                parameters,
                self_closing: true,
                end: i + 3,
            });
        }
        if starts_with(chars, i, end, "}}") {
            return Some(StartTag {
                id,
                parameters,
                self_closing: false,
                end: i + 2,
            });
        }
        let (name, value, next) = parse_parameter(chars, i, end)?;
        parameters.insert(name, value);
        i = next;
    }
}

/// `{{id params/}}` or `{{id params}}content{{/id}}` starting at `pos`.
///
/// Nested calls with the same id are balanced by counting their start and
/// end tags in a single forward pass. One leading and one trailing newline
/// of the content are dropped.
pub(crate) fn scan_macro(chars: &[char], pos: usize, end: usize) -> MacroScan {
    let Some(tag) = scan_start_tag(chars, pos, end) else {
        return MacroScan::NotAMacro;
    };
    if tag.self_closing {
        return MacroScan::Complete(MacroMatch {
            id: tag.id,
            parameters: tag.parameters,
            content: None,
            end: tag.end,
        });
    }

    let close: Vec<char> = format!("{{{{/{}}}}}", tag.id).chars().collect();
    let content_start = tag.end;
    let mut depth = 0usize;
    let mut j = content_start;
    while j < end {
        if chars[j..end].starts_with(&close) {
            if depth == 0 {
                let content = strip_content_newlines(&chars[content_start..j]);
                return MacroScan::Complete(MacroMatch {
                    id: tag.id,
                    parameters: tag.parameters,
                    content: Some(content),
                    end: j + close.len(),
                });
            }
            depth -= 1;
            j += close.len();
            continue;
        }
        if opens_same_macro(chars, j, end, &tag.id)
            && let Some(nested) = scan_start_tag(chars, j, end)
        {
            if !nested.self_closing {
                depth += 1;
            }
            j = nested.end;
            continue;
        }
        j += 1;
    }
    MacroScan::Unclosed(tag.id)
}

/// Convenience wrapper returning only complete calls.
pub(crate) fn match_macro(chars: &[char], pos: usize, end: usize) -> Option<MacroMatch> {
    match scan_macro(chars, pos, end) {
        MacroScan::Complete(found) => Some(found),
        _ => None,
    }
}

fn opens_same_macro(chars: &[char], pos: usize, end: usize, id: &str) -> bool {
    if !starts_with(chars, pos, end, "{{") || starts_with(chars, pos, end, "{{{") {
        return false;
    }
    let after_id = pos + 2 + id.chars().count();
    starts_with(chars, pos + 2, end, id)
        && after_id < end
        && matches!(chars[after_id], ' ' | '\t' | '}' | '/')
}

fn strip_content_newlines(content: &[char]) -> String {
    let mut slice = content;
    if let Some(('\n', rest)) = slice.split_first() {
        slice = rest;
    }
    if let Some(('\n', rest)) = slice.split_last() {
        slice = rest;
    }
    slice.iter().collect()
}

/// `name="value"` or `name=value`. In quoted values `~` escapes the next char.
pub(crate) fn parse_parameter(
    chars: &[char],
    pos: usize,
    end: usize,
) -> Option<(String, String, usize)> {
    let mut i = pos;
    while i < end && is_parameter_name_char(chars[i]) {
        i += 1;
    }
    if i == pos || i >= end || chars[i] != '=' {
        return None;
    }
    let name: String = chars[pos..i].iter().collect();
    i += 1;

    let mut value = String::new();
    if i < end && chars[i] == '"' {
        i += 1;
        loop {
            if i >= end {
                return None;
            }
            match chars[i] {
                '~' if i + 1 < end => {
                    value.push(chars[i + 1]);
                    i += 2;
                }
                '"' => {
                    i += 1;
                    break;
                }
                c => {
                    value.push(c);
                    i += 1;
                }
            }
        }
    } else {
        while i < end
            && !matches!(chars[i], ' ' | '\t' | '\n')
            && !starts_with(chars, i, end, "}}")
            && !starts_with(chars, i, end, "/}}")
            && !starts_with(chars, i, end, "%)")
        {
            value.push(chars[i]);
            i += 1;
        }
        if value.is_empty() {
            return None;
        }
    }
    Some((name, value, i))
}

/// `(% name="value" %)` starting at `pos`.
pub(crate) fn match_parameters_tag(
    chars: &[char],
    pos: usize,
    end: usize,
) -> Option<(Parameters, usize)> {
    if !starts_with(chars, pos, end, "(%") {
        return None;
    }
    let mut parameters = Parameters::new();
    let mut i = pos + 2;
    loop {
        i = skip_inline_whitespace(chars, i, end);
        if starts_with(chars, i, end, "%)") {
            return Some((parameters, i + 2));
        }
        let (name, value, next) = parse_parameter(chars, i, end)?;
        parameters.insert(name, value);
        i = next;
    }
}

/// Whitespace separated parameters filling `pos..end`.
pub(crate) fn parse_parameter_list(chars: &[char], pos: usize, end: usize) -> Option<Parameters> {
    let mut parameters = Parameters::new();
    let mut i = pos;
    loop {
        i = skip_inline_whitespace(chars, i, end);
        if i >= end {
            return Some(parameters);
        }
        let (name, value, next) = parse_parameter(chars, i, end)?;
        parameters.insert(name, value);
        i = next;
    }
}

/// End of the construct (escape, verbatim or macro call) opening at `pos`.
pub(crate) fn skip_construct(chars: &[char], pos: usize, end: usize) -> Option<usize> {
    if chars[pos] == '~' && pos + 1 < end {
        return Some(pos + 2);
    }
    if let Some((_, after)) = match_verbatim(chars, pos, end) {
        return Some(after);
    }
    match_macro(chars, pos, end).map(|found| found.end)
}

/// Index of the newline ending the logical line at `pos`, stepping over
/// constructs that span lines.
pub(crate) fn logical_line_end(chars: &[char], pos: usize, end: usize) -> usize {
    let mut i = pos;
    while i < end {
        if chars[i] == '\n' {
            return i;
        }
        i = skip_construct(chars, i, end).unwrap_or(i + 1);
    }
    end
}

/// Index of the next `\n` (or `end`).
pub(crate) fn physical_line_end(chars: &[char], pos: usize, end: usize) -> usize {
    chars[pos..end]
        .iter()
        .position(|c| *c == '\n')
        .map_or(end, |offset| pos + offset)
}

/// Whether the physical line starting at `pos` holds only spaces and tabs.
pub(crate) fn is_blank_line(chars: &[char], pos: usize, end: usize) -> bool {
    let line_end = physical_line_end(chars, pos, end);
    chars[pos..line_end].iter().all(|c| matches!(c, ' ' | '\t'))
}

/// Whether `pos` is at a line end (newline or end of input).
pub(crate) fn at_line_end(chars: &[char], pos: usize, end: usize) -> bool {
    pos >= end || chars[pos] == '\n'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_verbatim_escapes() {
        let input = chars("{{{a~}~}}b~x}}}tail");
        let (content, after) = match_verbatim(&input, 0, input.len()).unwrap();
        assert_eq!(content, "a}}}b~x");
        assert_eq!(input[after..].iter().collect::<String>(), "tail");
    }

    #[test]
    fn test_self_closing_macro() {
        let input = chars("{{toc depth=\"2\" start=1/}} rest");
        let found = match_macro(&input, 0, input.len()).unwrap();
        assert_eq!(found.id, "toc");
        assert_eq!(found.parameters.get("depth").map(String::as_str), Some("2"));
        assert_eq!(found.parameters.get("start").map(String::as_str), Some("1"));
        assert_eq!(found.content, None);
        assert_eq!(input[found.end..].iter().collect::<String>(), " rest");
    }

    #[test]
    fn test_nested_macro_content_is_balanced() {
        let input = chars("{{box}}\nouter {{box}}inner{{/box}} more\n{{/box}}!");
        let found = match_macro(&input, 0, input.len()).unwrap();
        assert_eq!(
            found.content.as_deref(),
            Some("outer {{box}}inner{{/box}} more")
        );
        assert_eq!(input[found.end..].iter().collect::<String>(), "!");
    }

    #[test]
    fn test_unclosed_macro() {
        let input = chars("{{code}}never closed");
        assert_eq!(
            scan_macro(&input, 0, input.len()),
            MacroScan::Unclosed("code".into())
        );
        let input = chars("{{ not a macro}}");
        assert_eq!(scan_macro(&input, 0, input.len()), MacroScan::NotAMacro);
    }

    #[test]
    fn test_unclosed_nested_call_leaves_outer_unclosed() {
        let input = chars("{{box}}a{{box}}b{{box/}}{{/box}}");
        assert_eq!(
            scan_macro(&input, 0, input.len()),
            MacroScan::Unclosed("box".into())
        );
        let found = match_macro(&input, 8, input.len()).unwrap();
        assert_eq!(found.content.as_deref(), Some("b{{box/}}"));
    }

    #[test]
    fn test_many_unclosed_calls_scan_quickly() {
        let input = chars(&"{{a}}".repeat(2000));
        let start = std::time::Instant::now();
        let line_end = logical_line_end(&input, 0, input.len());
        assert_eq!(line_end, input.len());
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_quoted_parameter_escapes() {
        let input = chars(r#"title="say ~"hi~" ~~ok""#);
        let (name, value, next) = parse_parameter(&input, 0, input.len()).unwrap();
        assert_eq!(name, "title");
        assert_eq!(value, r#"say "hi" ~ok"#);
        assert_eq!(next, input.len());
    }

    #[test]
    fn test_parameters_tag() {
        let input = chars(r#"(% class="box" style=x %)"#);
        let (parameters, after) = match_parameters_tag(&input, 0, input.len()).unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(after, input.len());
    }

    #[test]
    fn test_logical_line_skips_multiline_macro() {
        let input = chars("a {{code}}\nx\n{{/code}} b\nnext");
        let line_end = logical_line_end(&input, 0, input.len());
        assert_eq!(input[..line_end].iter().collect::<String>(), "a {{code}}\nx\n{{/code}} b");
    }
}
