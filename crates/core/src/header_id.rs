use std::collections::HashMap;

/// Generates header anchor ids.
///
/// An id is `H` followed by the alphanumeric characters of the header text.
/// Repeated ids get `-1`, `-2`, ... suffixes in document order.
///
/// # Examples
///
/// ```
/// use wikiflow_core::HeaderIdGenerator;
///
/// let mut ids = HeaderIdGenerator::new();
/// assert_eq!(ids.generate("Getting started"), "HGettingstarted");
/// assert_eq!(ids.generate("Getting started!"), "HGettingstarted-1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderIdGenerator {
    counts: HashMap<String, usize>,
}

impl HeaderIdGenerator {
    /// Creates a new generator.
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Generates the next id for the given header text.
    pub fn generate(&mut self, text: &str) -> String {
        let base = header_id(text);
        let count = self.counts.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        id
    }
}

/// Id for a header text without de-duplication.
pub fn header_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len() + 1);
    id.push('H');
    id.extend(text.chars().filter(|c| c.is_alphanumeric()));
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_id_strips_punctuation() {
        assert_eq!(header_id("Hello, World!"), "HHelloWorld");
        assert_eq!(header_id("Überblick 2024"), "HÜberblick2024");
        assert_eq!(header_id("***"), "H");
    }

    #[test]
    fn test_duplicates_are_suffixed() {
        let mut ids = HeaderIdGenerator::new();
        assert_eq!(ids.generate("Intro"), "HIntro");
        assert_eq!(ids.generate("Intro"), "HIntro-1");
        assert_eq!(ids.generate("Intro"), "HIntro-2");
        assert_eq!(ids.generate("Other"), "HOther");
    }
}
