//! A small INI document model compatible with what `cqlsh` reads.
//!
//! Sections and keys keep their file order. Keys are case-folded to lower
//! case and comments are not retained. A line indented deeper than its key
//! continues that key's value, blank lines in between included.

use indexmap::IndexMap;

pub type Section = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: IndexMap<String, Section>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let mut current: Option<String> = None;
        // Key whose value later lines may still extend, and its indentation.
        let mut last_key: Option<String> = None;
        let mut indent_level = 0;

        for (idx, line) in text.lines().enumerate() {
            let lineno = idx + 1;
            let trimmed = line.trim();

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if trimmed.is_empty() {
                // Kept only if an indented line follows; trailing ones are
                // trimmed once parsing is done.
                if let Some(value) = doc.value_mut(current.as_deref(), last_key.as_deref()) {
                    value.push('\n');
                }
                continue;
            }

            let cur_indent = line.len() - line.trim_start().len();
            if cur_indent > indent_level {
                if let Some(value) = doc.value_mut(current.as_deref(), last_key.as_deref()) {
                    value.push('\n');
                    value.push_str(trimmed);
                    continue;
                }
            }
            indent_level = cur_indent;

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or(ParseError {
                    line: lineno,
                    reason: "unterminated section header",
                })?;
                let name = name.trim().to_string();
                doc.sections.entry(name.clone()).or_default();
                current = Some(name);
                last_key = None;
                continue;
            }

            let section = current.as_ref().ok_or(ParseError {
                line: lineno,
                reason: "key outside of any section",
            })?;
            let split = trimmed.find(&['=', ':'][..]).ok_or(ParseError {
                line: lineno,
                reason: "expected key = value",
            })?;
            let key = trimmed[..split].trim().to_lowercase();
            if key.is_empty() {
                return Err(ParseError {
                    line: lineno,
                    reason: "empty key",
                });
            }
            let value = trimmed[split + 1..].trim().to_string();
            doc.sections
                .entry(section.clone())
                .or_default()
                .insert(key.clone(), value);
            last_key = Some(key);
        }

        for value in doc.sections.values_mut().flat_map(|s| s.values_mut()) {
            value.truncate(value.trim_end().len());
        }
        Ok(doc)
    }

    fn value_mut(&mut self, section: Option<&str>, key: Option<&str>) -> Option<&mut String> {
        self.sections.get_mut(section?)?.get_mut(key?)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Returns the named section, appending an empty one if missing.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_string()).or_default()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_mut(section)
            .insert(key.to_lowercase(), value.into());
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Serializes the document. Every section is followed by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, entries) in &self.sections {
            out.push('[');
            out.push_str(name);
            out.push_str("]\n");
            for (key, value) in entries {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(&value.replace('\n', "\n\t"));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render() {
        let doc = IniDocument::parse(
            "# managed elsewhere\n[ui]\ncolor = on\nTimezone: UTC\n\n[connection]\nhostname=1.2.3.4\n",
        )
        .unwrap();

        assert_eq!(doc.get("ui", "color"), Some("on"));
        assert_eq!(doc.get("ui", "timezone"), Some("UTC"));
        assert_eq!(doc.get("connection", "hostname"), Some("1.2.3.4"));
        assert_eq!(
            doc.render(),
            "[ui]\ncolor = on\ntimezone = UTC\n\n[connection]\nhostname = 1.2.3.4\n\n"
        );
    }

    #[test]
    fn continuation_lines() {
        let doc = IniDocument::parse("[a]\nkey = one\n  two\nother = x\n").unwrap();
        assert_eq!(doc.get("a", "key"), Some("one\ntwo"));
        assert_eq!(doc.render(), "[a]\nkey = one\n\ttwo\nother = x\n\n");

        let reparsed = IniDocument::parse(&doc.render()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn blank_lines_inside_values() {
        let doc = IniDocument::parse("[a]\nkey = one\n\n  two\n\n\nother = x\n  # note\n  y\n\n").unwrap();
        assert_eq!(doc.get("a", "key"), Some("one\n\ntwo"));
        assert_eq!(doc.get("a", "other"), Some("x\ny"));
        assert_eq!(doc.render(), "[a]\nkey = one\n\t\n\ttwo\nother = x\n\ty\n\n");

        let reparsed = IniDocument::parse(&doc.render()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn indented_keys_are_not_continuations() {
        let doc = IniDocument::parse("[a]\n  key = one\n  other = two\n").unwrap();
        assert_eq!(doc.get("a", "key"), Some("one"));
        assert_eq!(doc.get("a", "other"), Some("two"));
    }

    #[test]
    fn values_may_contain_delimiters() {
        let doc = IniDocument::parse("[authentication]\npassword = a=b:c\n").unwrap();
        assert_eq!(doc.get("authentication", "password"), Some("a=b:c"));
    }

    #[test]
    fn rejects_orphan_keys() {
        let err = IniDocument::parse("key = value\n[a]\n").unwrap_err();
        assert_eq!(err.line, 1);

        let err = IniDocument::parse("[a]\njust words\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = IniDocument::parse("[a\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn set_appends_missing_section() {
        let mut doc = IniDocument::new();
        doc.set("connection", "Port", "9042");
        assert_eq!(doc.sections().collect::<Vec<_>>(), vec!["connection"]);
        assert_eq!(doc.get("connection", "port"), Some("9042"));
    }
}
