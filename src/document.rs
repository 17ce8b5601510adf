//! In-memory model of an SSH client config file.
//!
//! The model is deliberately shallow: only `Host` blocks and their directives
//! are understood. Everything else is carried as raw bytes so that rendering an
//! untouched document reproduces the input byte for byte, including lines that
//! are not valid UTF-8.

use crate::pattern::{host_patterns_match, is_literal};

/// Default indentation for directives added to a block with no existing ones
pub const DEFAULT_INDENT: &str = "    ";

/// Directive key the engine reads and edits
pub const IDENTITY_FILE: &str = "IdentityFile";

/// A parsed SSH config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub(crate) entries: Vec<Entry>,
    pub(crate) eol: LineEnding,
}

/// Line terminator used when the engine writes new lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// One top-level item of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Host(HostBlock),
    /// A line outside any `Host` block (global options, `Match` regions,
    /// trailing comments), stored with its terminator.
    Opaque(Vec<u8>),
}

impl Entry {
    fn render_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Host(block) => block.render_into(out),
            Self::Opaque(line) => out.extend_from_slice(line),
        }
    }

    pub(crate) fn ends_with_newline(&self) -> bool {
        match self {
            Self::Host(block) => block.last_line_terminated(),
            Self::Opaque(line) => line.ends_with(b"\n"),
        }
    }
}

/// A `Host` header together with the lines that belong to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBlock {
    /// Comment and blank lines that appeared right before the header
    pub(crate) leading: Vec<Vec<u8>>,
    pub(crate) header: Directive,
    pub(crate) body: Vec<BodyLine>,
}

/// A line inside a host block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyLine {
    Directive(Directive),
    /// Comments, blank lines and anything not shaped like `key value`
    Text(Vec<u8>),
}

/// A `key value` line, split so that it renders back exactly as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    indent: String,
    key: String,
    /// Whitespace and/or `=` between key and value
    separator: String,
    value: String,
    /// Whitespace after the value
    trailing: String,
    eol: String,
}

impl Directive {
    /// Split a raw line (terminator included) into a directive.
    ///
    /// Returns `None` for blank lines, comments, and lines with a key but no value.
    pub fn parse(line: &str) -> Option<Self> {
        let (content, eol) = split_eol(line);
        let rest = content.trim_start_matches([' ', '\t']);
        let indent = &content[..content.len() - rest.len()];
        if rest.is_empty() || rest.starts_with('#') {
            return None;
        }

        let key_len = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let (key, after_key) = rest.split_at(key_len);
        if key.is_empty() {
            return None;
        }

        let sep_len = separator_len(after_key);
        let (separator, value_and_trailing) = after_key.split_at(sep_len);
        let value = value_and_trailing.trim_end();
        if value.is_empty() {
            return None;
        }
        let trailing = &value_and_trailing[value.len()..];

        Some(Self {
            indent: indent.to_string(),
            key: key.to_string(),
            separator: separator.to_string(),
            value: value.to_string(),
            trailing: trailing.to_string(),
            eol: eol.to_string(),
        })
    }

    /// Build a fresh directive in canonical `key value` form
    pub fn new(indent: &str, key: &str, value: &str, eol: LineEnding) -> Self {
        Self {
            indent: indent.to_string(),
            key: key.to_string(),
            separator: " ".to_string(),
            value: value.to_string(),
            trailing: String::new(),
            eol: eol.as_str().to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value exactly as written, quotes included
    pub fn raw_value(&self) -> &str {
        &self.value
    }

    /// The value with one pair of surrounding double quotes removed
    pub fn value(&self) -> &str {
        unquote(&self.value)
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    pub(crate) fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
    }

    pub(crate) fn terminate(&mut self, eol: LineEnding) {
        if self.eol.is_empty() {
            self.eol = eol.as_str().to_string();
        }
    }

    fn is_terminated(&self) -> bool {
        !self.eol.is_empty()
    }

    pub(crate) fn render_into(&self, out: &mut Vec<u8>) {
        for part in [
            &self.indent,
            &self.key,
            &self.separator,
            &self.value,
            &self.trailing,
            &self.eol,
        ] {
            out.extend_from_slice(part.as_bytes());
        }
    }
}

impl HostBlock {
    pub(crate) fn new(leading: Vec<Vec<u8>>, header: Directive) -> Self {
        Self {
            leading,
            header,
            body: Vec::new(),
        }
    }

    /// A fresh `Host <hostname>` block with one directive
    pub(crate) fn dedicated(hostname: &str, key: &str, value: &str, eol: LineEnding) -> Self {
        let header = Directive::new("", "Host", hostname, eol);
        let mut block = Self::new(Vec::new(), header);
        block
            .body
            .push(BodyLine::Directive(Directive::new(DEFAULT_INDENT, key, value, eol)));
        block
    }

    /// Host patterns as written on the header line
    pub fn patterns(&self) -> Vec<&str> {
        host_patterns(&self.header.value)
    }

    /// Whether this block applies to `hostname`
    pub fn matches(&self, hostname: &str) -> bool {
        host_patterns_match(&self.patterns(), hostname)
    }

    /// Whether the header names exactly `hostname` and nothing else
    pub fn is_dedicated_to(&self, hostname: &str) -> bool {
        match self.patterns().as_slice() {
            [only] => is_literal(only) && only.eq_ignore_ascii_case(hostname),
            _ => false,
        }
    }

    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.body.iter().filter_map(|line| match line {
            BodyLine::Directive(d) => Some(d),
            BodyLine::Text(_) => None,
        })
    }

    /// First directive with the given key (case-insensitive)
    pub fn directive(&self, key: &str) -> Option<&Directive> {
        self.directives().find(|d| d.is(key))
    }

    /// Unquoted value of the first directive with the given key
    pub fn directive_value(&self, key: &str) -> Option<&str> {
        self.directive(key).map(Directive::value)
    }

    /// Set the first `key` directive to `value`, or append one.
    ///
    /// Appended directives reuse the indentation of the block's existing
    /// directives. Returns false when the value was already identical.
    pub fn set_directive(&mut self, key: &str, value: &str, eol: LineEnding) -> bool {
        let existing = self.body.iter_mut().find_map(|line| match line {
            BodyLine::Directive(d) if d.is(key) => Some(d),
            _ => None,
        });
        if let Some(directive) = existing {
            if directive.raw_value() == value {
                return false;
            }
            directive.set_value(value);
            return true;
        }

        let indent = self
            .directives()
            .next()
            .map(|d| d.indent().to_string())
            .unwrap_or_else(|| DEFAULT_INDENT.to_string());
        self.terminate_last_line(eol);
        self.body
            .push(BodyLine::Directive(Directive::new(&indent, key, value, eol)));
        true
    }

    fn terminate_last_line(&mut self, eol: LineEnding) {
        match self.body.last_mut() {
            Some(BodyLine::Directive(d)) => d.terminate(eol),
            Some(BodyLine::Text(text)) => {
                if !text.ends_with(b"\n") {
                    text.extend_from_slice(eol.as_str().as_bytes());
                }
            }
            None => self.header.terminate(eol),
        }
    }

    fn last_line_terminated(&self) -> bool {
        match self.body.last() {
            Some(BodyLine::Directive(d)) => d.is_terminated(),
            Some(BodyLine::Text(text)) => text.ends_with(b"\n"),
            None => self.header.is_terminated(),
        }
    }

    fn render_into(&self, out: &mut Vec<u8>) {
        for line in &self.leading {
            out.extend_from_slice(line);
        }
        self.header.render_into(out);
        for line in &self.body {
            match line {
                BodyLine::Directive(d) => d.render_into(out),
                BodyLine::Text(text) => out.extend_from_slice(text),
            }
        }
    }
}

impl Document {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Host blocks in file order
    pub fn host_blocks(&self) -> impl Iterator<Item = &HostBlock> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Host(block) => Some(block),
            Entry::Opaque(_) => None,
        })
    }

    pub fn line_ending(&self) -> LineEnding {
        self.eol
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the document back to config file bytes
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            entry.render_into(&mut out);
        }
        out
    }

    /// Rendered output as text, for assertions on documents known to be UTF-8
    #[cfg(test)]
    pub(crate) fn render_text(&self) -> String {
        String::from_utf8(self.render()).unwrap()
    }
}

/// Patterns on a `Host` line; a token starting with `#` ends the list
pub(crate) fn host_patterns(value: &str) -> Vec<&str> {
    value
        .split_whitespace()
        .take_while(|token| !token.starts_with('#'))
        .collect()
}

/// Split a line into its content and terminator (`\n`, `\r\n` or nothing)
pub(crate) fn split_eol(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Length of the `key`/`value` separator: whitespace, at most one `=`, whitespace
fn separator_len(s: &str) -> usize {
    let after_ws = s.trim_start_matches([' ', '\t']);
    let after_eq = after_ws.strip_prefix('=').unwrap_or(after_ws);
    let rest = after_eq.trim_start_matches([' ', '\t']);
    s.len() - rest.len()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
