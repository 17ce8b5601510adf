//! Lossless parser for SSH client config text.
//!
//! Never fails. Lines that are not part of a recognized `Host` block become
//! opaque entries, and everything keeps its original bytes.

use tracing::debug;

use crate::document::{BodyLine, Directive, Document, Entry, HostBlock, LineEnding, host_patterns};

/// Parse config bytes into a document.
///
/// Lines that are not valid UTF-8 are kept verbatim. Inside a block they become
/// body text; a `Host` or `Match` keyword on such a line closes the current block
/// and the line is kept opaque.
pub fn parse(input: impl AsRef<[u8]>) -> Document {
    let input = input.as_ref();
    let mut entries = Vec::new();
    // Comment/blank lines waiting for the entry they belong to
    let mut pending: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<HostBlock> = None;
    let mut undecodable = 0usize;

    for line in input.split_inclusive(|&b| b == b'\n') {
        if is_comment_or_blank(line) {
            pending.push(line.to_vec());
            continue;
        }

        let text = std::str::from_utf8(line).ok();
        if text.is_none() {
            undecodable += 1;
        }

        if let Some(header) = text.and_then(host_header) {
            if let Some(block) = current.take() {
                entries.push(Entry::Host(block));
            }
            current = Some(HostBlock::new(std::mem::take(&mut pending), header));
            continue;
        }

        if starts_section(line) {
            // Match (or an unreadable Host) closes the current block; its region
            // stays opaque until the next Host
            if let Some(block) = current.take() {
                entries.push(Entry::Host(block));
            }
            flush_opaque(&mut entries, &mut pending);
            entries.push(Entry::Opaque(line.to_vec()));
            continue;
        }

        match current.as_mut() {
            Some(block) => {
                block.body.extend(pending.drain(..).map(BodyLine::Text));
                let body_line = match text.and_then(Directive::parse) {
                    Some(directive) => BodyLine::Directive(directive),
                    None => BodyLine::Text(line.to_vec()),
                };
                block.body.push(body_line);
            }
            None => {
                flush_opaque(&mut entries, &mut pending);
                entries.push(Entry::Opaque(line.to_vec()));
            }
        }
    }

    if let Some(block) = current.take() {
        entries.push(Entry::Host(block));
    }
    flush_opaque(&mut entries, &mut pending);

    let doc = Document {
        entries,
        eol: detect_line_ending(input),
    };
    debug!(
        entries = doc.entries.len(),
        host_blocks = doc.host_blocks().count(),
        undecodable,
        "parsed ssh config"
    );
    doc
}

fn flush_opaque(entries: &mut Vec<Entry>, pending: &mut Vec<Vec<u8>>) {
    entries.extend(pending.drain(..).map(Entry::Opaque));
}

fn is_comment_or_blank(line: &[u8]) -> bool {
    let trimmed = line.trim_ascii_start();
    trimmed.is_empty() || trimmed.starts_with(b"#")
}

/// `Host` keyword followed by at least one pattern
fn host_header(line: &str) -> Option<Directive> {
    Directive::parse(line).filter(|d| d.is("Host") && !host_patterns(d.raw_value()).is_empty())
}

/// First word of the line, up to whitespace or `=`
fn keyword(line: &[u8]) -> &[u8] {
    let rest = line.trim_ascii_start();
    let end = rest
        .iter()
        .position(|&b| b.is_ascii_whitespace() || b == b'=')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// A line that ends the current Host block without opening a new one
fn starts_section(line: &[u8]) -> bool {
    let keyword = keyword(line);
    keyword.eq_ignore_ascii_case(b"Match")
        || (keyword.eq_ignore_ascii_case(b"Host") && std::str::from_utf8(line).is_err())
}

fn detect_line_ending(input: &[u8]) -> LineEnding {
    match input.iter().position(|&b| b == b'\n') {
        Some(i) if input[..i].ends_with(b"\r") => LineEnding::CrLf,
        _ => LineEnding::Lf,
    }
}
