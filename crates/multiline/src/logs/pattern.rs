//! Marker detection and log-prefix skipping.
//!
//! Pure byte-level helpers used by [`super::classify`] to recognize the
//! lines that carry grouping signals: chained-exception lead-ins, frame
//! elisions, bare exception names, multi-line error headers and the
//! timestamp/level signature that opens an independent log record.

/// Lines that explicitly belong to the message already being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationMarker {
    /// "The above exception was the direct cause..." and friends. Also ends
    /// the current grammar instance so a following header elaborates the chain.
    ChainLeadIn,
    /// "Caused by:", "Suppressed:".
    CausedBy,
    /// "... 27 more".
    Elision,
    /// Tree-drawing glyphs used by pretty-printed dependency/error trees.
    TreeGlyph,
    /// `ConnectionError`, `RuntimeError: boom`, `java.lang.IllegalStateException`.
    ExceptionName,
}

/// Multi-line error grammars introduced by a recognizable header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockGrammar {
    /// `Traceback (most recent call last):`
    PythonTraceback,
    /// `Exception in thread "main" ...`
    JavaThread,
}

const CHAIN_LEAD_INS: &[&[u8]] = &[
    b"The above exception was the direct cause of the following exception",
    b"During handling of the above exception, another exception occurred",
];

const CAUSED_BY: &[&[u8]] = &[b"Caused by:", b"caused by:", b"due to:", b"Suppressed:"];

const TREE_GLYPHS: &[&[u8]] = &[
    b"\xe2\x94\x94", // └
    b"\xe2\x86\xb3", // ↳
    b"\xe2\x94\x82", // │
    b"\xe2\x94\x9c", // ├
];

const EXCEPTION_SUFFIXES: &[&[u8]] = &[b"Error", b"Exception", b"Warning", b"Exit", b"Interrupt"];

const LEVEL_KEYWORDS: &[&[u8]] = &[
    b"ERROR", b"WARN", b"INFO", b"DEBUG", b"TRACE", b"FATAL",
    b"error", b"warn", b"info", b"debug", b"trace", b"fatal",
    b"WARNING", b"CRITICAL", b"NOTICE", b"PANIC",
    b"warning", b"critical", b"notice",
];

const MONTHS: &[&[u8]] = &[
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun",
    b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

/// Detect a continuation marker on a non-indented line.
pub fn continuation_marker(line: &str) -> Option<ContinuationMarker> {
    let content = line.as_bytes();
    if content.is_empty() {
        return None;
    }

    if starts_with_any(content, CHAIN_LEAD_INS) {
        return Some(ContinuationMarker::ChainLeadIn);
    }
    if starts_with_any(content, CAUSED_BY) {
        return Some(ContinuationMarker::CausedBy);
    }
    if is_elision(content) {
        return Some(ContinuationMarker::Elision);
    }
    if starts_with_any(content, TREE_GLYPHS) {
        return Some(ContinuationMarker::TreeGlyph);
    }
    if is_exception_name(content) {
        return Some(ContinuationMarker::ExceptionName);
    }
    None
}

/// Detect the header of a known multi-line error grammar.
pub fn block_start(line: &str) -> Option<BlockGrammar> {
    let content = line.as_bytes();
    if contains_any(content, &[b"Traceback (most recent call last):"]) {
        return Some(BlockGrammar::PythonTraceback);
    }
    if content.starts_with(b"Exception in thread \"") {
        return Some(BlockGrammar::JavaThread);
    }
    None
}

/// Space or tab at the very first byte.
pub fn is_indented(line: &str) -> bool {
    matches!(line.as_bytes().first(), Some(b' ') | Some(b'\t'))
}

pub fn is_blank(line: &str) -> bool {
    line.bytes().all(|b| b == b' ' || b == b'\t' || b == b'\r')
}

/// True when the line opens with the signature of an independent log record:
/// a timestamp prefix, or a level keyword after optional timestamp/bracket
/// prefixes.
pub fn is_record_header(line: &str) -> bool {
    let content = line.as_bytes();
    if content.is_empty() {
        return false;
    }
    if starts_with_timestamp(content) {
        return true;
    }
    if check_level_at(content, 0, LEVEL_KEYWORDS) {
        return true;
    }

    let offset = skip_log_prefix(content);
    if offset == 0 || offset >= content.len() {
        return false;
    }
    if content[offset] == b'[' && check_level_at(content, offset + 1, LEVEL_KEYWORDS) {
        return true;
    }
    check_level_at(content, offset, LEVEL_KEYWORDS)
}

/// `... 2 more`, `...`
fn is_elision(content: &[u8]) -> bool {
    if !content.starts_with(b"...") {
        return false;
    }
    let rest = &content[3..];
    rest.is_empty() || rest.ends_with(b" more") || rest[0] == b' '
}

/// A leading identifier (dots allowed) whose last segment is capitalized and
/// ends with an exception suffix, followed by end of line or `:`.
fn is_exception_name(content: &[u8]) -> bool {
    let token_end = content.iter().position(|&b| b == b':').unwrap_or(content.len());
    let token = &content[..token_end];
    if token.is_empty()
        || !token
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'$')
    {
        return false;
    }

    let last = match token.rsplit(|&b| b == b'.').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => return false,
    };
    last[0].is_ascii_uppercase() && EXCEPTION_SUFFIXES.iter().any(|s| last.ends_with(s))
}

/// Timestamp at byte 0, optionally inside a leading `[`.
fn starts_with_timestamp(content: &[u8]) -> bool {
    let content = content.strip_prefix(b"[").unwrap_or(content);
    is_iso_date(content) || is_glog_header(content) || is_clock(content) || is_syslog_date(content)
        || is_clf_date(content)
}

/// `2026-02-05`, `2026/02/05`
fn is_iso_date(c: &[u8]) -> bool {
    c.len() >= 10
        && c[..4].iter().all(u8::is_ascii_digit)
        && (c[4] == b'-' || c[4] == b'/')
        && c[5..7].iter().all(u8::is_ascii_digit)
        && c[7] == c[4]
        && c[8..10].iter().all(u8::is_ascii_digit)
}

/// `I0215 12:33:07.230967`
fn is_glog_header(c: &[u8]) -> bool {
    c.len() >= 14
        && matches!(c[0], b'I' | b'W' | b'E' | b'F')
        && c[1..5].iter().all(u8::is_ascii_digit)
        && c[5] == b' '
        && is_clock(&c[6..])
}

/// `12:33:07`
fn is_clock(c: &[u8]) -> bool {
    c.len() >= 8
        && c[..2].iter().all(u8::is_ascii_digit)
        && c[2] == b':'
        && c[3..5].iter().all(u8::is_ascii_digit)
        && c[5] == b':'
        && c[6..8].iter().all(u8::is_ascii_digit)
}

/// `Jan  5 10:00:00`
fn is_syslog_date(c: &[u8]) -> bool {
    if c.len() < 15 || !MONTHS.iter().any(|m| c.starts_with(m)) || c[3] != b' ' {
        return false;
    }
    let mut pos = 4;
    while pos < c.len() && c[pos] == b' ' {
        pos += 1;
    }
    let day_start = pos;
    while pos < c.len() && c[pos].is_ascii_digit() {
        pos += 1;
    }
    (1..=2).contains(&(pos - day_start)) && pos < c.len() && c[pos] == b' ' && is_clock(&c[pos + 1..])
}

/// `15/Feb/2024:09:11:15`
fn is_clf_date(c: &[u8]) -> bool {
    c.len() >= 20
        && c[..2].iter().all(u8::is_ascii_digit)
        && c[2] == b'/'
        && MONTHS.iter().any(|m| c[3..].starts_with(m))
        && c[6] == b'/'
        && c[7..11].iter().all(u8::is_ascii_digit)
        && c[11] == b':'
        && is_clock(&c[12..])
}

pub(crate) fn starts_with_any(haystack: &[u8], needles: &[&[u8]]) -> bool {
    needles.iter().any(|n| haystack.starts_with(n))
}

pub(crate) fn contains_any(haystack: &[u8], needles: &[&[u8]]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack.windows(n.len()).any(|w| w == *n))
}

/// Skip past common log-line prefixes (timestamps, brackets, container names)
/// and return the offset where the message body starts.
///
/// Handles:
/// - `2026-02-05T10:00:00.000Z ERROR ...`
/// - `2026-02-05 10:00:00,067 [ERROR] ...`
/// - `[2026-02-05T10:00:00Z] ERROR ...`
/// - `web_1 | ERROR ...`
pub(crate) fn skip_log_prefix(content: &[u8]) -> usize {
    let len = content.len();
    let mut pos = skip_spaces(content, 0);

    for _ in 0..4 {
        pos = skip_spaces(content, pos);
        if pos >= len {
            return 0;
        }

        // [anything] unless it holds a level keyword
        if content[pos] == b'[' {
            if let Some(end) = content[pos..].iter().position(|&b| b == b']') {
                let inner = &content[pos + 1..pos + end];
                if LEVEL_KEYWORDS.iter().any(|kw| inner == *kw) {
                    break;
                }
                pos += end + 1;
                continue;
            }
        }

        // Timestamp-ish token: starts with a digit, carries separators
        if content[pos].is_ascii_digit() {
            let end = token_end(content, pos);
            let token = &content[pos..end];
            let has_separator = token.iter().any(|&b| b == b'-' || b == b':' || b == b'T');
            if has_separator && token.len() >= 8 {
                pos = end;
                continue;
            }
            break;
        }

        // "container_name | ERROR ..."
        if let Some(pipe) = content[pos..].iter().position(|&b| b == b'|') {
            let absolute = pos + pipe;
            let left = &content[pos..absolute];
            if pipe < 80 && absolute + 2 < len && !contains_any(left, LEVEL_KEYWORDS) {
                pos = absolute + 1;
                continue;
            }
        }

        break;
    }

    let pos = skip_spaces(content, pos);
    // Consumed most of the line: it was not a prefix.
    if len > 10 && pos > len * 5 / 6 {
        return 0;
    }
    pos
}

/// Level keyword at exactly `pos`, followed by a word boundary.
pub(crate) fn check_level_at(content: &[u8], pos: usize, levels: &[&[u8]]) -> bool {
    let Some(slice) = content.get(pos..) else {
        return false;
    };
    levels.iter().any(|level| {
        if !slice.starts_with(level) {
            return false;
        }
        match content.get(pos + level.len()) {
            None => true,
            Some(&next) => !next.is_ascii_alphanumeric() && next != b'_',
        }
    })
}

fn skip_spaces(content: &[u8], mut pos: usize) -> usize {
    while pos < content.len() && content[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn token_end(content: &[u8], mut pos: usize) -> usize {
    while pos < content.len() && !content[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}
