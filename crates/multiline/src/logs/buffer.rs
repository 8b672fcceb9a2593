//! Buffer — the message under construction.
//!
//! Owns the folded content, the bracket depth, the error-grammar progress and
//! the size limit. A buffer is only ever touched by the collector loop.

use chrono::{DateTime, Utc};

use super::depth::{DepthTracker, LineShape};
use super::model::{Level, LogEntry, Message};
use super::pattern::{block_start, continuation_marker, is_blank, is_indented, BlockGrammar, ContinuationMarker};

/// Progress through the multi-line error grammars seen in a buffer.
#[derive(Debug, Clone, Default)]
pub struct GrammarState {
    open: Option<OpenBlock>,
    /// Grammars with a finished instance since the last chain lead-in.
    completed: Vec<BlockGrammar>,
}

#[derive(Debug, Clone, Copy)]
struct OpenBlock {
    grammar: BlockGrammar,
    frames: usize,
}

impl GrammarState {
    /// An instance counts as complete once its header has been followed by at
    /// least one indented frame.
    pub fn has_completed(&self, grammar: BlockGrammar) -> bool {
        self.completed.contains(&grammar)
    }

    fn observe(&mut self, line: &str) {
        if let Some(grammar) = block_start(line) {
            self.open = Some(OpenBlock { grammar, frames: 0 });
            return;
        }

        if is_indented(line) && !is_blank(line) {
            if let Some(ref mut block) = self.open {
                block.frames += 1;
                if block.frames == 1 && !self.completed.contains(&block.grammar) {
                    self.completed.push(block.grammar);
                }
            }
            return;
        }

        if continuation_marker(line) == Some(ContinuationMarker::ChainLeadIn) {
            self.open = None;
            self.completed.clear();
        }
    }
}

#[derive(Debug)]
pub struct Buffer {
    timestamp: DateTime<Utc>,
    level: Level,
    content: String,
    line_count: usize,
    size_limit: usize,
    truncated: bool,
    depth: DepthTracker,
    grammar: GrammarState,
}

impl Buffer {
    /// Open a buffer on its first line.
    pub fn start(entry: LogEntry, size_limit: usize) -> Self {
        let mut buffer = Self {
            timestamp: entry.timestamp,
            level: entry.level,
            content: String::new(),
            line_count: 0,
            size_limit,
            truncated: false,
            depth: DepthTracker::default(),
            grammar: GrammarState::default(),
        };
        buffer.fold(&entry.content);
        buffer
    }

    /// Fold a continuation line into the buffer.
    pub fn append(&mut self, entry: LogEntry) {
        self.fold(&entry.content);
    }

    /// Materialize the message, consuming the buffer.
    pub fn flush(self) -> Message {
        Message {
            timestamp: self.timestamp,
            content: self.content,
            level: self.level,
            line_count: self.line_count,
            truncated: self.truncated,
        }
    }

    pub fn depth(&self) -> &DepthTracker {
        &self.depth
    }

    pub fn grammar(&self) -> &GrammarState {
        &self.grammar
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    fn fold(&mut self, line: &str) {
        self.depth.apply(&LineShape::scan(line));
        self.grammar.observe(line);
        self.line_count += 1;

        if self.truncated {
            return;
        }

        let separator = if self.line_count > 1 { "\n" } else { "" };
        let remaining = self.size_limit.saturating_sub(self.content.len());
        if separator.len() + line.len() <= remaining {
            self.content.push_str(separator);
            self.content.push_str(line);
            return;
        }

        let start = self.content.len();
        self.content.push_str(&separator[..separator.len().min(remaining)]);
        let budget = remaining.saturating_sub(separator.len());
        let cut = floor_char_boundary(line, budget);
        self.content.push_str(&line[..cut]);
        // Backing off a partial char also drops the whitespace it leaves
        // dangling, but only within the piece appended here.
        if cut < budget {
            let kept = start + self.content[start..].trim_end().len();
            self.content.truncate(kept);
        }
        self.truncated = true;

        tracing::debug!(
            size_limit = self.size_limit,
            kept_bytes = self.content.len(),
            "multiline: size limit reached, truncating message"
        );
    }
}

/// Largest index `<= index` that lies on a char boundary of `s`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut idx = index;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str) -> LogEntry {
        LogEntry::new(DateTime::<Utc>::from_timestamp(0, 0).unwrap(), content, Level::Unknown)
    }

    // ─── Assembly ───────────────────────────────────────────────

    #[test]
    fn test_start_captures_first_line_metadata() {
        let first = LogEntry::new(DateTime::<Utc>::from_timestamp(100, 0).unwrap(), "ERROR boom", Level::Error);
        let mut buffer = Buffer::start(first, 1024);

        let later = LogEntry::new(DateTime::<Utc>::from_timestamp(200, 0).unwrap(), "    at main", Level::Info);
        buffer.append(later);

        let message = buffer.flush();
        assert_eq!(message.timestamp, DateTime::<Utc>::from_timestamp(100, 0).unwrap());
        assert_eq!(message.level, Level::Error);
        assert_eq!(message.content, "ERROR boom\n    at main");
        assert_eq!(message.line_count, 2);
        assert!(!message.truncated);
    }

    #[test]
    fn test_blank_lines_keep_their_separators() {
        let mut buffer = Buffer::start(entry("foo"), 1024);
        buffer.append(entry(""));
        buffer.append(entry("bar"));
        assert_eq!(buffer.flush().content, "foo\n\nbar");
    }

    #[test]
    fn test_empty_first_line() {
        let buffer = Buffer::start(entry(""), 1024);
        assert!(buffer.is_empty());
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.flush().content, "");
    }

    // ─── Size limit ─────────────────────────────────────────────

    #[test]
    fn test_long_first_line_truncated_to_limit() {
        let line = format!("I0215 12:33:07.230967{}", " foo".repeat(25));
        assert_eq!(line.len(), 121);

        let buffer = Buffer::start(entry(&line), 100);
        assert!(buffer.is_truncated());
        let message = buffer.flush();
        assert_eq!(message.content.len(), 100);
        assert_eq!(message.content, line[..100]);
    }

    #[test]
    fn test_truncation_never_splits_a_char() {
        let line = format!("I0215 12:33:07.230967{}", " €".repeat(25));
        assert_eq!(line.len(), 121);

        let message = Buffer::start(entry(&line), 100).flush();
        assert_eq!(message.content.len(), 97);
        assert!(message.content.ends_with('€'));
        assert!(line.starts_with(&message.content));
    }

    #[test]
    fn test_lines_after_truncation_are_counted_not_stored() {
        let mut buffer = Buffer::start(entry("0123456789"), 12);
        buffer.append(entry("abcdef"));
        assert!(buffer.is_truncated());
        assert_eq!(buffer.len(), 12);

        buffer.append(entry("    more frames"));
        buffer.append(entry("payload {"));
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer.line_count(), 4);
        assert_eq!(buffer.depth().depth(), 1);

        let message = buffer.flush();
        assert_eq!(message.content, "0123456789\na");
        assert!(message.truncated);
        assert_eq!(message.line_count, 4);
    }

    #[test]
    fn test_exact_fit_is_not_truncated() {
        let mut buffer = Buffer::start(entry("12345"), 11);
        buffer.append(entry("abcde"));
        assert!(!buffer.is_truncated());
        assert_eq!(buffer.len(), 11);
    }

    #[test]
    fn test_separator_fills_remaining_budget() {
        let mut buffer = Buffer::start(entry("0123456789"), 11);
        buffer.append(entry("next"));
        let message = buffer.flush();
        assert_eq!(message.content, "0123456789\n");
        assert!(message.truncated);
    }

    #[test]
    fn test_ascii_cut_after_space_fills_limit() {
        let line = format!("{} {}", "a".repeat(99), "b".repeat(50));
        let message = Buffer::start(entry(&line), 100).flush();
        assert_eq!(message.content.len(), 100);
        assert_eq!(message.content, line[..100]);
        assert!(message.truncated);
    }

    #[test]
    fn test_truncation_keeps_blank_lines_within_budget() {
        let header = "I0215 12:33:07.230967 header";
        assert_eq!(header.len(), 28);

        let mut buffer = Buffer::start(entry(header), 100);
        buffer.append(entry(&"x".repeat(60)));
        for _ in 0..11 {
            buffer.append(entry(""));
        }
        assert_eq!(buffer.len(), 100);
        assert!(!buffer.is_truncated());

        buffer.append(entry("tail"));
        assert!(buffer.is_truncated());
        let message = buffer.flush();
        assert_eq!(message.content.len(), 100);
        assert!(message.content.ends_with(&"\n".repeat(11)));
    }

    // ─── Grammar tracking ───────────────────────────────────────

    #[test]
    fn test_traceback_completes_after_first_frame() {
        let mut buffer = Buffer::start(entry("Traceback (most recent call last):"), 1024);
        assert!(!buffer.grammar().has_completed(BlockGrammar::PythonTraceback));

        buffer.append(entry("  File \"main.py\", line 10, in <module>"));
        assert!(buffer.grammar().has_completed(BlockGrammar::PythonTraceback));
        assert!(!buffer.grammar().has_completed(BlockGrammar::JavaThread));
    }

    #[test]
    fn test_chain_lead_in_resets_completion() {
        let mut buffer = Buffer::start(entry("Traceback (most recent call last):"), 1024);
        buffer.append(entry("  File \"main.py\", line 10, in <module>"));
        buffer.append(entry("ConnectionError"));
        buffer.append(entry(""));
        buffer.append(entry("The above exception was the direct cause of the following exception:"));
        assert!(!buffer.grammar().has_completed(BlockGrammar::PythonTraceback));
    }

    #[test]
    fn test_caused_by_does_not_reset_completion() {
        let mut buffer = Buffer::start(entry("Exception in thread \"main\" java.lang.NullPointerException"), 1024);
        buffer.append(entry("\tat com.example.MyClass.methodA(MyClass.java:10)"));
        buffer.append(entry("Caused by: java.lang.ArrayIndexOutOfBoundsException"));
        buffer.append(entry("\t... 2 more"));
        assert!(buffer.grammar().has_completed(BlockGrammar::JavaThread));
    }

    #[test]
    fn test_floor_char_boundary() {
        let s = "a€b";
        assert_eq!(floor_char_boundary(s, 0), 0);
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 4), 4);
        assert_eq!(floor_char_boundary(s, 99), s.len());
    }
}
