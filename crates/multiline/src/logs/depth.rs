//! Bracket tracker — running depth of unmatched `{`, `[`, `(`.
//!
//! Depth is cumulative across every line folded into a buffer. Closers with
//! no matching opener drive it negative; that is tolerated, never corrected.

/// Bracket profile of a single line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineShape {
    /// Net change in depth contributed by the line.
    pub delta: i64,
    /// Lowest running depth reached inside the line, relative to its start.
    pub min: i64,
    pub openers: usize,
    pub closers: usize,
}

impl LineShape {
    pub fn scan(line: &str) -> Self {
        let mut shape = LineShape::default();
        let mut running = 0i64;
        for b in line.bytes() {
            match b {
                b'{' | b'[' | b'(' => {
                    running += 1;
                    shape.openers += 1;
                }
                b'}' | b']' | b')' => {
                    running -= 1;
                    shape.closers += 1;
                    shape.min = shape.min.min(running);
                }
                _ => {}
            }
        }
        shape.delta = running;
        shape
    }

    pub fn has_brackets(&self) -> bool {
        self.openers > 0 || self.closers > 0
    }

    /// Opens at least one structure and closes everything it opened, without
    /// ever closing something it did not open.
    pub fn is_self_contained(&self) -> bool {
        self.openers > 0 && self.delta == 0 && self.min >= 0
    }
}

/// Running structure depth of a buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthTracker {
    depth: i64,
    /// Self-containment of the most recent line that carried any bracket.
    last_bracketed: Option<bool>,
}

impl DepthTracker {
    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// True when folding a line of this shape would leave a structure open.
    pub fn is_open_after(&self, shape: &LineShape) -> bool {
        self.depth + shape.delta > 0
    }

    pub fn last_bracketed_self_contained(&self) -> bool {
        self.last_bracketed == Some(true)
    }

    pub fn apply(&mut self, shape: &LineShape) {
        self.depth += shape.delta;
        if shape.has_brackets() {
            self.last_bracketed = Some(shape.is_self_contained());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_balanced_json() {
        let shape = LineShape::scan(r#"Order response: {"body":{"path":"/orders"},"list":[1,2]}"#);
        assert_eq!(shape.delta, 0);
        assert_eq!(shape.openers, 3);
        assert!(shape.is_self_contained());
    }

    #[test]
    fn test_scan_dangling_opener() {
        let shape = LineShape::scan("    at new Promise (<anonymous>) {");
        assert_eq!(shape.delta, 1);
        assert!(!shape.is_self_contained());
    }

    #[test]
    fn test_scan_leading_closer_is_not_self_contained() {
        let shape = LineShape::scan("} else {");
        assert_eq!(shape.delta, 0);
        assert_eq!(shape.min, -1);
        assert!(!shape.is_self_contained());
    }

    #[test]
    fn test_scan_plain_text() {
        let shape = LineShape::scan("for call at");
        assert!(!shape.has_brackets());
        assert!(!shape.is_self_contained());
    }

    #[test]
    fn test_depth_accumulates_across_lines() {
        let mut tracker = DepthTracker::default();
        tracker.apply(&LineShape::scan("payload: {"));
        tracker.apply(&LineShape::scan("  items: ["));
        assert_eq!(tracker.depth(), 2);
        assert!(tracker.is_open_after(&LineShape::scan("  a: 1")));

        tracker.apply(&LineShape::scan("  ]"));
        assert!(!tracker.is_open_after(&LineShape::scan("}")));
        tracker.apply(&LineShape::scan("}"));
        assert_eq!(tracker.depth(), 0);
        assert!(tracker.is_open_after(&LineShape::scan("next {")));
    }

    #[test]
    fn test_unmatched_closer_goes_negative() {
        let mut tracker = DepthTracker::default();
        tracker.apply(&LineShape::scan("))]"));
        assert_eq!(tracker.depth(), -3);
        assert!(!tracker.is_open_after(&LineShape::scan("{")));
    }

    #[test]
    fn test_last_bracketed_ignores_plain_lines() {
        let mut tracker = DepthTracker::default();
        assert!(!tracker.last_bracketed_self_contained());

        tracker.apply(&LineShape::scan("call (a, b)"));
        tracker.apply(&LineShape::scan("no brackets here"));
        assert!(tracker.last_bracketed_self_contained());

        tracker.apply(&LineShape::scan("open {"));
        assert!(!tracker.last_bracketed_self_contained());
    }
}
