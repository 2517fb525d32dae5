//! Accumulating status-line buffer for one invocation.

/// Human-readable status lines produced during a run.
///
/// Owned by the router for the duration of one invocation; the caller reads
/// or drains it afterwards. When `echo` is on, each line is also written to
/// stdout as it is appended, so live runs stream their progress.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    lines: Vec<String>,
    echo: bool,
}

impl OutputBuffer {
    /// A silent buffer (test harnesses, embedding callers).
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that mirrors every appended line to stdout.
    pub fn echoing() -> Self {
        Self {
            lines: Vec::new(),
            echo: true,
        }
    }

    pub fn append(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{line}");
        }
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The accumulated text, one entry per line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Return the accumulated text and clear the buffer.
    pub fn drain(&mut self) -> String {
        let text = self.text();
        self.lines.clear();
        text
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_accumulates_in_order() {
        let mut out = OutputBuffer::new();
        out.append("first");
        out.append("second");
        assert_eq!(out.lines(), ["first", "second"]);
        assert_eq!(out.text(), "first\nsecond\n");
    }

    #[test]
    fn drain_returns_text_and_clears() {
        let mut out = OutputBuffer::new();
        out.append("only");
        assert_eq!(out.drain(), "only\n");
        assert!(out.is_empty());
        assert_eq!(out.drain(), "");
    }
}
