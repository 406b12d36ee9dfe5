/// Random-access, 1-based line table over a source text.
#[derive(Clone, Debug, Default)]
pub struct SourceIndex {
    lines: Vec<String>,
}

impl SourceIndex {
    pub fn new(text: &str) -> Self {
        SourceIndex {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// The text of 1-based `line`, without its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Inclusive 1-based line range clamped to the document.
    pub fn clamp(&self, first: usize, last: usize) -> (usize, usize) {
        (first.max(1), last.min(self.lines.len()))
    }
}
