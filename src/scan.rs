/// Sequential delimiter scanner over a markup string.
///
/// Every call to [Scanner::scan_tag] resumes where the previous successful
/// call stopped, so callers must request fields in the order they appear in
/// the source.
#[derive(Debug)]
pub(crate) struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Return the text between the next `start` and the following `end`.
    ///
    /// On a miss the cursor stays put.
    pub fn scan_tag(&mut self, start: &str, end: &str) -> Option<&'a str> {
        let rest = &self.source[self.pos..];
        let open = rest.find(start)? + start.len();
        let len = rest[open..].find(end)?;

        let captured = &rest[open..open + len];
        self.pos += open + len + end.len();
        Some(captured)
    }
}
