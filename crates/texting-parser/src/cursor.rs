/// Outcome of a lookahead over buffered input.
///
/// `NeedMore` means the deciding characters lie past the end of what has
/// been fed so far. The caller keeps the undecided text and retries once the
/// next fragment (or end of input) arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan<T> {
    Ready(T),
    NeedMore,
}

/// A cursor for character-by-character scanning over a string slice.
///
/// Positions are byte offsets into `s`, always on a char boundary.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The string being scanned.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// The unscanned remainder.
    pub fn rest(&self) -> &'a str {
        &self.s[self.i.min(self.s.len())..]
    }

    /// Peeks at the current character without advancing.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Advances by one character, returning it.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.i += ch.len_utf8();
        Some(ch)
    }

    /// Advances by `n` bytes. The caller must land on a char boundary.
    pub fn bump_n(&mut self, n: usize) {
        self.i += n;
    }

    /// Advances over the longest prefix whose characters satisfy `pred`,
    /// returning it.
    pub fn bump_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.i += len;
        &rest[..len]
    }
}
