//! character and line sources with one-item lookahead
//!
//! [PushBack] feeds the character-level grammars (brace style), [LineGetter]
//! feeds the line-oriented ones (httpd tags). Both track line numbers so parse
//! errors can point at the offending source line.

/// Character stream with lookahead and push-back.
///
/// The line counter is 1-based and only moves when a `\n` is *consumed* via
/// [PushBack::next]; pushing a `\n` back moves it down again so the counter
/// always names the line the next character belongs to.
pub struct PushBack<'a> {
    chars: std::str::Chars<'a>,
    pending: Vec<char>,
    lineno: usize,
}

impl<'a> PushBack<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_line(text, 1)
    }

    /// Start counting at `lineno` instead of 1 (for parsing a slice of a
    /// larger document, e.g. the inside of an httpd tag).
    pub fn with_line(text: &'a str, lineno: usize) -> Self {
        Self {
            chars: text.chars(),
            pending: Vec::new(),
            lineno,
        }
    }

    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Next character without consuming it. `None` means the source is
    /// exhausted and nothing was pushed back.
    pub fn peek(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            let c = self.chars.next()?;
            self.pending.push(c);
        }
        self.pending.last().copied()
    }

    /// Consume and return the next character.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<char> {
        let c = self.pending.pop().or_else(|| self.chars.next())?;
        if c == '\n' {
            self.lineno += 1;
        }
        Some(c)
    }

    /// Un-consume a character; it becomes the next item returned.
    pub fn push_back(&mut self, c: char) {
        if c == '\n' {
            self.lineno -= 1;
        }
        self.pending.push(c);
    }
}

/// Logical-line iterator for line-oriented grammars.
///
/// Skips blank lines and full-line comments, joins `\`-continuations into one
/// logical line and right-trims it (leading indentation is preserved). Each
/// yielded line carries the 1-based number of its first physical line.
pub struct LineGetter<'a> {
    lines: &'a [String],
    pos: usize,
    comment: char,
    pending: Option<(usize, String)>,
}

impl<'a> LineGetter<'a> {
    pub fn new(lines: &'a [String], comment: char) -> Self {
        Self {
            lines,
            pos: 0,
            comment,
            pending: None,
        }
    }

    /// Next logical line, or `None` when the input is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(usize, String)> {
        if let Some(pushed) = self.pending.take() {
            return Some(pushed);
        }

        loop {
            let raw = self.lines.get(self.pos)?;
            self.pos += 1;
            let lineno = self.pos;

            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(self.comment) {
                continue;
            }

            let mut logical = raw.trim_end().to_string();
            while logical.ends_with('\\') {
                logical.pop();
                let Some(continuation) = self.lines.get(self.pos) else {
                    // trailing backslash on the last line: nothing to join
                    break;
                };
                self.pos += 1;
                logical.push_str(continuation.trim_end());
            }

            return Some((lineno, logical));
        }
    }

    /// Un-consume a logical line; it becomes the next item returned.
    pub fn push_back(&mut self, lineno: usize, line: String) {
        self.pending = Some((lineno, line));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn peek_does_not_consume() {
        let mut s = PushBack::new("ab");
        assert_eq!(s.peek(), Some('a'));
        assert_eq!(s.peek(), Some('a'));
        assert_eq!(s.next(), Some('a'));
        assert_eq!(s.next(), Some('b'));
        assert_eq!(s.next(), None);
        assert_eq!(s.peek(), None);
    }

    #[test]
    fn push_back_is_returned_first() {
        let mut s = PushBack::new("b");
        s.push_back('a');
        assert_eq!(s.next(), Some('a'));
        assert_eq!(s.next(), Some('b'));
    }

    #[test]
    fn lineno_tracks_consumed_newlines() {
        let mut s = PushBack::new("a\nb\nc");
        assert_eq!(s.lineno(), 1);
        s.next();
        s.next();
        assert_eq!(s.lineno(), 2);
        s.next();
        let nl = s.next().unwrap();
        assert_eq!(nl, '\n');
        assert_eq!(s.lineno(), 3);
        s.push_back(nl);
        // pushed-back newline belongs to line 2 again
        assert_eq!(s.lineno(), 2);
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let lines = lines("# header\n\nServerRoot /etc\n   \nUser apache");
        let mut lg = LineGetter::new(&lines, '#');
        assert_eq!(lg.next(), Some((3, "ServerRoot /etc".into())));
        assert_eq!(lg.next(), Some((5, "User apache".into())));
        assert_eq!(lg.next(), None);
    }

    #[test]
    fn continuations_are_joined() {
        let lines = lines("LogFormat \"%h\" \\\n  combined\nUser apache");
        let mut lg = LineGetter::new(&lines, '#');
        assert_eq!(lg.next(), Some((1, "LogFormat \"%h\"   combined".into())));
        assert_eq!(lg.next(), Some((3, "User apache".into())));
    }

    #[test]
    fn push_back_line() {
        let lines = lines("one\ntwo");
        let mut lg = LineGetter::new(&lines, '#');
        let (n, l) = lg.next().unwrap();
        lg.push_back(n, l);
        assert_eq!(lg.next(), Some((1, "one".into())));
        assert_eq!(lg.next(), Some((2, "two".into())));
    }
}
