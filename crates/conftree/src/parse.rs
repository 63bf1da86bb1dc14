//! tokenizing primitives shared by every grammar
//!
//! Both the brace and the tag grammar delegate string/attribute tokenizing to
//! [Cursor]; the grammars themselves only decide where statements start and
//! end. Type coercion ([typed]) is applied to single-attribute directives
//! only, so multi-value directives keep their values as strings in source
//! order.
use crate::node::Attr;
use crate::stream::PushBack;

/// Fatal parse failure; always carries the file and line it happened on.
///
/// There is deliberately no "recovered" variant: a half-parsed tree would
/// silently produce wrong query answers, which is worse than refusing the
/// document outright.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("{file}:{line}: unexpected end of input while parsing {expected}")]
    UnexpectedEof {
        file: String,
        line: usize,
        expected: &'static str,
    },
    #[error("{file}:{line}: unterminated quoted string")]
    UnterminatedString { file: String, line: usize },
    #[error("{file}:{line}: '{name}' is never closed")]
    UnterminatedSection {
        file: String,
        line: usize,
        name: String,
    },
    #[error("{file}:{line}: closing tag '</{close}>' does not match opening tag '<{open}>'")]
    MismatchedTag {
        file: String,
        line: usize,
        open: String,
        close: String,
    },
    #[error("{file}:{line}: closing tag '</{close}>' without an open section")]
    StrayClosingTag {
        file: String,
        line: usize,
        close: String,
    },
    #[error("{file}:{line}: malformed tag, missing '>'")]
    MalformedTag { file: String, line: usize },
    #[error("{file}:{line}: unexpected '{token}'")]
    Unexpected {
        file: String,
        line: usize,
        token: char,
    },
}

/// Coerce a bare token to its typed form.
///
/// Recognized boolean spellings map to [Attr::Bool], all-digit tokens to
/// [Attr::Int], decimal tokens to [Attr::Float]; anything else stays a
/// string.
pub fn typed(token: &str) -> Attr {
    match token.to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" => return Attr::Bool(true),
        "no" | "off" | "false" => return Attr::Bool(false),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return Attr::Int(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        return Attr::Float(f);
    }
    Attr::Str(token.to_string())
}

/// A [PushBack] stream plus the file identity parse errors should name.
pub(crate) struct Cursor<'a> {
    pub(crate) stream: PushBack<'a>,
    pub(crate) file: String,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str, file: impl Into<String>) -> Self {
        Self {
            stream: PushBack::new(text),
            file: file.into(),
        }
    }

    pub(crate) fn with_line(text: &'a str, file: impl Into<String>, lineno: usize) -> Self {
        Self {
            stream: PushBack::with_line(text, lineno),
            file: file.into(),
        }
    }

    pub(crate) fn lineno(&self) -> usize {
        self.stream.lineno()
    }

    pub(crate) fn eof(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedEof {
            file: self.file.clone(),
            line: self.lineno(),
            expected,
        }
    }

    /// Skip spaces and tabs, not newlines.
    pub(crate) fn skip_inline_ws(&mut self) {
        while let Some(c) = self.stream.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.stream.next();
            } else {
                break;
            }
        }
    }

    /// Consume a quoted string starting at the opening `"` or `'`, honoring
    /// backslash escapes. Returns the content without the quotes.
    pub(crate) fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.lineno();
        let quote = self
            .stream
            .next()
            .ok_or_else(|| self.eof("quoted string"))?;

        let mut out = String::new();
        loop {
            match self.stream.next() {
                None => {
                    return Err(ParseError::UnterminatedString {
                        file: self.file.clone(),
                        line: start,
                    })
                }
                Some('\\') => {
                    let escaped = self.stream.next().ok_or_else(|| {
                        ParseError::UnterminatedString {
                            file: self.file.clone(),
                            line: start,
                        }
                    })?;
                    out.push(escaped);
                }
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    /// Consume a bare token, stopping at whitespace or any of `terminators`
    /// (which are left unconsumed).
    pub(crate) fn parse_bare(&mut self, terminators: &[char]) -> String {
        let mut out = String::new();
        while let Some(c) = self.stream.peek() {
            if c.is_whitespace() || terminators.contains(&c) {
                break;
            }
            out.push(c);
            self.stream.next();
        }
        out
    }

    /// Parse the value portion of a statement: quoted strings and bare
    /// tokens, separated by inline whitespace, up to (not including) one of
    /// `terminators` or a newline-class terminator the caller listed.
    ///
    /// A leading literal `=` is discarded as a key/value separator. A single
    /// bare result goes through [typed]; quoted values and multi-value lists
    /// stay strings.
    pub(crate) fn parse_attrs(&mut self, terminators: &[char]) -> Result<Vec<Attr>, ParseError> {
        // token plus "was it quoted" so coercion can skip quoted values
        let mut raw: Vec<(String, bool)> = Vec::new();

        loop {
            self.skip_inline_ws();
            let Some(c) = self.stream.peek() else { break };
            if terminators.contains(&c) {
                break;
            }

            if c == '"' || c == '\'' {
                raw.push((self.parse_string()?, true));
            } else {
                let token = self.parse_bare(terminators);
                if token.is_empty() {
                    // peeked char is whitespace the skip above does not
                    // cover (a newline not in the terminator set)
                    self.stream.next();
                    continue;
                }
                if raw.is_empty() && token == "=" {
                    continue;
                }
                raw.push((token, false));
            }
        }

        Ok(match raw.as_slice() {
            [(token, false)] => vec![typed(token)],
            _ => raw.into_iter().map(|(token, _)| Attr::Str(token)).collect(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_booleans() {
        for spelling in ["yes", "on", "true", "YES", "On", "TRUE"] {
            assert_eq!(typed(spelling), Attr::Bool(true), "{spelling}");
        }
        for spelling in ["no", "off", "false", "NO", "Off", "FALSE"] {
            assert_eq!(typed(spelling), Attr::Bool(false), "{spelling}");
        }
    }

    #[test]
    fn typed_numbers_and_strings() {
        assert_eq!(typed("256"), Attr::Int(256));
        assert_eq!(typed("-3"), Attr::Int(-3));
        assert_eq!(typed("2.5"), Attr::Float(2.5));
        assert_eq!(typed("100k"), Attr::Str("100k".into()));
        assert_eq!(typed("/var/log"), Attr::Str("/var/log".into()));
    }

    #[test]
    fn quoted_strings_with_escapes() {
        let mut cur = Cursor::new(r#""a \"b\" c" rest"#, "t.conf");
        assert_eq!(cur.parse_string().unwrap(), "a \"b\" c");
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let mut cur = Cursor::new("\"no closing quote", "t.conf");
        let err = cur.parse_string().unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { line: 1, .. }));
    }

    #[test]
    fn single_bare_attr_is_coerced() {
        let mut cur = Cursor::new("256;", "t.conf");
        assert_eq!(cur.parse_attrs(&[';']).unwrap(), vec![Attr::Int(256)]);
    }

    #[test]
    fn single_quoted_attr_stays_string() {
        let mut cur = Cursor::new("\"256\";", "t.conf");
        assert_eq!(
            cur.parse_attrs(&[';']).unwrap(),
            vec![Attr::Str("256".into())]
        );
    }

    #[test]
    fn multi_attrs_stay_strings() {
        let mut cur = Cursor::new("0664 root utmp\n", "t.conf");
        assert_eq!(
            cur.parse_attrs(&['\n']).unwrap(),
            vec![
                Attr::Str("0664".into()),
                Attr::Str("root".into()),
                Attr::Str("utmp".into())
            ]
        );
    }

    #[test]
    fn leading_assignment_separator_is_discarded() {
        let mut cur = Cursor::new("= weekly\n", "t.conf");
        assert_eq!(
            cur.parse_attrs(&['\n']).unwrap(),
            vec![Attr::Str("weekly".into())]
        );
    }
}
