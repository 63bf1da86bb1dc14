//! brace-delimited grammar (nginx, multipath, logrotate)
//!
//! A statement is `name [values]` terminated by `;` or end of line, or
//! `name [values] { ... }` opening a nested section. The dialects differ in
//! how the value list ends:
//!
//! - nginx: values run until `;`, which may span physical lines
//! - multipath: exactly one value per directive, the next word starts a new
//!   statement
//! - logrotate: values run to end of line, plus the script keywords whose
//!   body is raw text up to a literal `endscript` line
use crate::node::{Attr, ConfTree, Kind, NodeId, Source};
use crate::parse::{typed, Cursor, ParseError};

/// Script-body keywords recognized by the logrotate dialect.
pub const LOGROTATE_SCRIPTS: &[&str] =
    &["prerotate", "postrotate", "firstaction", "lastaction", "preremove"];

/// Tokenizing rules of one brace-style configuration language.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    /// Values run until `;` instead of ending at the physical line.
    pub semicolons: bool,
    /// Each directive takes at most one value.
    pub one_value: bool,
    /// Keywords introducing a raw body terminated by an `endscript` line.
    pub scripts: &'static [&'static str],
}

impl Dialect {
    pub fn nginx() -> Self {
        Self {
            semicolons: true,
            one_value: false,
            scripts: &[],
        }
    }

    pub fn multipath() -> Self {
        Self {
            semicolons: false,
            one_value: true,
            scripts: &[],
        }
    }

    pub fn logrotate() -> Self {
        Self {
            semicolons: false,
            one_value: false,
            scripts: LOGROTATE_SCRIPTS,
        }
    }
}

pub fn parse(source: Source, dialect: Dialect) -> Result<ConfTree, ParseError> {
    let text = source.lines.join("\n");
    let file = source.path.display().to_string();

    let mut parser = Parser {
        cur: Cursor::new(&text, file),
        tree: ConfTree::bare(),
        dialect,
    };
    parser.statements(0, None)?;

    let mut tree = parser.tree;
    tree.attach_source(source);
    Ok(tree)
}

pub fn parse_nginx(source: Source) -> Result<ConfTree, ParseError> {
    parse(source, Dialect::nginx())
}

pub fn parse_multipath(source: Source) -> Result<ConfTree, ParseError> {
    parse(source, Dialect::multipath())
}

pub fn parse_logrotate(source: Source) -> Result<ConfTree, ParseError> {
    parse(source, Dialect::logrotate())
}

struct Parser<'a> {
    cur: Cursor<'a>,
    tree: ConfTree,
    dialect: Dialect,
}

impl Parser<'_> {
    fn skip_ws_and_comments(&mut self) {
        while let Some(c) = self.cur.stream.peek() {
            if c.is_whitespace() {
                self.cur.stream.next();
            } else if c == '#' {
                while let Some(c) = self.cur.stream.next() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Everything up to and including the next newline, without the newline.
    /// `None` when already at end of input.
    fn raw_line(&mut self) -> Option<String> {
        self.cur.stream.peek()?;
        let mut out = String::new();
        while let Some(c) = self.cur.stream.next() {
            if c == '\n' {
                break;
            }
            out.push(c);
        }
        Some(out)
    }

    fn statements(
        &mut self,
        parent: NodeId,
        open: Option<(String, usize)>,
    ) -> Result<(), ParseError> {
        loop {
            self.skip_ws_and_comments();

            match self.cur.stream.peek() {
                None => {
                    return match open {
                        None => Ok(()),
                        Some((name, line)) => Err(ParseError::UnterminatedSection {
                            file: self.cur.file.clone(),
                            line,
                            name,
                        }),
                    }
                }
                Some('}') => {
                    self.cur.stream.next();
                    return match open {
                        Some(_) => Ok(()),
                        None => Err(ParseError::Unexpected {
                            file: self.cur.file.clone(),
                            line: self.cur.lineno(),
                            token: '}',
                        }),
                    };
                }
                Some(';') => {
                    self.cur.stream.next();
                    continue;
                }
                Some('{') => {
                    return Err(ParseError::Unexpected {
                        file: self.cur.file.clone(),
                        line: self.cur.lineno(),
                        token: '{',
                    })
                }
                Some(_) => {}
            }

            let line = self.cur.lineno();
            let name = match self.cur.stream.peek() {
                Some('"') | Some('\'') => self.cur.parse_string()?,
                _ => self.cur.parse_bare(&['{', '}', ';', '#']),
            };

            if self.dialect.scripts.contains(&name.as_str()) {
                self.script(parent, name, line)?;
                continue;
            }

            let attrs = if self.dialect.one_value {
                self.one_value()?
            } else if self.dialect.semicolons {
                self.cur.parse_attrs(&['{', '}', ';', '#'])?
            } else {
                self.cur.parse_attrs(&['{', '}', ';', '\n', '#'])?
            };

            self.cur.skip_inline_ws();
            match self.cur.stream.peek() {
                Some('{') => {
                    self.cur.stream.next();
                    let section = self.tree.push(
                        parent,
                        Kind::Section,
                        Some(name.clone()),
                        attrs,
                        Some(line),
                        Some(0),
                    );
                    self.statements(section, Some((name, line)))?;
                }
                Some(';') => {
                    self.cur.stream.next();
                    self.tree
                        .push(parent, Kind::Directive, Some(name), attrs, Some(line), Some(0));
                }
                // end of line, '}', '#' or end of input all end the statement
                _ => {
                    self.tree
                        .push(parent, Kind::Directive, Some(name), attrs, Some(line), Some(0));
                }
            }
        }
    }

    /// Multipath-style: at most one value, then the next word starts a new
    /// statement.
    fn one_value(&mut self) -> Result<Vec<Attr>, ParseError> {
        self.cur.skip_inline_ws();
        match self.cur.stream.peek() {
            Some('"') | Some('\'') => Ok(vec![Attr::Str(self.cur.parse_string()?)]),
            None | Some('{') | Some('}') | Some(';') | Some('#') | Some('\n') => Ok(Vec::new()),
            Some(_) => {
                let token = self.cur.parse_bare(&['{', '}', ';', '#']);
                Ok(vec![typed(&token)])
            }
        }
    }

    /// Raw body capture for logrotate script keywords: everything up to a
    /// line whose trimmed content is `endscript`, stored verbatim as one
    /// multi-line string attribute.
    fn script(&mut self, parent: NodeId, name: String, line: usize) -> Result<(), ParseError> {
        // discard the remainder of the keyword line
        self.raw_line();

        let mut body: Vec<String> = Vec::new();
        loop {
            let Some(raw) = self.raw_line() else {
                return Err(ParseError::UnterminatedSection {
                    file: self.cur.file.clone(),
                    line,
                    name,
                });
            };
            if raw.trim() == "endscript" {
                break;
            }
            body.push(raw);
        }

        tracing::trace!(script = %name, lines = body.len(), "captured script body");
        self.tree.push(
            parent,
            Kind::Directive,
            Some(name),
            vec![Attr::Str(body.join("\n"))],
            Some(line),
            Some(0),
        );
        Ok(())
    }
}
