//! tag-delimited grammar (httpd)
//!
//! Line-oriented: `<Name attrs>` opens a section, `</Name>` closes it (names
//! match case-sensitively), any other line is a `Name attrs` directive.
//! Blank lines, `#` comments and `\` line continuations are handled by
//! [crate::stream::LineGetter] before statement parsing sees the line.
use crate::node::{ConfTree, Kind, NodeId, Source};
use crate::parse::{Cursor, ParseError};
use crate::stream::LineGetter;

pub fn parse(source: Source) -> Result<ConfTree, ParseError> {
    let file = source.path.display().to_string();

    let mut parser = Parser {
        lines: LineGetter::new(&source.lines, '#'),
        file,
        tree: ConfTree::bare(),
    };
    parser.statements(0, None)?;

    let mut tree = parser.tree;
    tree.attach_source(source);
    Ok(tree)
}

struct Parser<'a> {
    lines: LineGetter<'a>,
    file: String,
    tree: ConfTree,
}

impl Parser<'_> {
    fn statements(
        &mut self,
        parent: NodeId,
        open: Option<(String, usize)>,
    ) -> Result<(), ParseError> {
        loop {
            let Some((lineno, line)) = self.lines.next() else {
                return match open {
                    None => Ok(()),
                    Some((name, line)) => Err(ParseError::UnterminatedSection {
                        file: self.file.clone(),
                        line,
                        name,
                    }),
                };
            };

            let statement = line.trim();
            if let Some(rest) = statement.strip_prefix("</") {
                let close = rest
                    .strip_suffix('>')
                    .ok_or_else(|| ParseError::MalformedTag {
                        file: self.file.clone(),
                        line: lineno,
                    })?
                    .trim();

                return match &open {
                    Some((name, _)) if name == close => Ok(()),
                    Some((name, opened)) => Err(ParseError::MismatchedTag {
                        file: self.file.clone(),
                        line: *opened,
                        open: name.clone(),
                        close: close.to_string(),
                    }),
                    None => Err(ParseError::StrayClosingTag {
                        file: self.file.clone(),
                        line: lineno,
                        close: close.to_string(),
                    }),
                };
            }

            if let Some(rest) = statement.strip_prefix('<') {
                // attrs may contain '>' inside quotes, so take the last one
                let inner = rest
                    .rfind('>')
                    .map(|at| &rest[..at])
                    .ok_or_else(|| ParseError::MalformedTag {
                        file: self.file.clone(),
                        line: lineno,
                    })?;

                let (name, attrs) = self.split_statement(inner, lineno)?;
                let section = self.tree.push(
                    parent,
                    Kind::Section,
                    Some(name.clone()),
                    attrs,
                    Some(lineno),
                    Some(0),
                );
                self.statements(section, Some((name, lineno)))?;
                continue;
            }

            let (name, attrs) = self.split_statement(statement, lineno)?;
            self.tree
                .push(parent, Kind::Directive, Some(name), attrs, Some(lineno), Some(0));
        }
    }

    fn split_statement(
        &self,
        text: &str,
        lineno: usize,
    ) -> Result<(String, Vec<crate::node::Attr>), ParseError> {
        let mut cur = Cursor::with_line(text, self.file.as_str(), lineno);
        cur.skip_inline_ws();
        let name = cur.parse_bare(&[]);
        let attrs = cur.parse_attrs(&[])?;
        Ok((name, attrs))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Attr;
    use pretty_assertions::assert_eq;

    fn httpd(text: &str) -> ConfTree {
        parse(Source::from_text("/etc/httpd/conf/httpd.conf", text)).unwrap()
    }

    #[test]
    fn directives_and_sections() {
        let tree = httpd(
            "ServerRoot \"/etc/httpd\"\n<IfModule prefork.c>\nServerLimit 256\n</IfModule>\n",
        );

        let server_root = tree.root().at(0).unwrap();
        assert_eq!(server_root.name(), Some("ServerRoot"));
        assert_eq!(server_root.value_string(), "/etc/httpd");

        let ifmodule = tree.root().at(1).unwrap();
        assert_eq!(ifmodule.kind(), Kind::Section);
        assert_eq!(ifmodule.attrs(), &[Attr::Str("prefork.c".into())]);

        let limit = ifmodule.at(0).unwrap();
        assert_eq!(limit.value(), Some(Attr::Int(256)));
        assert_eq!(limit.section_name(), Some("IfModule"));
        assert_eq!(limit.lineno(), Some(3));
        assert_eq!(limit.file_name(), Some("httpd.conf"));
    }

    #[test]
    fn nested_sections() {
        let tree = httpd(
            "<VirtualHost *:80>\n<Directory \"/var/www\">\nAllowOverride None\n</Directory>\n</VirtualHost>\n",
        );
        let vhost = tree.root().at(0).unwrap();
        let dir = vhost.at(0).unwrap();
        assert_eq!(dir.name(), Some("Directory"));
        assert_eq!(dir.attrs(), &[Attr::Str("/var/www".into())]);
        assert_eq!(dir.at(0).unwrap().value_string(), "None");
    }

    #[test]
    fn continuation_lines_join() {
        let tree = httpd("LogFormat \"%h %l\" \\\n  combined\n");
        let directive = tree.root().at(0).unwrap();
        assert_eq!(
            directive.attrs(),
            &[Attr::Str("%h %l".into()), Attr::Str("combined".into())]
        );
    }

    #[test]
    fn mismatched_tag_names_both() {
        let err = parse(Source::from_text(
            "/etc/httpd/conf/httpd.conf",
            "<IfModule prefork.c>\nServerLimit 256\n</Tag>\n",
        ))
        .unwrap_err();
        match err {
            ParseError::MismatchedTag { open, close, .. } => {
                assert_eq!(open, "IfModule");
                assert_eq!(close, "Tag");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_section_points_at_opening() {
        let err = parse(Source::from_text(
            "/etc/httpd/conf/httpd.conf",
            "Listen 80\n<IfModule prefork.c>\nServerLimit 256\n",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnterminatedSection { line: 2, .. }
        ));
    }

    #[test]
    fn stray_closing_tag_is_fatal() {
        let err = parse(Source::from_text(
            "/etc/httpd/conf/httpd.conf",
            "</IfModule>\n",
        ))
        .unwrap_err();
        assert!(matches!(err, ParseError::StrayClosingTag { .. }));
    }

    #[test]
    fn missing_angle_close_is_fatal() {
        let err = parse(Source::from_text(
            "/etc/httpd/conf/httpd.conf",
            "<IfModule prefork.c\nServerLimit 256\n</IfModule>\n",
        ))
        .unwrap_err();
        assert!(matches!(err, ParseError::MalformedTag { line: 1, .. }));
    }

    #[test]
    fn quoted_tag_attrs_keep_angle_brackets() {
        let tree = httpd("<FilesMatch \"a>b\">\nRequire all denied\n</FilesMatch>\n");
        let section = tree.root().at(0).unwrap();
        assert_eq!(section.attrs(), &[Attr::Str("a>b".into())]);
    }
}
