//! include resolution across a document set
//!
//! Given one [ConfTree] per source file, [Combiner] produces a single
//! flattened logical document: wherever an include-like directive stood, the
//! included files' statements appear in its place, recursively, so the
//! result contains no include directives at all. The per-file trees are
//! read-only inputs; splicing copies nodes into a fresh tree and carries
//! their provenance along.
//!
//! Glob resolution is closed over exactly the documents handed in: a file
//! that was not supplied does not exist as far as the combiner is concerned.
use crate::node::{ConfTree, Kind, NodeData, NodeId};
use crate::query::SelectOpts;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum CombineError {
    #[error("main configuration file '{0}' not found in the document set")]
    MainFileNotFound(String),
    #[error("recursive include: {}", .chain.join(" -> "))]
    RecursiveInclude { chain: Vec<String> },
}

/// Where the directory for relative include patterns comes from.
#[derive(Debug, Clone)]
pub enum RootFrom {
    /// The value of a directive in the main document (httpd `ServerRoot`);
    /// falls back to the main file's directory when absent.
    Directive(&'static str),
    /// The directory containing the main file.
    MainDir,
}

/// Include-directive recognition rules of one grammar.
#[derive(Debug, Clone)]
pub struct Includes {
    pub names: &'static [&'static str],
    pub case_sensitive: bool,
    pub root_from: RootFrom,
    /// A metacharacter-free pattern naming a directory matches every
    /// document under it (logrotate `include /etc/logrotate.d`).
    pub dir_includes: bool,
}

impl Includes {
    pub fn httpd() -> Self {
        Self {
            names: &["Include", "IncludeOptional"],
            case_sensitive: false,
            root_from: RootFrom::Directive("ServerRoot"),
            dir_includes: false,
        }
    }

    pub fn nginx() -> Self {
        Self {
            names: &["include"],
            case_sensitive: true,
            root_from: RootFrom::MainDir,
            dir_includes: false,
        }
    }

    pub fn logrotate() -> Self {
        Self {
            names: &["include"],
            case_sensitive: true,
            root_from: RootFrom::MainDir,
            dir_includes: true,
        }
    }
}

/// Resolves all includes across a document set into one flattened tree.
#[derive(derive_new::new)]
pub struct Combiner {
    docs: Vec<ConfTree>,
    main_file: String,
    includes: Includes,
}

impl Combiner {
    pub fn combine(self) -> Result<ConfTree, CombineError> {
        let main = self
            .docs
            .iter()
            .position(|d| d.file_name() == Some(self.main_file.as_str()))
            .ok_or_else(|| CombineError::MainFileNotFound(self.main_file.clone()))?;

        let root_dir = self.config_root(main);
        tracing::debug!(main = %self.main_file, root = %root_dir.display(), "combining");

        let mut out = ConfTree::bare();
        let mut source_map = HashMap::new();
        let mut chain = vec![self.main_file.clone()];
        self.splice(main, 0, &mut out, 0, &root_dir, &mut chain, &mut source_map)?;
        Ok(out)
    }

    /// Directory against which relative include patterns are resolved.
    fn config_root(&self, main: usize) -> PathBuf {
        let main_dir = || {
            self.docs[main]
                .primary_source()
                .and_then(|s| s.path.parent())
                .map(Path::to_path_buf)
                .unwrap_or_default()
        };

        match &self.includes.root_from {
            RootFrom::MainDir => main_dir(),
            RootFrom::Directive(directive) => {
                let found = self.docs[main]
                    .select(
                        &[crate::query::name(crate::query::ieq(directive))],
                        SelectOpts::new().deep().matches_only(),
                    )
                    .last()
                    .map(|n| PathBuf::from(n.value_string()));
                found.unwrap_or_else(main_dir)
            }
        }
    }

    fn is_include(&self, node: &NodeData) -> bool {
        if node.kind != Kind::Directive {
            return false;
        }
        let Some(name) = node.name.as_deref() else {
            return false;
        };
        if self.includes.case_sensitive {
            self.includes.names.iter().any(|n| *n == name)
        } else {
            self.includes
                .names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name))
        }
    }

    /// Documents matching an include pattern, sorted by file name for
    /// deterministic splice order.
    fn resolve(&self, pattern: &str, root_dir: &Path) -> Vec<usize> {
        let pattern = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            root_dir.join(pattern).to_string_lossy().into_owned()
        };

        let mut matches: Vec<usize> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| {
                doc.primary_source().is_some_and(|s| {
                    self.matches_pattern(&pattern, &s.path.to_string_lossy())
                })
            })
            .map(|(index, _)| index)
            .collect();

        matches.sort_by(|&a, &b| self.docs[a].file_name().cmp(&self.docs[b].file_name()));
        tracing::debug!(%pattern, count = matches.len(), "resolved include pattern");
        matches
    }

    fn matches_pattern(&self, pattern: &str, path: &str) -> bool {
        if glob_match::glob_match(pattern, path) {
            return true;
        }
        if self.includes.dir_includes && !pattern.contains(['*', '?', '[']) {
            let dir = pattern.trim_end_matches('/');
            return path.starts_with(dir) && path[dir.len()..].starts_with('/');
        }
        false
    }

    /// Copy `node`'s children from document `doc` into `out` under
    /// `out_parent`, replacing include directives with the content of the
    /// documents they resolve to.
    #[allow(clippy::too_many_arguments)]
    fn splice(
        &self,
        doc: usize,
        node: NodeId,
        out: &mut ConfTree,
        out_parent: NodeId,
        root_dir: &Path,
        chain: &mut Vec<String>,
        source_map: &mut HashMap<usize, usize>,
    ) -> Result<(), CombineError> {
        for index in 0..self.docs[doc].nodes[node].children.len() {
            let child = self.docs[doc].nodes[node].children[index];
            let data = &self.docs[doc].nodes[child];

            if self.is_include(data) {
                let Some(first) = data.attrs.first() else {
                    tracing::warn!(
                        file = self.docs[doc].file_name().unwrap_or_default(),
                        line = data.lineno,
                        "include directive without a pattern, skipping"
                    );
                    continue;
                };

                for target in self.resolve(&first.to_string(), root_dir) {
                    let target_name = self.docs[target]
                        .file_name()
                        .unwrap_or_default()
                        .to_string();
                    if chain.contains(&target_name) {
                        let mut cycle = chain.clone();
                        cycle.push(target_name);
                        return Err(CombineError::RecursiveInclude { chain: cycle });
                    }

                    chain.push(target_name);
                    self.splice(target, 0, out, out_parent, root_dir, chain, source_map)?;
                    chain.pop();
                }
                continue;
            }

            let source = match data.source {
                Some(_) => {
                    let out_source = *source_map.entry(doc).or_insert_with(|| {
                        let src = self.docs[doc]
                            .primary_source()
                            .expect("parsed document always has a source")
                            .clone();
                        out.attach_source(src)
                    });
                    Some(out_source)
                }
                None => None,
            };

            let copied = out.push(
                out_parent,
                data.kind,
                data.name.clone(),
                data.attrs.clone(),
                data.lineno,
                source,
            );
            self.splice(doc, child, out, copied, root_dir, chain, source_map)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Source;
    use crate::query::{Pred, SelectOpts};
    use crate::{brace, tag};
    use pretty_assertions::assert_eq;

    fn httpd_docs(files: &[(&str, &str)]) -> Vec<ConfTree> {
        files
            .iter()
            .map(|(path, text)| tag::parse(Source::from_text(*path, text)).unwrap())
            .collect()
    }

    const MAIN: &str = "ServerRoot \"/etc/httpd\"\n<IfModule prefork.c>\nServerLimit 256\n</IfModule>\nIncludeOptional conf.d/*.conf\n";
    const EXTRA: &str = "<IfModule prefork.c>\nServerLimit 1024\n</IfModule>\n";

    #[test]
    fn includes_are_spliced_in_place() {
        let docs = httpd_docs(&[
            ("/etc/httpd/conf/httpd.conf", MAIN),
            ("/etc/httpd/conf.d/00-z.conf", EXTRA),
        ]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();

        let limits = combined.select(
            &[
                crate::query::tag("IfModule", vec![crate::query::eq("prefork.c")]),
                "ServerLimit".into(),
            ],
            SelectOpts::new().matches_only(),
        );

        assert_eq!(limits.len(), 2);
        assert_eq!(limits.first().unwrap().value_string(), "256");
        assert_eq!(limits.last().unwrap().value_string(), "1024");
        assert_eq!(limits.last().unwrap().file_name(), Some("00-z.conf"));
    }

    #[test]
    fn flattening_is_complete() {
        let docs = httpd_docs(&[
            ("/etc/httpd/conf/httpd.conf", MAIN),
            ("/etc/httpd/conf.d/00-z.conf", EXTRA),
        ]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();

        // no include directive survives combination
        let leftovers = combined.select(
            &[Pred::any(vec!["Include".into(), "IncludeOptional".into()])],
            SelectOpts::new().deep().matches_only(),
        );
        assert!(leftovers.is_empty());
    }

    #[test]
    fn pattern_resolution_is_relative_to_server_root() {
        // ServerRoot differs from the main file's directory
        let docs = httpd_docs(&[
            ("/opt/httpd.conf", "ServerRoot \"/srv/www\"\nInclude extra/*.conf\n"),
            ("/srv/www/extra/a.conf", "Listen 8080\n"),
        ]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();
        assert_eq!(combined.find("Listen").len(), 1);
    }

    #[test]
    fn matches_are_sorted_by_file_name() {
        let docs = httpd_docs(&[
            ("/etc/httpd/conf/httpd.conf", "ServerRoot \"/etc/httpd\"\nInclude conf.d/*.conf\n"),
            ("/etc/httpd/conf.d/20-b.conf", "Listen 82\n"),
            ("/etc/httpd/conf.d/10-a.conf", "Listen 81\n"),
        ]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();
        let listens: Vec<String> = combined
            .find("Listen")
            .iter()
            .map(|n| n.value_string())
            .collect();
        assert_eq!(listens, vec!["81", "82"]);
    }

    #[test]
    fn main_file_not_found() {
        let docs = httpd_docs(&[("/etc/httpd/conf.d/z.conf", "Listen 80\n")]);
        let err = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap_err();
        assert!(matches!(err, CombineError::MainFileNotFound(_)));
    }

    #[test]
    fn self_include_is_detected() {
        let docs = httpd_docs(&[(
            "/etc/httpd/conf/httpd.conf",
            "ServerRoot \"/etc/httpd\"\nInclude conf/httpd.conf\n",
        )]);
        let err = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap_err();
        assert!(matches!(err, CombineError::RecursiveInclude { .. }));
    }

    #[test]
    fn mutual_includes_are_detected() {
        let docs = httpd_docs(&[
            (
                "/etc/httpd/conf/httpd.conf",
                "ServerRoot \"/etc/httpd\"\nInclude conf/other.conf\n",
            ),
            ("/etc/httpd/conf/other.conf", "Include conf/httpd.conf\n"),
        ]);
        let err = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap_err();
        match err {
            CombineError::RecursiveInclude { chain } => {
                assert_eq!(chain, vec!["httpd.conf", "other.conf", "httpd.conf"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nested_includes_flatten() {
        let docs = httpd_docs(&[
            (
                "/etc/httpd/conf/httpd.conf",
                "ServerRoot \"/etc/httpd\"\nInclude conf.d/a.conf\n",
            ),
            ("/etc/httpd/conf.d/a.conf", "Include conf.d/b.conf\n"),
            ("/etc/httpd/conf.d/b.conf", "Listen 8080\n"),
        ]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();
        assert_eq!(combined.find("Listen").len(), 1);
        assert_eq!(
            combined.find("Listen").first().unwrap().file_name(),
            Some("b.conf")
        );
    }

    #[test]
    fn includes_inside_sections_stay_in_place() {
        let docs = httpd_docs(&[
            (
                "/etc/httpd/conf/httpd.conf",
                "ServerRoot \"/etc/httpd\"\n<VirtualHost *:80>\nInclude conf.d/vhost.conf\n</VirtualHost>\n",
            ),
            ("/etc/httpd/conf.d/vhost.conf", "DocumentRoot /var/www\n"),
        ]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();

        let roots = combined.select(
            &["VirtualHost".into(), "DocumentRoot".into()],
            SelectOpts::new().matches_only(),
        );
        assert_eq!(roots.len(), 1);
        assert_eq!(roots.first().unwrap().section_name(), Some("VirtualHost"));
    }

    #[test]
    fn logrotate_directory_include() {
        let main = brace::parse_logrotate(Source::from_text(
            "/etc/logrotate.conf",
            "weekly\ninclude /etc/logrotate.d\n",
        ))
        .unwrap();
        let dropin = brace::parse_logrotate(Source::from_text(
            "/etc/logrotate.d/httpd",
            "/var/log/httpd/access.log {\n    missingok\n}\n",
        ))
        .unwrap();

        let combined = Combiner::new(
            vec![main, dropin],
            "logrotate.conf".into(),
            Includes::logrotate(),
        )
        .combine()
        .unwrap();

        assert_eq!(combined.find("missingok").len(), 1);
        assert!(combined.find("include").is_empty());
    }

    #[test]
    fn empty_main_combines_to_empty_tree() {
        let docs = httpd_docs(&[("/etc/httpd/conf/httpd.conf", "# disabled\n")]);
        let combined = Combiner::new(docs, "httpd.conf".into(), Includes::httpd())
            .combine()
            .unwrap();
        assert!(combined.is_empty());
    }
}
