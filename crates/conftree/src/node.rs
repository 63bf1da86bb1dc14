//! the configuration tree model
//!
//! A [ConfTree] owns every node of one parsed document (or of one combined
//! logical document) in a flat arena; nodes address each other by [NodeId].
//! Parent links are plain indices, so navigation works both ways while
//! ownership only ever flows root -> children.
//!
//! [NodeRef] is the cheap handle handed to callers: it pairs the tree with a
//! node index and exposes name/attrs/value plus provenance (file, line).
use std::fmt;
use std::path::{Path, PathBuf};

pub type NodeId = usize;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Top of a document; carries no name or attrs of its own.
    Root,
    /// A named block with nested statements, e.g. `server { ... }` or
    /// `<IfModule prefork.c> ... </IfModule>`.
    Section,
    /// A single configuration statement, no nested block.
    Directive,
}

/// One typed attribute value of a directive or section selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Attr {
    /// Numeric view used for ordered comparisons; strings participate when
    /// they parse as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Attr::Int(i) => Some(*i as f64),
            Attr::Float(f) => Some(*f),
            Attr::Str(s) => s.trim().parse().ok(),
            Attr::Bool(_) => None,
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::Str(s) => f.write_str(s),
            Attr::Int(i) => write!(f, "{i}"),
            Attr::Float(x) => write!(f, "{x}"),
            Attr::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Attr {
    fn from(value: &str) -> Self {
        Attr::Str(value.to_string())
    }
}

impl From<String> for Attr {
    fn from(value: String) -> Self {
        Attr::Str(value)
    }
}

impl From<i64> for Attr {
    fn from(value: i64) -> Self {
        Attr::Int(value)
    }
}

impl From<i32> for Attr {
    fn from(value: i32) -> Self {
        Attr::Int(value.into())
    }
}

impl From<f64> for Attr {
    fn from(value: f64) -> Self {
        Attr::Float(value)
    }
}

impl From<bool> for Attr {
    fn from(value: bool) -> Self {
        Attr::Bool(value)
    }
}

/// Identity and raw content of one source file.
///
/// The engine never touches the filesystem; callers hand over the already
/// decoded lines together with the path they came from.
#[derive(Debug, Clone, derive_new::new)]
pub struct Source {
    pub path: PathBuf,
    pub file_name: String,
    pub lines: Vec<String>,
}

impl Source {
    pub fn from_lines(path: impl Into<PathBuf>, lines: Vec<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(path, file_name, lines)
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self::from_lines(path, text.lines().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: Kind,
    pub(crate) name: Option<String>,
    pub(crate) attrs: Vec<Attr>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) lineno: Option<usize>,
    /// Index into [ConfTree::sources]; `None` only for the root.
    pub(crate) source: Option<usize>,
}

/// One parsed document, or the combined logical document.
///
/// A per-file tree has exactly one [Source]; a combined tree accumulates one
/// entry per file that contributed nodes, so provenance survives splicing.
#[derive(Debug)]
pub struct ConfTree {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) sources: Vec<Source>,
}

impl ConfTree {
    /// A tree with only a root node and no sources yet.
    pub(crate) fn bare() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: Kind::Root,
                name: None,
                attrs: Vec::new(),
                children: Vec::new(),
                parent: None,
                lineno: None,
                source: None,
            }],
            sources: Vec::new(),
        }
    }

    pub(crate) fn attach_source(&mut self, source: Source) -> usize {
        self.sources.push(source);
        self.sources.len() - 1
    }

    pub(crate) fn push(
        &mut self,
        parent: NodeId,
        kind: Kind,
        name: Option<String>,
        attrs: Vec<Attr>,
        lineno: Option<usize>,
        source: Option<usize>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            name,
            attrs,
            children: Vec::new(),
            parent: Some(parent),
            lineno,
            source,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { tree: self, id: 0 }
    }

    /// True when the document has no statements at all (e.g. a main config
    /// file that exists but was emptied out to disable it).
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// The file this tree was parsed from (the first contributing file for a
    /// combined tree).
    pub fn primary_source(&self) -> Option<&Source> {
        self.sources.first()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.primary_source().map(|s| s.file_name.as_str())
    }
}

/// Borrowed handle to one node of a [ConfTree].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    pub(crate) tree: &'a ConfTree,
    pub(crate) id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id]
    }

    pub fn kind(&self) -> Kind {
        self.data().kind
    }

    pub fn name(&self) -> Option<&'a str> {
        self.data().name.as_deref()
    }

    pub fn attrs(&self) -> &'a [Attr] {
        &self.data().attrs
    }

    /// The sole attribute if there is exactly one, the space-joined string
    /// form of all of them otherwise, `None` when there are none.
    pub fn value(&self) -> Option<Attr> {
        match self.attrs() {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(Attr::Str(
                many.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" "),
            )),
        }
    }

    pub fn value_string(&self) -> String {
        self.value().map(|a| a.to_string()).unwrap_or_default()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| NodeRef { tree, id })
    }

    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| NodeRef { tree: self.tree, id })
    }

    /// The enclosing section: the node itself for a [Kind::Section], the
    /// nearest section ancestor for a directive, `None` at top level.
    pub fn section(&self) -> Option<NodeRef<'a>> {
        match self.kind() {
            Kind::Section => Some(*self),
            Kind::Root => None,
            Kind::Directive => {
                let mut up = self.parent();
                while let Some(node) = up {
                    if node.kind() == Kind::Section {
                        return Some(node);
                    }
                    up = node.parent();
                }
                None
            }
        }
    }

    pub fn section_name(&self) -> Option<&'a str> {
        self.section().and_then(|s| s.name())
    }

    /// 1-based source line of this node.
    pub fn lineno(&self) -> Option<usize> {
        self.data().lineno
    }

    /// The raw source line this node was parsed from.
    pub fn line(&self) -> Option<&'a str> {
        let source = self.source()?;
        source.lines.get(self.lineno()? - 1).map(String::as_str)
    }

    pub fn file_name(&self) -> Option<&'a str> {
        self.source().map(|s| s.file_name.as_str())
    }

    pub fn file_path(&self) -> Option<&'a Path> {
        self.source().map(|s| s.path.as_path())
    }

    fn source(&self) -> Option<&'a Source> {
        let index = self.data().source.unwrap_or(0);
        self.tree.sources.get(index)
    }

    /// Positional child access; negative indices count from the end.
    pub fn at(&self, index: isize) -> Option<NodeRef<'a>> {
        let children = &self.data().children;
        let index = if index < 0 {
            children.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        children.get(index).map(|&id| NodeRef { tree: self.tree, id })
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("attrs", &self.attrs())
            .field("lineno", &self.lineno())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

/// Re-quote an attribute for display when it would not survive tokenizing.
fn quoted(attr: &Attr) -> String {
    let text = attr.to_string();
    if text.is_empty()
        || text.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'')
    {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text
    }
}

fn fmt_node(f: &mut fmt::Formatter<'_>, node: NodeRef<'_>, depth: usize) -> fmt::Result {
    let pad = "    ".repeat(depth);
    let mut head = node.name().unwrap_or_default().to_string();
    for attr in node.attrs() {
        head.push(' ');
        head.push_str(&quoted(attr));
    }

    match node.kind() {
        Kind::Root => {
            for child in node.children() {
                fmt_node(f, child, depth)?;
            }
            Ok(())
        }
        Kind::Directive => writeln!(f, "{pad}{head}"),
        Kind::Section => {
            writeln!(f, "{pad}{head} {{")?;
            for child in node.children() {
                fmt_node(f, child, depth + 1)?;
            }
            writeln!(f, "{pad}}}")
        }
    }
}

/// Indented, human-readable approximation of the original configuration.
/// Comments and exact whitespace are not preserved; this is for diagnostics,
/// not round-tripping.
impl fmt::Display for ConfTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(f, self.root(), 0)
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(f, *self, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ConfTree {
        let mut tree = ConfTree::bare();
        tree.attach_source(Source::from_text(
            "/etc/demo.conf",
            "outer one {\ninner 42\n}\nflag on",
        ));
        let outer = tree.push(
            0,
            Kind::Section,
            Some("outer".into()),
            vec![Attr::Str("one".into())],
            Some(1),
            Some(0),
        );
        tree.push(
            outer,
            Kind::Directive,
            Some("inner".into()),
            vec![Attr::Int(42)],
            Some(2),
            Some(0),
        );
        tree.push(
            0,
            Kind::Directive,
            Some("flag".into()),
            vec![Attr::Bool(true)],
            Some(4),
            Some(0),
        );
        tree
    }

    #[test]
    fn navigation_and_provenance() {
        let tree = sample();
        let outer = tree.root().at(0).unwrap();
        let inner = outer.at(0).unwrap();

        assert_eq!(inner.name(), Some("inner"));
        assert_eq!(inner.value(), Some(Attr::Int(42)));
        assert_eq!(inner.section_name(), Some("outer"));
        assert_eq!(inner.parent().unwrap().name(), Some("outer"));
        assert_eq!(inner.lineno(), Some(2));
        assert_eq!(inner.line(), Some("inner 42"));
        assert_eq!(inner.file_name(), Some("demo.conf"));
    }

    #[test]
    fn negative_indexing() {
        let tree = sample();
        assert_eq!(tree.root().at(-1).unwrap().name(), Some("flag"));
        assert!(tree.root().at(-3).is_none());
        assert!(tree.root().at(5).is_none());
    }

    #[test]
    fn multi_attr_value_joins() {
        let mut tree = ConfTree::bare();
        tree.push(
            0,
            Kind::Directive,
            Some("create".into()),
            vec![Attr::Str("0664".into()), Attr::Str("root".into())],
            Some(1),
            None,
        );
        let node = tree.root().at(0).unwrap();
        assert_eq!(node.value(), Some(Attr::Str("0664 root".into())));
    }

    #[test]
    fn render_requotes_spaced_values() {
        let mut tree = ConfTree::bare();
        let section = tree.push(
            0,
            Kind::Section,
            Some("outer".into()),
            vec![],
            Some(1),
            None,
        );
        tree.push(
            section,
            Kind::Directive,
            Some("greeting".into()),
            vec![Attr::Str("hello world".into())],
            Some(2),
            None,
        );
        assert_eq!(tree.to_string(), "outer {\n    greeting \"hello world\"\n}\n");
    }
}
