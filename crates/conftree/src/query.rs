//! declarative queries over a [ConfTree]
//!
//! A query is a *path* of node predicates: the first matches nodes at the
//! starting level, the second their children, and so on. Predicates compose
//! with `&`, `|` and `!` into a small boolean algebra; attribute predicates
//! ([eq], [gt], [startswith], ...) compare numerically when both sides look
//! numeric and lexicographically otherwise.
//!
//! "No match" is never an error: queries return an empty [SearchResult] or
//! `None`, because probing for directives that may legitimately be absent is
//! the normal mode of use.
use crate::node::{Attr, ConfTree, Kind, NodeRef};
use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr, Index, Not};
use std::rc::Rc;

/// Predicate over a single attribute value.
#[derive(Clone)]
pub struct AttrPred(Rc<dyn Fn(&Attr) -> bool>);

impl AttrPred {
    pub fn from_fn(f: impl Fn(&Attr) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn matches(&self, attr: &Attr) -> bool {
        (self.0)(attr)
    }
}

/// Numeric comparison when both sides parse as numbers, lexicographic on the
/// string forms otherwise.
fn ordering(candidate: &Attr, target: &Attr) -> Ordering {
    match (candidate.as_f64(), target.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => candidate.to_string().cmp(&target.to_string()),
    }
}

fn compare(target: impl Into<Attr>, accept: fn(Ordering) -> bool) -> AttrPred {
    let target = target.into();
    AttrPred::from_fn(move |candidate| accept(ordering(candidate, &target)))
}

pub fn eq(value: impl Into<Attr>) -> AttrPred {
    compare(value, Ordering::is_eq)
}

pub fn ne(value: impl Into<Attr>) -> AttrPred {
    compare(value, Ordering::is_ne)
}

pub fn lt(value: impl Into<Attr>) -> AttrPred {
    compare(value, Ordering::is_lt)
}

pub fn le(value: impl Into<Attr>) -> AttrPred {
    compare(value, Ordering::is_le)
}

pub fn gt(value: impl Into<Attr>) -> AttrPred {
    compare(value, Ordering::is_gt)
}

pub fn ge(value: impl Into<Attr>) -> AttrPred {
    compare(value, Ordering::is_ge)
}

pub fn startswith(prefix: &str) -> AttrPred {
    let prefix = prefix.to_string();
    AttrPred::from_fn(move |a| a.to_string().starts_with(&prefix))
}

pub fn endswith(suffix: &str) -> AttrPred {
    let suffix = suffix.to_string();
    AttrPred::from_fn(move |a| a.to_string().ends_with(&suffix))
}

pub fn contains(needle: &str) -> AttrPred {
    let needle = needle.to_string();
    AttrPred::from_fn(move |a| a.to_string().contains(&needle))
}

pub fn ieq(value: &str) -> AttrPred {
    let value = value.to_lowercase();
    AttrPred::from_fn(move |a| a.to_string().to_lowercase() == value)
}

pub fn istartswith(prefix: &str) -> AttrPred {
    let prefix = prefix.to_lowercase();
    AttrPred::from_fn(move |a| a.to_string().to_lowercase().starts_with(&prefix))
}

pub fn iendswith(suffix: &str) -> AttrPred {
    let suffix = suffix.to_lowercase();
    AttrPred::from_fn(move |a| a.to_string().to_lowercase().ends_with(&suffix))
}

pub fn icontains(needle: &str) -> AttrPred {
    let needle = needle.to_lowercase();
    AttrPred::from_fn(move |a| a.to_string().to_lowercase().contains(&needle))
}

/// Predicate over a node, composable with `&`, `|` and `!`.
///
/// A node is presented to the predicate as its name plus its attribute list;
/// that is all any query needs to see.
#[derive(Clone)]
pub struct Pred(Rc<dyn for<'a> Fn(Option<&'a str>, &'a [Attr]) -> bool>);

impl Pred {
    pub fn from_fn(f: impl for<'a> Fn(Option<&'a str>, &'a [Attr]) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn matches(&self, node: NodeRef<'_>) -> bool {
        (self.0)(node.name(), node.attrs())
    }

    /// Logical OR over a list of predicates; matches nothing when empty.
    pub fn any(preds: impl IntoIterator<Item = Pred>) -> Pred {
        let preds: Vec<Pred> = preds.into_iter().collect();
        Pred::from_fn(move |name, attrs| preds.iter().any(|p| (p.0)(name, attrs)))
    }
}

/// Exact name match (the literal predicate form).
impl From<&str> for Pred {
    fn from(literal: &str) -> Self {
        let literal = literal.to_string();
        Pred::from_fn(move |name, _| name == Some(literal.as_str()))
    }
}

/// Apply an attribute predicate to the node *name*.
pub fn name(pred: AttrPred) -> Pred {
    Pred::from_fn(move |name, _| {
        name.is_some_and(|n| pred.matches(&Attr::Str(n.to_string())))
    })
}

/// Match nodes where at least one attribute satisfies the predicate.
pub fn attr(pred: AttrPred) -> Pred {
    Pred::from_fn(move |_, attrs| attrs.iter().any(|a| pred.matches(a)))
}

/// The tuple form: exact name plus, for every given attribute predicate, at
/// least one attribute satisfying it.
pub fn tag(literal: &str, attr_preds: impl IntoIterator<Item = AttrPred>) -> Pred {
    let literal = literal.to_string();
    let attr_preds: Vec<AttrPred> = attr_preds.into_iter().collect();
    Pred::from_fn(move |name, attrs| {
        name == Some(literal.as_str())
            && attr_preds
                .iter()
                .all(|p| attrs.iter().any(|a| p.matches(a)))
    })
}

impl BitAnd for Pred {
    type Output = Pred;

    fn bitand(self, rhs: Pred) -> Pred {
        Pred::from_fn(move |name, attrs| (self.0)(name, attrs) && (rhs.0)(name, attrs))
    }
}

impl BitOr for Pred {
    type Output = Pred;

    fn bitor(self, rhs: Pred) -> Pred {
        Pred::from_fn(move |name, attrs| (self.0)(name, attrs) || (rhs.0)(name, attrs))
    }
}

impl Not for Pred {
    type Output = Pred;

    fn not(self) -> Pred {
        Pred::from_fn(move |name, attrs| !(self.0)(name, attrs))
    }
}

/// How a select walks and what it returns.
#[derive(Debug, Clone, Copy)]
pub struct SelectOpts {
    /// Match the first predicate anywhere in the subtree instead of only at
    /// the starting level.
    pub deep: bool,
    /// Map every final match to its top-level ancestor (deduplicated).
    /// When off, the matching nodes themselves are returned.
    pub roots: bool,
}

impl Default for SelectOpts {
    fn default() -> Self {
        Self {
            deep: false,
            roots: true,
        }
    }
}

impl SelectOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    /// Return the matching nodes themselves instead of their top-level
    /// ancestors.
    pub fn matches_only(mut self) -> Self {
        self.roots = false;
        self
    }
}

fn descendants<'a>(node: NodeRef<'a>, out: &mut Vec<NodeRef<'a>>) {
    for child in node.children() {
        out.push(child);
        descendants(child, out);
    }
}

fn top_ancestor(mut node: NodeRef<'_>) -> NodeRef<'_> {
    while let Some(parent) = node.parent() {
        if parent.kind() == Kind::Root {
            break;
        }
        node = parent;
    }
    node
}

pub(crate) fn run_select<'a>(
    start: &[NodeRef<'a>],
    path: &[Pred],
    opts: SelectOpts,
) -> SearchResult<'a> {
    let Some((first, rest)) = path.split_first() else {
        return SearchResult {
            items: start.to_vec(),
        };
    };

    let candidates: Vec<NodeRef<'a>> = if opts.deep {
        // preorder keeps matches in document order
        let mut all = Vec::new();
        for &node in start {
            all.push(node);
            descendants(node, &mut all);
        }
        all
    } else {
        start.to_vec()
    };

    let mut current: Vec<NodeRef<'a>> = candidates
        .into_iter()
        .filter(|n| first.matches(*n))
        .collect();

    for pred in rest {
        let mut next = Vec::new();
        for node in &current {
            for child in node.children() {
                if pred.matches(child) {
                    next.push(child);
                }
            }
        }
        current = next;
    }

    if opts.roots {
        let mut roots: Vec<NodeRef<'a>> = Vec::new();
        for node in current {
            let top = top_ancestor(node);
            if !roots.iter().any(|r| r.id == top.id) {
                roots.push(top);
            }
        }
        current = roots;
    }

    SearchResult { items: current }
}

/// Ordered list of matched nodes; supports chained queries against the
/// matches' children and positional selection.
#[derive(Debug)]
pub struct SearchResult<'a> {
    items: Vec<NodeRef<'a>>,
}

impl<'a> SearchResult<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        self.items.iter().copied()
    }

    /// First match (`one=FIRST`), `None` when nothing matched.
    pub fn first(&self) -> Option<NodeRef<'a>> {
        self.items.first().copied()
    }

    /// Last match (`one=LAST`), `None` when nothing matched.
    pub fn last(&self) -> Option<NodeRef<'a>> {
        self.items.last().copied()
    }

    /// Positional selection; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<NodeRef<'a>> {
        let index = if index < 0 {
            self.items.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.items.get(index).copied()
    }

    /// Continue the query against the matches' children. The matching nodes
    /// themselves are returned (never their ancestors).
    pub fn select(&self, path: &[Pred], opts: SelectOpts) -> SearchResult<'a> {
        let start: Vec<NodeRef<'a>> = self.items.iter().flat_map(|n| n.children()).collect();
        run_select(&start, path, opts.matches_only())
    }
}

impl<'a> Index<usize> for SearchResult<'a> {
    type Output = NodeRef<'a>;

    fn index(&self, index: usize) -> &NodeRef<'a> {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &SearchResult<'a> {
    type Item = NodeRef<'a>;
    type IntoIter = std::vec::IntoIter<NodeRef<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.clone().into_iter()
    }
}

impl ConfTree {
    /// Path query over the document, starting at the top-level statements.
    pub fn select(&self, path: &[Pred], opts: SelectOpts) -> SearchResult<'_> {
        let start: Vec<NodeRef<'_>> = self.root().children().collect();
        run_select(&start, path, opts)
    }

    /// Deep search for a name anywhere in the tree, returning the matching
    /// nodes themselves.
    pub fn find(&self, directive: &str) -> SearchResult<'_> {
        self.select(
            &[Pred::from(directive)],
            SelectOpts::new().deep().matches_only(),
        )
    }
}

impl<'a> NodeRef<'a> {
    /// Path query over this node's children.
    pub fn select(&self, path: &[Pred], opts: SelectOpts) -> SearchResult<'a> {
        let start: Vec<NodeRef<'a>> = self.children().collect();
        run_select(&start, path, opts)
    }

    /// Immediate children matching a predicate (the bracket-indexing sugar).
    pub fn get(&self, pred: impl Into<Pred>) -> SearchResult<'a> {
        self.select(&[pred.into()], SelectOpts::new().matches_only())
    }

    /// Deep search below this node for a name, returning the matching nodes
    /// themselves.
    pub fn find(&self, directive: &str) -> SearchResult<'a> {
        self.select(
            &[Pred::from(directive)],
            SelectOpts::new().deep().matches_only(),
        )
    }
}
