//! # conftree - configuration trees
//!
//! For CLI usage see the `conftree` binary; read this to understand how the
//! engine works internally.
//!
//! ### Terms
//!
//! Quick introduction to terms used to describe elements of block-structured
//! configuration languages.
//!
//! In conftree terms...
//! - a file gets parsed as a tree of `nodes`
//! - ...where there are two kinds below the root:
//!   - `directive`: a single statement, a name with 0 or more typed values
//!   - or `section`:
//!     - 1 name
//!     - followed by 0 or more selector values
//!     - and nested statements enclosed in `{` and `}` (brace style) or
//!       `<Name ...>` / `</Name>` (tag style)
//!
//! This is a valid brace-style file:
//! ```text
//! # comments work like this
//! worker_processes 4;
//!
//! http {
//!     server {
//!         listen 80;
//!     }
//! }
//! ```
//!
//! and this is the tag-style equivalent of a section:
//! ```text
//! <IfModule prefork.c>
//! ServerLimit 256
//! </IfModule>
//! ```
//!
//! ### Parsing
//!
//! The engine performs no I/O: callers hand over a [node::Source] (path plus
//! decoded lines) and pick a grammar entry point ([tag::parse] or
//! [brace::parse] with a [brace::Dialect]). Both grammars share the
//! tokenizing primitives in [parse] (quoted strings, bare words, type
//! coercion) and differ only in how statements are delimited. The result is
//! one [node::ConfTree] per file, ordered exactly like the source.
//!
//! ### Combining
//!
//! Real configurations span many files stitched together by `Include`-like
//! directives. [combine::Combiner] takes the complete set of per-file trees,
//! finds the main file, resolves each include pattern by shell-style glob
//! against the set, and splices the included files' statements in place of
//! the include directive - recursively, with cycle detection. The combined
//! tree carries per-node provenance (file and line) so findings can point at
//! the file a statement actually came from.
//!
//! ### Querying
//!
//! [query] is a small predicate DSL: name literals, attribute comparisons
//! and `&`/`|`/`!` composition, applied as a path of predicates level by
//! level (or anywhere in the subtree with a deep search). Queries never
//! fail on absence - probing for directives that may not be there is the
//! point.
//!
//! ### Output
//!
//! A tree pretty-prints back to an indented approximation of the source, and
//! converts into a dict-like [value::Value] which serializes via [serde].
pub mod brace;
pub mod combine;
pub mod node;
pub mod parse;
pub mod query;
pub mod stream;
pub mod tag;
pub mod value;

/// Utility macro to create a list of [node::Source]s for tests and examples.
///
/// ```
/// # use conftree::sources;
/// let docs = sources! {
///   "/etc/nginx/nginx.conf" => "worker_processes 4;",
///   "/etc/nginx/mime.types" => "types { }"
/// };
/// assert_eq!(docs.len(), 2);
/// ```
#[macro_export]
macro_rules! sources {
    { $($path:expr => $text:expr),+ $(,)? } => {
        vec![ $( $crate::node::Source::from_text($path, $text) ),+ ]
    };
}
