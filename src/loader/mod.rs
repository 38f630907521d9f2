//! The load pipeline. One `load` call drives the whole front end: resolve
//! and read the entry file, bridge to the upstream parser, process
//! directives (inclusion, import-once, macro definition) per file, then
//! expand macros over the consolidated tree.
//!
//! The pipeline never throws across the API boundary: every failure is
//! recorded on the session and fatal errors resolve the offending subtree to
//! no insertion. Callers inspect [`CodeSource::diagnostics`] to decide
//! success.

use crate::ast::{Element, Node};
use crate::diagnostics::{ErrorReporting, FolioError, Severity, SourceContext};
use crate::macros::{expand_macros, MacroRegistry, MAX_NESTING};
use crate::syntax::{FsReader, MarkupParser, SourceReader};
use miette::{Report, SourceSpan};
use std::path::{Path, PathBuf};

pub use self::include::{INCLUDE_TAG, IMPORT_TAG};

use self::include::FileContext;
use self::resolve::resolve;

mod include;
mod resolve;

/// Per-call load session: the consolidated tree, the files visited in
/// visitation order (root-relative identifiers), the diagnostics, and the
/// macro registry.
///
/// `tree` is absent only on fatal failure to load the entry file.
#[derive(Debug, Default)]
pub struct CodeSource {
    pub tree: Option<Element>,
    pub files: Vec<String>,
    pub diagnostics: Vec<FolioError>,
    pub macros: MacroRegistry,
}

impl CodeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True when any recorded diagnostic is an error (warnings alone leave
    /// the load usable).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity() == Severity::Error)
    }

    /// Prints every recorded diagnostic with full miette rendering.
    pub fn print_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            let report = Report::new(diagnostic.clone());
            eprintln!("{report:?}");
        }
    }
}

/// A successfully loaded and directive-processed file.
pub(crate) struct LoadedFile {
    pub root: Element,
    pub context: SourceContext,
}

/// The front-end loader. All reads are confined beneath the document root
/// given at construction; parsing is delegated to the [`MarkupParser`]
/// collaborator.
///
/// ```rust
/// use folio::{Loader, Node, ParseError};
///
/// let parser = |_text: &str, _file: &str| -> Result<Vec<Node>, ParseError> {
///     Err(ParseError::new("not wired up", None))
/// };
/// let loader = Loader::new("/var/www/pages", parser);
/// let session = loader.load("index.html");
/// assert!(session.tree.is_none());
/// assert!(session.has_errors());
/// ```
pub struct Loader<P, R = FsReader> {
    root: PathBuf,
    parser: P,
    reader: R,
}

impl<P: MarkupParser> Loader<P, FsReader> {
    pub fn new(root: impl Into<PathBuf>, parser: P) -> Self {
        Self {
            root: root.into(),
            parser,
            reader: FsReader,
        }
    }
}

impl<P: MarkupParser, R: SourceReader> Loader<P, R> {
    /// Swaps the filesystem collaborator (tests use an in-memory map).
    pub fn with_reader(root: impl Into<PathBuf>, parser: P, reader: R) -> Self {
        Self {
            root: root.into(),
            parser,
            reader,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads `entry` and everything it transitively includes into one
    /// consolidated, macro-expanded tree. Always returns the session.
    pub fn load(&self, entry: &str) -> CodeSource {
        let mut session = CodeSource::new();
        // Pathname and read errors on the entry file predate any source.
        let fallback = SourceContext::fallback(entry);
        let loaded = self.load_file(
            &mut session,
            &fallback,
            SourceSpan::new(0.into(), 0),
            "",
            entry,
            0,
            false,
        );

        let Some(loaded) = loaded else {
            return session;
        };

        // Macro expansion runs only after all inclusion has settled, so use
        // sites see every definition of the session.
        let mut root = Node::Element(loaded.root);
        expand_macros(
            &mut root,
            &session.macros,
            &loaded.context,
            &mut session.diagnostics,
        );
        if let Node::Element(el) = root {
            session.tree = Some(el);
        }
        session
    }

    /// Resolves, reads, parses and directive-processes one file.
    ///
    /// `origin` locates the directive (or load call) that requested the
    /// file, for diagnostics raised before the file's own text exists.
    /// Returns `None` when the subtree resolves to no insertion: fatal
    /// errors, the depth bound, or an import-once skip.
    pub(crate) fn load_file(
        &self,
        session: &mut CodeSource,
        origin: &SourceContext,
        origin_span: SourceSpan,
        current_dir: &str,
        name: &str,
        depth: usize,
        once: bool,
    ) -> Option<LoadedFile> {
        if depth >= MAX_NESTING {
            session
                .diagnostics
                .push(origin.nested_inclusions(origin_span));
            return None;
        }

        let Some(identifier) = resolve(current_dir, name) else {
            session
                .diagnostics
                .push(origin.forbidden_pathname(name, origin_span));
            return None;
        };

        // Import-once: a file already visited in this session contributes
        // nothing, and no error.
        if once && session.files.contains(&identifier) {
            return None;
        }
        session.files.push(identifier.clone());

        let path = self.root.join(identifier.trim_start_matches('/'));
        let Ok(text) = self.reader.read(&path) else {
            session
                .diagnostics
                .push(origin.read_failed(&identifier, origin_span));
            return None;
        };

        let file = FileContext::new(&identifier, &text);
        let statements = match self.parser.parse(&text, &identifier) {
            Ok(statements) => statements,
            Err(error) => {
                let span = error
                    .span
                    .map(|span| span.to_source_span())
                    .unwrap_or(origin_span);
                session
                    .diagnostics
                    .push(file.context.parse_failed(&error.message, &identifier, span));
                return None;
            }
        };

        // The first statement must be a single markup element; anything else
        // - including leading whitespace text - fails the shape check.
        let first = statements.into_iter().next();
        let mut root = match first {
            Some(Node::Element(el)) => el,
            Some(other) => {
                session.diagnostics.push(
                    file.context
                        .root_element_expected(&identifier, other.span().to_source_span()),
                );
                return None;
            }
            None => {
                session.diagnostics.push(
                    file.context
                        .root_element_expected(&identifier, SourceSpan::new(0.into(), 0)),
                );
                return None;
            }
        };

        self.process_directives(session, &mut root, &file, depth);

        Some(LoadedFile {
            root,
            context: file.context,
        })
    }
}
