//!
//! Directive processing: a single document-order walk per loaded file that
//! dispatches `:include` / `:import` / `:define` / `:slot` and removes
//! anything else carrying the reserved prefix.
//!
//! Directives are only recognized below the file root (an included file's
//! root element is never itself a directive). Each parent's child list is
//! taken and rebuilt in one pass; included content has already been
//! processed by its own file load, so nothing is re-walked after splicing.

use crate::ast::{Element, Node};
use crate::diagnostics::{ErrorReporting, SourceContext};
use crate::loader::resolve::parent_dir;
use crate::loader::{CodeSource, LoadedFile, Loader};
use crate::macros::{collect_define, DEFINE_TAG, SLOT_TAG};
use crate::syntax::{MarkupParser, SourceReader};

/// Tag of the always-splice inclusion directive.
pub const INCLUDE_TAG: &str = ":include";

/// Tag of the include-once inclusion directive.
pub const IMPORT_TAG: &str = ":import";

/// Per-file state threaded through directive processing.
pub(crate) struct FileContext {
    /// Directory of the file, for resolving relative inclusions.
    pub dir: String,
    /// Source context for diagnostics raised while processing the file.
    pub context: SourceContext,
}

impl FileContext {
    pub(crate) fn new(identifier: &str, text: &str) -> Self {
        Self {
            dir: parent_dir(identifier).to_string(),
            context: SourceContext::from_file(identifier, text),
        }
    }
}

impl<P: MarkupParser, R: SourceReader> Loader<P, R> {
    /// Processes every directive below `el` in document order, rebuilding
    /// child lists as it goes.
    pub(crate) fn process_directives(
        &self,
        session: &mut CodeSource,
        el: &mut Element,
        file: &FileContext,
        depth: usize,
    ) {
        let children = std::mem::take(&mut el.children);
        let mut rebuilt = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::Element(c) if c.is_directive() => match c.tag.as_str() {
                    INCLUDE_TAG => {
                        self.handle_include(session, el, c, file, depth, false, &mut rebuilt);
                    }
                    IMPORT_TAG => {
                        self.handle_include(session, el, c, file, depth, true, &mut rebuilt);
                    }
                    DEFINE_TAG => {
                        // Definitions are consumed at the position they were
                        // declared; the registry owns the body from here on.
                        collect_define(
                            c,
                            &mut session.macros,
                            &file.context,
                            &mut session.diagnostics,
                        );
                    }
                    SLOT_TAG => {
                        // Retained for the expansion stage. Its children are
                        // ordinary content and still get walked.
                        let mut c = c;
                        self.process_directives(session, &mut c, file, depth);
                        rebuilt.push(Node::Element(c));
                    }
                    _ => {
                        session.diagnostics.push(
                            file.context
                                .unknown_directive(&c.tag, c.span.to_source_span()),
                        );
                        // Removed together with its children.
                    }
                },
                Node::Element(mut c) => {
                    self.process_directives(session, &mut c, file, depth);
                    rebuilt.push(Node::Element(c));
                }
                other => rebuilt.push(other),
            }
        }
        el.children = rebuilt;
    }

    /// Splices an included file in place of its directive.
    ///
    /// The included root's children replace the directive (one leading and
    /// one trailing all-whitespace text child trimmed); the directive's own
    /// attributes override same-named attributes of the included root, and
    /// the root's attributes then propagate to the referring parent where
    /// its existing attributes win.
    fn handle_include(
        &self,
        session: &mut CodeSource,
        parent: &mut Element,
        mut directive: Element,
        file: &FileContext,
        depth: usize,
        once: bool,
        out: &mut Vec<Node>,
    ) {
        let src = directive
            .attribute_value("src")
            .map(str::to_string)
            .unwrap_or_default();
        if src.trim().is_empty() {
            session.diagnostics.push(file.context.missing_attribute(
                &directive.tag,
                "src",
                directive.span.to_source_span(),
            ));
            return;
        }

        let loaded = self.load_file(
            session,
            &file.context,
            directive.span.to_source_span(),
            &file.dir,
            &src,
            depth + 1,
            once,
        );
        // Fatal-to-the-subtree errors and import-once skips resolve to no
        // insertion; the outer tree still loads.
        let Some(LoadedFile { root: mut included, .. }) = loaded else {
            return;
        };

        if included
            .children
            .first()
            .is_some_and(|node| node.is_blank_text())
        {
            included.children.remove(0);
        }
        if included
            .children
            .last()
            .is_some_and(|node| node.is_blank_text())
        {
            included.children.pop();
        }

        directive.remove_attribute("src");
        for attr in &directive.attributes {
            included.merge_attribute(attr);
        }
        for attr in &included.attributes {
            parent.add_attribute_if_absent(attr);
        }

        out.extend(included.children);
    }
}
