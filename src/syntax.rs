//! Contracts with the loader's external collaborators.
//!
//! The lexer/parser that turns source text into the initial syntax tree and
//! the filesystem that serves file bytes are not part of this crate; the
//! loader drives them through the two traits below. Implementations are
//! purely syntactic - no semantic analysis happens behind these seams.

use crate::ast::{Node, Span};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error reported by the upstream markup parser.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// The upstream lexer/parser. Given the text of one source file it produces
/// the file's top-level statements in document order.
pub trait MarkupParser {
    fn parse(&self, text: &str, filename: &str) -> Result<Vec<Node>, ParseError>;
}

impl<F> MarkupParser for F
where
    F: Fn(&str, &str) -> Result<Vec<Node>, ParseError>,
{
    fn parse(&self, text: &str, filename: &str) -> Result<Vec<Node>, ParseError> {
        self(text, filename)
    }
}

/// Read-file-by-absolute-path abstraction. The handle is scoped to the call
/// and released on all exit paths.
pub trait SourceReader {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
