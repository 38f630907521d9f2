//! Folio error handling - unified encapsulated API
//!
//! Every failure mode of the load pipeline is represented by one error type.
//! Errors are never thrown across the `load` boundary: the session records
//! them as diagnostics and the outer tree keeps loading (fatal errors resolve
//! the offending subtree to no insertion).

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Represents source context for error reporting with explicit hierarchy
/// between real sources (preferred) and fallbacks (tolerated when necessary)
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    /// This is the preferred method for error reporting
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable, e.g. for pathname
    /// errors raised before any file could be read
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("<!-- {} -->", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

/// The single error type - no wrapper, no variants, just essential data
#[derive(Debug, Clone)]
pub struct FolioError {
    /// What went wrong (type-specific data)
    pub kind: ErrorKind,
    /// Where it happened (context-specific source information)
    pub source_info: SourceInfo,
    /// How to help (auto-populated based on kind)
    pub diagnostic_info: DiagnosticInfo,
}

/// All error types as a clean enum - no duplicate fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // Path errors - requested names escaping the document root
    ForbiddenPathname {
        name: String,
    },

    // I/O errors
    ReadFailed {
        path: String,
    },

    // Parse errors - reported by the upstream parser
    ParseFailed {
        message: String,
        path: String,
    },

    // Shape errors - the file's first statement is not a markup element
    RootElementExpected {
        path: String,
    },

    // Directive errors
    MissingAttribute {
        directive: String,
        attribute: String,
    },
    UnknownDirective {
        name: String,
    },
    InvalidTagName {
        tag: String,
    },

    // Depth errors
    NestedInclusions,
    NestedMacros {
        name: String,
    },
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// Diagnostic severity. Warnings remove the offending element and continue;
/// errors resolve the offending subtree to no insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// Context-aware error creation - the per-file source context knows how to
/// create appropriately annotated errors
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> FolioError;

    /// Convenience methods for the loader's error sites
    fn forbidden_pathname(&self, name: &str, span: SourceSpan) -> FolioError {
        self.report(
            ErrorKind::ForbiddenPathname { name: name.into() },
            span,
        )
    }

    fn read_failed(&self, path: &str, span: SourceSpan) -> FolioError {
        self.report(ErrorKind::ReadFailed { path: path.into() }, span)
    }

    fn parse_failed(&self, message: &str, path: &str, span: SourceSpan) -> FolioError {
        self.report(
            ErrorKind::ParseFailed {
                message: message.into(),
                path: path.into(),
            },
            span,
        )
    }

    fn root_element_expected(&self, path: &str, span: SourceSpan) -> FolioError {
        self.report(ErrorKind::RootElementExpected { path: path.into() }, span)
    }

    fn missing_attribute(&self, directive: &str, attribute: &str, span: SourceSpan) -> FolioError {
        self.report(
            ErrorKind::MissingAttribute {
                directive: directive.into(),
                attribute: attribute.into(),
            },
            span,
        )
    }

    fn unknown_directive(&self, name: &str, span: SourceSpan) -> FolioError {
        self.report(ErrorKind::UnknownDirective { name: name.into() }, span)
    }

    fn invalid_tag_name(&self, tag: &str, span: SourceSpan) -> FolioError {
        self.report(ErrorKind::InvalidTagName { tag: tag.into() }, span)
    }

    fn nested_inclusions(&self, span: SourceSpan) -> FolioError {
        self.report(ErrorKind::NestedInclusions, span)
    }

    fn nested_macros(&self, name: &str, span: SourceSpan) -> FolioError {
        self.report(ErrorKind::NestedMacros { name: name.into() }, span)
    }
}

impl ErrorReporting for SourceContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> FolioError {
        FolioError {
            source_info: SourceInfo {
                source: self.to_named_source(),
                primary_span: span,
                phase: kind.phase().to_string(),
            },
            diagnostic_info: DiagnosticInfo {
                help: default_help(&kind),
                error_code: format!("folio::{}", kind.code_suffix()),
            },
            kind,
        }
    }
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ForbiddenPathname { .. } => ErrorCategory::Path,
            Self::ReadFailed { .. } => ErrorCategory::Io,
            Self::ParseFailed { .. } => ErrorCategory::Parse,
            Self::RootElementExpected { .. } => ErrorCategory::Shape,
            Self::MissingAttribute { .. }
            | Self::UnknownDirective { .. }
            | Self::InvalidTagName { .. } => ErrorCategory::Directive,
            Self::NestedInclusions | Self::NestedMacros { .. } => ErrorCategory::Depth,
        }
    }

    /// Warnings remove the offending element and continue; everything else
    /// is fatal to the subtree it was raised in.
    pub const fn severity(&self) -> Severity {
        match self {
            Self::UnknownDirective { .. } | Self::InvalidTagName { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The pipeline phase an error kind originates in
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::ForbiddenPathname { .. } => "resolve",
            Self::ReadFailed { .. } => "read",
            Self::ParseFailed { .. } | Self::RootElementExpected { .. } => "parse",
            Self::MissingAttribute { .. }
            | Self::UnknownDirective { .. }
            | Self::InvalidTagName { .. } => "directives",
            Self::NestedInclusions => "include",
            Self::NestedMacros { .. } => "expand",
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::ForbiddenPathname { .. } => "forbidden_pathname",
            Self::ReadFailed { .. } => "read_failed",
            Self::ParseFailed { .. } => "parse_failed",
            Self::RootElementExpected { .. } => "root_element_expected",
            Self::MissingAttribute { .. } => "missing_attribute",
            Self::UnknownDirective { .. } => "unknown_directive",
            Self::InvalidTagName { .. } => "invalid_tag_name",
            Self::NestedInclusions => "nested_inclusions",
            Self::NestedMacros { .. } => "nested_macros",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Path,
    Io,
    Parse,
    Shape,
    Directive,
    Depth,
}

impl FolioError {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

fn default_help(kind: &ErrorKind) -> Option<String> {
    match kind {
        ErrorKind::ForbiddenPathname { .. } => Some(
            "requested names are resolved inside the document root; \"..\" segments may not escape it"
                .to_string(),
        ),
        ErrorKind::RootElementExpected { .. } => Some(
            "the first statement of a page file must be a single markup element".to_string(),
        ),
        ErrorKind::MissingAttribute {
            directive,
            attribute,
        } => Some(format!(
            "the {} directive requires a {} attribute with a literal value",
            directive, attribute
        )),
        ErrorKind::UnknownDirective { .. } => {
            Some("known directives are :include, :import, :define and :slot".to_string())
        }
        ErrorKind::InvalidTagName { tag } => Some(format!(
            "\"{}\" must match ^[-\\w]+$ and the macro name must contain a dash, like \"my-card\" or \"my-card:div\"",
            tag
        )),
        ErrorKind::NestedInclusions => {
            Some("inclusion is bounded at 100 levels; check for files that include each other".to_string())
        }
        ErrorKind::NestedMacros { .. } => {
            Some("macro expansion is bounded at 100 levels; check for macros that expand themselves".to_string())
        }
        ErrorKind::ReadFailed { .. } | ErrorKind::ParseFailed { .. } => None,
    }
}

impl std::error::Error for FolioError {}

impl fmt::Display for FolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::ForbiddenPathname { name } => {
                write!(f, "forbidden pathname \"{}\"", name)
            }
            ErrorKind::ReadFailed { path } => {
                write!(f, "failed to read \"{}\"", path)
            }
            ErrorKind::ParseFailed { message, path } => {
                write!(f, "{} in \"{}\"", message, path)
            }
            ErrorKind::RootElementExpected { path } => {
                write!(f, "HTML tag expected \"{}\"", path)
            }
            ErrorKind::MissingAttribute { attribute, .. } => {
                write!(f, "missing {} attribute", attribute)
            }
            ErrorKind::UnknownDirective { name } => {
                write!(f, "unknown directive {}", name)
            }
            ErrorKind::InvalidTagName { .. } => {
                write!(f, "invalid tag name")
            }
            ErrorKind::NestedInclusions => {
                write!(f, "too many nested inclusions")
            }
            ErrorKind::NestedMacros { name } => {
                write!(f, "too many nested macros \"{}\"", name)
            }
        }
    }
}

impl Diagnostic for FolioError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self.kind.severity() {
            Severity::Warning => Some(miette::Severity::Warning),
            Severity::Error => Some(miette::Severity::Error),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(self.source_info.source.as_ref())
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.source_info.phase.clone()),
            self.source_info.primary_span,
        ))))
    }
}
