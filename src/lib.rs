pub use crate::ast::{AttrValue, Attribute, Element, Node, Span};
pub use crate::diagnostics::{ErrorCategory, ErrorKind, FolioError, Severity, SourceContext};
pub use crate::loader::{CodeSource, Loader};
pub use crate::macros::{MacroDescriptor, MacroRegistry, MAX_NESTING};
pub use crate::syntax::{FsReader, MarkupParser, ParseError, SourceReader};

pub mod ast;
pub mod diagnostics;
pub mod loader;
pub mod macros;
pub mod syntax;
