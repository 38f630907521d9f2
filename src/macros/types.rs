//!
//! Foundation types of the macro system. This module has no dependencies on
//! the other macro modules.
//!
//! ## Ownership
//!
//! - The registry owns deep clones of definition bodies.
//! - Every expansion stamps a fresh deep clone of the stored body; no
//!   sub-tree is ever shared between expansion sites.

use crate::ast::Element;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum nesting depth for inclusion recursion and for macro expansion
/// recursion. The two counters are independent but share the same bound.
pub const MAX_NESTING: usize = 100;

/// Tag of the slot directive, retained in macro bodies until expansion.
pub const SLOT_TAG: &str = ":slot";

/// Name of the implicit slot synthesized when a body defines none.
pub const DEFAULT_SLOT: &str = "default";

/// Base tag a macro reduces to when its definition names none.
pub const DEFAULT_BASE: &str = "div";

/// A registered macro definition.
///
/// `body` is stored ready to stamp: its root tag is already the base tag and
/// the `tag` attribute has been removed. For an inheriting macro the body has
/// already been expanded once against its parent (slots preserved), and
/// `from` records the parent's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDescriptor {
    /// The user-chosen tag; contains at least one dash.
    pub name: String,
    /// The tree cloned at each use site.
    pub body: Element,
    /// The underlying tag the macro rewrites to (or the parent macro's name).
    pub base: String,
    /// Parent macro, when `base` named one at definition time.
    pub from: Option<String>,
}

/// Per-session macro registry.
///
/// Names are case-sensitive. Registering a name again replaces the previous
/// descriptor silently and returns it, so callers can detect overwrites.
///
/// # Example
/// ```rust
/// use folio::ast::{Element, Span};
/// use folio::macros::{MacroDescriptor, MacroRegistry};
/// let mut registry = MacroRegistry::new();
/// registry.register(MacroDescriptor {
///     name: "my-card".to_string(),
///     body: Element::new("div", Span::default()),
///     base: "div".to_string(),
///     from: None,
/// });
/// assert!(registry.contains("my-card"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroRegistry {
    /// Map from macro name to its descriptor.
    pub macros: HashMap<String, MacroDescriptor>,
}

impl MacroRegistry {
    /// Creates a new, empty macro registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its own name.
    ///
    /// # Returns
    /// `Some(old_descriptor)` if the name was already registered, `None`
    /// otherwise.
    pub fn register(&mut self, descriptor: MacroDescriptor) -> Option<MacroDescriptor> {
        self.macros.insert(descriptor.name.clone(), descriptor)
    }

    /// Looks up a macro by name.
    pub fn lookup(&self, name: &str) -> Option<&MacroDescriptor> {
        self.macros.get(name)
    }

    /// Checks if a macro with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Returns the number of registered macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Returns an iterator over macro names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.macros.keys()
    }
}
