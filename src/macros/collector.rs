//!
//! Registers `:define` directives into the per-session macro registry.
//!
//! A definition's `tag` attribute has the shape `name` or `name:base`. The
//! name follows the custom-element convention (at least one dash); the base
//! defaults to `div`. A base that itself names a previously registered macro
//! makes the new definition inherit from it: the body is expanded against
//! the parent once, at registration time, with slots preserved.

use crate::ast::{AttrValue, Element};
use crate::diagnostics::{ErrorReporting, FolioError, SourceContext};
use crate::macros::expander::{stamp, SlotMode};
use crate::macros::types::{MacroDescriptor, MacroRegistry, DEFAULT_BASE};
use regex::Regex;
use std::sync::OnceLock;

/// Tag of the macro-definition directive.
pub const DEFINE_TAG: &str = ":define";

// Macro names and base tags share the word-or-dash shape.
fn tag_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-\w]+$").unwrap())
}

/// Handles one `:define` directive, which the walker has already detached
/// from the host tree (definitions are removed at the position they were
/// declared). Registers a descriptor unless the `tag` attribute is missing
/// or malformed.
pub(crate) fn collect_define(
    mut define: Element,
    registry: &mut MacroRegistry,
    context: &SourceContext,
    diagnostics: &mut Vec<FolioError>,
) {
    let span = define.span;

    let tag_value = match define.remove_attribute("tag") {
        Some(attr) => match attr.value {
            AttrValue::Literal(value) => value,
            // Expressions are opaque to the loader; an expression-valued tag
            // cannot name a macro.
            AttrValue::Expr(_) => {
                diagnostics.push(context.missing_attribute(
                    DEFINE_TAG,
                    "tag",
                    span.to_source_span(),
                ));
                return;
            }
        },
        None => {
            diagnostics.push(context.missing_attribute(DEFINE_TAG, "tag", span.to_source_span()));
            return;
        }
    };

    let (name, base) = match tag_value.split_once(':') {
        Some((name, base)) => (name.to_string(), base.to_string()),
        None => (tag_value.clone(), DEFAULT_BASE.to_string()),
    };
    let pattern = tag_name_pattern();
    if !pattern.is_match(&name) || !name.contains('-') || !pattern.is_match(&base) {
        diagnostics.push(context.invalid_tag_name(&tag_value, span.to_source_span()));
        return;
    }

    // Rebrand the stored body: the macro stamps out as its base tag, and a
    // self-closing definition is promoted to paired tags so the body has
    // room to hold expanded content.
    define.tag = base.clone();
    if define.self_closing {
        define.self_closing = false;
        define.children = Vec::new();
    }
    let mut body = define;

    // Inheritance: expand the body against the parent now, one-shot, with
    // slot preservation, and store the expanded form.
    let mut from = None;
    if base.contains('-') {
        if let Some(parent) = registry.lookup(&base) {
            body = stamp(
                &parent.body,
                &body,
                SlotMode::Inherited,
                span,
                context,
                diagnostics,
            );
            from = Some(parent.name.clone());
        }
    }

    registry.register(MacroDescriptor {
        name,
        body,
        base,
        from,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attribute, Node, Span, Text};
    use crate::macros::types::{DEFAULT_SLOT, SLOT_TAG};

    fn define_with_tag(tag_value: &str) -> Element {
        let mut el = Element::new(DEFINE_TAG, Span::default());
        el.attributes.push(Attribute {
            name: "tag".to_string(),
            value: AttrValue::Literal(tag_value.to_string()),
            span: Span::default(),
        });
        el
    }

    fn collect(define: Element, registry: &mut MacroRegistry) -> Vec<FolioError> {
        let context = SourceContext::from_file("/test.html", "");
        let mut diagnostics = Vec::new();
        collect_define(define, registry, &context, &mut diagnostics);
        diagnostics
    }

    #[test]
    fn test_simple_definition_defaults_to_div() {
        let mut registry = MacroRegistry::new();
        let mut define = define_with_tag("my-card");
        define.children.push(Node::Text(Text {
            value: "x".to_string(),
            span: Span::default(),
        }));
        let diagnostics = collect(define, &mut registry);
        assert!(diagnostics.is_empty());

        let descriptor = registry.lookup("my-card").unwrap();
        assert_eq!(descriptor.base, "div");
        assert_eq!(descriptor.from, None);
        assert_eq!(descriptor.body.tag, "div");
        assert!(!descriptor.body.has_attribute("tag"));
        assert_eq!(descriptor.body.pretty(), "<div>x</div>");
    }

    #[test]
    fn test_explicit_base() {
        let mut registry = MacroRegistry::new();
        let diagnostics = collect(define_with_tag("my-note:aside"), &mut registry);
        assert!(diagnostics.is_empty());
        assert_eq!(registry.lookup("my-note").unwrap().base, "aside");
    }

    #[test]
    fn test_self_closing_definition_is_promoted() {
        let mut registry = MacroRegistry::new();
        let mut define = define_with_tag("my-rule:hr");
        define.self_closing = true;
        collect(define, &mut registry);
        let body = &registry.lookup("my-rule").unwrap().body;
        assert!(!body.self_closing);
        assert!(body.children.is_empty());
    }

    #[test]
    fn test_name_without_dash_is_rejected() {
        let mut registry = MacroRegistry::new();
        let diagnostics = collect(define_with_tag("card"), &mut registry);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].to_string(), "invalid tag name");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_tag_attribute_is_reported() {
        let mut registry = MacroRegistry::new();
        let define = Element::new(DEFINE_TAG, Span::default());
        let diagnostics = collect(define, &mut registry);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].to_string(), "missing tag attribute");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_inheritance_expands_against_parent() {
        let mut registry = MacroRegistry::new();

        // Parent: <div class="card"><:slot name="default"/></div>
        let mut parent = define_with_tag("my-card");
        parent.attributes.push(Attribute {
            name: "class".to_string(),
            value: AttrValue::Literal("card".to_string()),
            span: Span::default(),
        });
        let mut default_slot = Element::new(SLOT_TAG, Span::default());
        default_slot.self_closing = true;
        default_slot.attributes.push(Attribute {
            name: "name".to_string(),
            value: AttrValue::Literal(DEFAULT_SLOT.to_string()),
            span: Span::default(),
        });
        parent.children.push(Node::Element(default_slot));
        assert!(collect(parent, &mut registry).is_empty());

        // Child: <:define tag="my-big:my-card">wrapped</:define>
        let mut child = define_with_tag("my-big:my-card");
        child.children.push(Node::Text(Text {
            value: "wrapped".to_string(),
            span: Span::default(),
        }));
        assert!(collect(child, &mut registry).is_empty());

        let big = registry.lookup("my-big").unwrap();
        assert_eq!(big.base, "my-card");
        assert_eq!(big.from.as_deref(), Some("my-card"));
        // The parent slot stays available downstream, after the baked content.
        assert_eq!(
            big.body.pretty(),
            "<div class=\"card\">wrapped<:slot name=\"default\"/></div>"
        );
    }

    #[test]
    fn test_base_with_dash_but_unregistered_is_plain() {
        let mut registry = MacroRegistry::new();
        let diagnostics = collect(define_with_tag("my-a:my-b"), &mut registry);
        assert!(diagnostics.is_empty());
        let descriptor = registry.lookup("my-a").unwrap();
        assert_eq!(descriptor.base, "my-b");
        assert_eq!(descriptor.from, None);
        assert_eq!(descriptor.body.tag, "my-b");
    }
}
