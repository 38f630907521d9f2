//!
//! Macro expansion: replaces each element whose tag names a registered macro
//! with a freshly stamped copy of the macro body, routing the use-site's
//! children into the body's named slots.
//!
//! ## Slot composition
//!
//! A `:slot` element plays two roles. Inside a macro body it is an injection
//! point: use-site children are inserted immediately before it, and final
//! expansion then replaces it with its own children. Wrapped around use-site
//! children it routes that content to the slot of the same name; the wrapper
//! itself dissolves at final expansion. A body with no `default` slot gets
//! one synthesized as the last child of its root.
//!
//! Inheritance expansion (stamping a child macro's body against its parent at
//! definition time) keeps slots intact so they stay available to downstream
//! users - except parent slots the child overrides with a same-named slot of
//! its own, which are removed.
//!
//! ## Recursion
//!
//! Use sites are captured first and rewritten after; rewriting mid-walk would
//! corrupt the positions of later matches. Each produced sub-tree is expanded
//! again with the nesting counter incremented, bounded by [`MAX_NESTING`].

use crate::ast::{AttrValue, Attribute, Element, Node, Span};
use crate::diagnostics::{ErrorReporting, FolioError, SourceContext};
use crate::macros::types::{MacroRegistry, DEFAULT_SLOT, MAX_NESTING, SLOT_TAG};
use std::collections::{HashMap, HashSet};

/// How slots are finalized after child routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotMode {
    /// Use-site expansion: every slot is replaced by its own children; no
    /// slot survives in the output.
    Final,
    /// Inheritance expansion: slots are kept for downstream users, except
    /// parent slots overridden by a same-named slot from the child.
    Inherited,
}

// =============================
// Public API for macro expansion
// =============================

/// Expands every registered macro use in `root`, recursing into each
/// produced sub-tree up to the nesting bound.
pub fn expand_macros(
    root: &mut Node,
    registry: &MacroRegistry,
    context: &SourceContext,
    diagnostics: &mut Vec<FolioError>,
) {
    expand_with_depth(root, registry, context, diagnostics, 0);
}

fn expand_with_depth(
    root: &mut Node,
    registry: &MacroRegistry,
    context: &SourceContext,
    diagnostics: &mut Vec<FolioError>,
    depth: usize,
) {
    // Capture all use sites first, then rewrite. Replacement is one element
    // for one element, so captured positions stay valid; nested uses live
    // inside replacements and are handled by the recursion below.
    let sites = collect_use_sites(root, registry);
    for path in sites {
        let Some(node) = node_at_path_mut(root, &path) else {
            continue;
        };
        let Some(site) = node.as_element() else {
            continue;
        };
        let Some(descriptor) = registry.lookup(&site.tag) else {
            continue;
        };
        if depth >= MAX_NESTING {
            diagnostics.push(context.nested_macros(&site.tag, site.span.to_source_span()));
            continue;
        }
        let replacement = stamp(
            &descriptor.body,
            site,
            SlotMode::Final,
            site.span,
            context,
            diagnostics,
        );
        *node = Node::Element(replacement);
        expand_with_depth(node, registry, context, diagnostics, depth + 1);
    }
}

// =============================
// Stamping
// =============================

/// Stamps `body` for one use site: deep clone, attribute merge, slot
/// discovery, child routing, slot finalization.
///
/// Also used by the collector to build an inheriting macro's body, with the
/// child's rebranded definition body standing in as the use site.
pub(crate) fn stamp(
    body: &Element,
    site: &Element,
    mode: SlotMode,
    trigger: Span,
    context: &SourceContext,
    diagnostics: &mut Vec<FolioError>,
) -> Element {
    // Fresh deep clone per expansion; no structural sharing between sites.
    let mut dst = body.clone();

    // Use-site attributes overwrite same-named body attributes.
    for attr in &site.attributes {
        dst.merge_attribute(attr);
    }

    // Slot discovery, keyed by name; the last same-named slot in document
    // order wins. Synthesized nodes inherit the triggering element's span.
    let (mut slots, slot_count) = discover_slots(&dst, context, diagnostics);
    if !slots.contains_key(DEFAULT_SLOT) {
        dst.children.push(Node::Element(synthesize_slot(DEFAULT_SLOT, trigger)));
        slots.insert(DEFAULT_SLOT.to_string(), slot_count);
    }

    // Route each use-site child to its target slot.
    let mut routed = route_children(site.children.clone());

    // Parent slots overridden by a same-named slot in the routed content are
    // removed during the rewrite.
    let overridden: HashSet<String> = match mode {
        SlotMode::Final => HashSet::new(),
        SlotMode::Inherited => routed
            .iter()
            .filter(|(name, nodes)| {
                slots.contains_key(name.as_str()) && nodes_contain_slot(nodes, name)
            })
            .map(|(name, _)| name.clone())
            .collect(),
    };

    let mut counter = 0;
    rewrite_slots(&mut dst, &slots, &mut routed, &overridden, mode, &mut counter);
    // Content routed to a slot that does not exist is dropped here.
    dst
}

fn synthesize_slot(name: &str, span: Span) -> Element {
    let mut slot = Element::new(SLOT_TAG, span);
    slot.self_closing = true;
    slot.attributes.push(Attribute {
        name: "name".to_string(),
        value: AttrValue::Literal(name.to_string()),
        span,
    });
    slot
}

/// Walks the body in document order assigning each `:slot` an occurrence
/// index; returns the name-to-winning-occurrence map and the total count.
/// A slot without a literal `name` attribute is reported and left unkeyed.
fn discover_slots(
    dst: &Element,
    context: &SourceContext,
    diagnostics: &mut Vec<FolioError>,
) -> (HashMap<String, usize>, usize) {
    let mut slots = HashMap::new();
    let mut counter = 0;
    visit_slots(dst, &mut slots, &mut counter, context, diagnostics);
    (slots, counter)
}

fn visit_slots(
    el: &Element,
    slots: &mut HashMap<String, usize>,
    counter: &mut usize,
    context: &SourceContext,
    diagnostics: &mut Vec<FolioError>,
) {
    for child in &el.children {
        let Some(c) = child.as_element() else {
            continue;
        };
        if c.tag == SLOT_TAG {
            match c.attribute_value("name") {
                Some(name) => {
                    slots.insert(name.to_string(), *counter);
                }
                None => diagnostics.push(context.missing_attribute(
                    SLOT_TAG,
                    "name",
                    c.span.to_source_span(),
                )),
            }
            *counter += 1;
        }
        visit_slots(c, slots, counter, context, diagnostics);
    }
}

/// Groups use-site children by target slot name: the `name` attribute of an
/// element child, `default` otherwise. The routing name is consumed from
/// routed elements; `:slot` wrappers keep theirs - it is their identity for
/// override detection and downstream routing.
fn route_children(children: Vec<Node>) -> HashMap<String, Vec<Node>> {
    let mut routed: HashMap<String, Vec<Node>> = HashMap::new();
    for mut child in children {
        let target = match child.as_element_mut() {
            Some(el) if el.tag == SLOT_TAG => el
                .attribute_value("name")
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_SLOT.to_string()),
            Some(el) => match el.attribute_value("name").map(str::to_string) {
                Some(name) => {
                    el.remove_attribute("name");
                    name
                }
                None => DEFAULT_SLOT.to_string(),
            },
            None => DEFAULT_SLOT.to_string(),
        };
        routed.entry(target).or_default().push(child);
    }
    routed
}

/// True when any node of the forest is (or contains) a `:slot` named `name`.
fn nodes_contain_slot(nodes: &[Node], name: &str) -> bool {
    nodes.iter().any(|node| {
        let Some(el) = node.as_element() else {
            return false;
        };
        (el.tag == SLOT_TAG && el.attribute_value("name") == Some(name))
            || nodes_contain_slot(&el.children, name)
    })
}

/// Rebuilds child lists in document order: routed content is inserted
/// immediately before the winning slot of its name, then each slot is
/// finalized according to the mode. The occurrence counter mirrors the
/// discovery walk exactly.
fn rewrite_slots(
    el: &mut Element,
    slots: &HashMap<String, usize>,
    routed: &mut HashMap<String, Vec<Node>>,
    overridden: &HashSet<String>,
    mode: SlotMode,
    counter: &mut usize,
) {
    let children = std::mem::take(&mut el.children);
    let mut rebuilt = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Element(mut c) if c.tag == SLOT_TAG => {
                let occurrence = *counter;
                *counter += 1;
                rewrite_slots(&mut c, slots, routed, overridden, mode, counter);

                let name = c.attribute_value("name").map(str::to_string);
                let winner = name
                    .as_deref()
                    .is_some_and(|n| slots.get(n) == Some(&occurrence));
                if winner {
                    let nodes = routed.remove(name.as_deref().unwrap_or_default()).unwrap_or_default();
                    match mode {
                        SlotMode::Final => rebuilt.extend(consume_wrapper_slots(nodes)),
                        SlotMode::Inherited => rebuilt.extend(nodes),
                    }
                }
                match mode {
                    SlotMode::Final => rebuilt.extend(c.children),
                    SlotMode::Inherited => {
                        let dropped =
                            winner && name.as_deref().is_some_and(|n| overridden.contains(n));
                        if !dropped {
                            rebuilt.push(Node::Element(c));
                        }
                    }
                }
            }
            Node::Element(mut c) => {
                rewrite_slots(&mut c, slots, routed, overridden, mode, counter);
                rebuilt.push(Node::Element(c));
            }
            other => rebuilt.push(other),
        }
    }
    el.children = rebuilt;
}

/// Dissolves `:slot` wrappers in routed content during final expansion, at
/// any depth, so no slot survives in the produced tree.
fn consume_wrapper_slots(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Element(el) if el.tag == SLOT_TAG => {
                out.extend(consume_wrapper_slots(el.children));
            }
            Node::Element(mut el) => {
                let children = std::mem::take(&mut el.children);
                el.children = consume_wrapper_slots(children);
                out.push(Node::Element(el));
            }
            other => out.push(other),
        }
    }
    out
}

// =============================
// Tree addressing helpers
// =============================

fn collect_use_sites(root: &Node, registry: &MacroRegistry) -> Vec<Vec<usize>> {
    let mut sites = Vec::new();
    let mut path = Vec::new();
    collect_into(root, registry, &mut path, &mut sites);
    sites
}

fn collect_into(
    node: &Node,
    registry: &MacroRegistry,
    path: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    let Some(el) = node.as_element() else {
        return;
    };
    if registry.contains(&el.tag) {
        out.push(path.clone());
        // Uses nested below a match are handled when its replacement is
        // expanded again.
        return;
    }
    for (index, child) in el.children.iter().enumerate() {
        path.push(index);
        collect_into(child, registry, path, out);
        path.pop();
    }
}

fn node_at_path_mut<'a>(root: &'a mut Node, path: &[usize]) -> Option<&'a mut Node> {
    let mut node = root;
    for &index in path {
        node = node.as_element_mut()?.children.get_mut(index)?;
    }
    Some(node)
}

// =============================
// Tests
// =============================
