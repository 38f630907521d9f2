// All tree nodes carry a span for source tracking; downstream stages rely on
// positions surviving every rewrite the loader performs.

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

/// Reserved first character of directive tag names.
pub const DIRECTIVE_PREFIX: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// 1-based line of `start`.
    pub line: u32,
    /// 1-based column of `start`.
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn to_source_span(&self) -> SourceSpan {
        SourceSpan::new(self.start.into(), self.end.saturating_sub(self.start))
    }
}

/// One node of the markup tree.
///
/// Expression fragments are opaque to the loader: they are carried verbatim
/// through inclusion and macro expansion and only become meaningful to the
/// downstream code generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text(Text),
    Expr(ExprIsland),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
    pub children: Vec<Node>,
    pub span: Span,
}

/// A literal text run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub value: String,
    pub span: Span,
}

/// An embedded expression island, carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprIsland {
    pub code: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
    pub span: Span,
}

/// An attribute value: a literal string or an opaque expression fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Literal(String),
    Expr(String),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(el) => el.span,
            Node::Text(text) => text.span,
            Node::Expr(island) => island.span,
        }
    }

    /// True for a text node consisting only of whitespace.
    pub fn is_blank_text(&self) -> bool {
        match self {
            Node::Text(text) => text.value.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        if let Node::Element(el) = self {
            Some(el)
        } else {
            None
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        if let Node::Element(el) = self {
            Some(el)
        } else {
            None
        }
    }

    // Utility: markup rendering, used by tests and debugging output.
    pub fn pretty(&self) -> String {
        match self {
            Node::Element(el) => el.pretty(),
            Node::Text(text) => text.value.clone(),
            Node::Expr(island) => format!("{{{}}}", island.code),
        }
    }
}

impl Element {
    /// A paired-tag element with no attributes and no children.
    pub fn new(tag: impl Into<String>, span: Span) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            self_closing: false,
            children: Vec::new(),
            span,
        }
    }

    pub fn is_directive(&self) -> bool {
        self.tag.starts_with(DIRECTIVE_PREFIX)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// The literal value of an attribute. Expression-valued attributes are
    /// opaque to the loader and yield `None`.
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        match &self.attribute(name)?.value {
            AttrValue::Literal(value) => Some(value),
            AttrValue::Expr(_) => None,
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|attr| attr.name == name)?;
        Some(self.attributes.remove(index))
    }

    /// Use-site merge rule: overwrite the value of a same-named attribute,
    /// append otherwise.
    pub fn merge_attribute(&mut self, attr: &Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attr.name) {
            Some(existing) => existing.value = attr.value.clone(),
            None => self.attributes.push(attr.clone()),
        }
    }

    /// Inclusion propagation rule: append only when the name is absent, so
    /// attributes already on the opening tag win.
    pub fn add_attribute_if_absent(&mut self, attr: &Attribute) {
        if !self.has_attribute(&attr.name) {
            self.attributes.push(attr.clone());
        }
    }

    pub fn pretty(&self) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(&self.tag);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            match &attr.value {
                AttrValue::Literal(value) => {
                    out.push_str(&format!("=\"{}\"", value));
                }
                AttrValue::Expr(code) => {
                    out.push_str(&format!("={{{}}}", code));
                }
            }
        }
        if self.self_closing {
            out.push_str("/>");
            return out;
        }
        out.push('>');
        for child in &self.children {
            out.push_str(&child.pretty());
        }
        out.push_str(&format!("</{}>", self.tag));
        out
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}
