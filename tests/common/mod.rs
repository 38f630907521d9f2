#![allow(dead_code)]

//! Shared utilities for loader integration tests.
//!
//! The production lexer/parser is an external collaborator of the loader, so
//! the suite brings its own: a compact recursive-descent markup parser that
//! implements the [`MarkupParser`] seam, plus an in-memory filesystem so
//! scenarios declare their virtual file tree inline.

use folio::ast::{AttrValue, Attribute, Element, ExprIsland, Node, Span, Text};
use folio::syntax::{MarkupParser, ParseError, SourceReader};
use folio::{CodeSource, Loader};
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Fixture parser for the HTML-superset syntax used in tests: elements with
/// quoted or `{expr}` attribute values, text runs, and `{expr}` islands.
pub struct TestParser;

impl MarkupParser for TestParser {
    fn parse(&self, text: &str, _filename: &str) -> Result<Vec<Node>, ParseError> {
        Parser::new(text).parse_statements()
    }
}

/// In-memory filesystem keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MapReader {
    files: HashMap<String, String>,
}

impl MapReader {
    pub fn add(&mut self, path: &str, text: &str) {
        self.files.insert(path.to_string(), text.to_string());
    }
}

impl SourceReader for MapReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        let key = path.to_string_lossy().replace('\\', "/");
        self.files
            .get(&key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {key}")))
    }
}

pub const ROOT: &str = "/site";

/// Loads `entry` from a virtual file tree. `files` keys are root-relative
/// identifiers like `"/a.html"`.
pub fn load_session(files: &[(&str, &str)], entry: &str) -> CodeSource {
    let mut reader = MapReader::default();
    for (name, text) in files {
        reader.add(&format!("{ROOT}{name}"), text);
    }
    Loader::with_reader(ROOT, TestParser, reader).load(entry)
}

/// The final tree rendered back to markup, empty string when absent.
pub fn pretty(session: &CodeSource) -> String {
    session
        .tree
        .as_ref()
        .map(|el| el.pretty())
        .unwrap_or_default()
}

/// All diagnostic messages, in recording order.
pub fn messages(session: &CodeSource) -> Vec<String> {
    session
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.to_string())
        .collect()
}

/// Parses a standalone snippet with the fixture parser.
pub fn parse_markup(text: &str) -> Result<Vec<Node>, ParseError> {
    TestParser.parse(text, "/snippet.html")
}

// ============================================================================
// Fixture parser internals
// ============================================================================

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn span_from(&self, start: usize) -> Span {
        let (line, column) = line_col(self.text, start);
        Span::new(start, self.pos, line, column)
    }

    fn error(&self, message: &str) -> ParseError {
        let (line, column) = line_col(self.text, self.pos);
        ParseError::new(message, Some(Span::new(self.pos, self.pos, line, column)))
    }

    fn parse_statements(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        while self.pos < self.text.len() {
            if self.rest().starts_with("</") {
                return Err(self.error("unexpected closing tag"));
            }
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some('<') => self.parse_element().map(Node::Element),
            Some('{') => self.parse_island(),
            _ => self.parse_text(),
        }
    }

    fn parse_text(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '<' || c == '{' {
                break;
            }
            self.pos += c.len_utf8();
        }
        Ok(Node::Text(Text {
            value: self.text[start..self.pos].to_string(),
            span: self.span_from(start),
        }))
    }

    fn parse_island(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let code_start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.pos += c.len_utf8();
        }
        if depth != 0 {
            return Err(self.error("unterminated expression"));
        }
        let code = self.text[code_start..self.pos].to_string();
        self.pos += 1;
        Ok(Node::Expr(ExprIsland {
            code,
            span: self.span_from(start),
        }))
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.text[start..self.pos].to_string()
    }

    fn parse_attr_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.text[start..self.pos].to_string()
    }

    fn parse_element(&mut self) -> Result<Element, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.parse_tag_name();
        if tag.is_empty() {
            return Err(self.error("tag name expected"));
        }
        let mut el = Element::new(tag, Span::default());

        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                el.self_closing = true;
                el.span = self.span_from(start);
                return Ok(el);
            }
            if self.eat(">") {
                break;
            }
            let attr = self.parse_attribute()?;
            el.attributes.push(attr);
        }

        loop {
            if self.pos >= self.text.len() {
                return Err(self.error("unexpected end of input"));
            }
            if self.rest().starts_with("</") {
                self.pos += 2;
                let closing = self.parse_tag_name();
                self.skip_whitespace();
                if !self.eat(">") {
                    return Err(self.error("expected >"));
                }
                if closing != el.tag {
                    return Err(self.error(&format!("mismatched closing tag </{closing}>")));
                }
                el.span = self.span_from(start);
                return Ok(el);
            }
            let child = self.parse_node()?;
            el.children.push(child);
        }
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let start = self.pos;
        let name = self.parse_attr_name();
        if name.is_empty() {
            return Err(self.error("attribute name expected"));
        }
        self.skip_whitespace();
        if !self.eat("=") {
            return Ok(Attribute {
                name,
                value: AttrValue::Literal(String::new()),
                span: self.span_from(start),
            });
        }
        self.skip_whitespace();
        if self.eat("\"") {
            let value_start = self.pos;
            while let Some(c) = self.peek() {
                if c == '"' {
                    break;
                }
                self.pos += c.len_utf8();
            }
            if self.peek() != Some('"') {
                return Err(self.error("unterminated attribute value"));
            }
            let value = self.text[value_start..self.pos].to_string();
            self.pos += 1;
            return Ok(Attribute {
                name,
                value: AttrValue::Literal(value),
                span: self.span_from(start),
            });
        }
        if self.peek() == Some('{') {
            let Node::Expr(island) = self.parse_island()? else {
                unreachable!("parse_island returns expression nodes");
            };
            return Ok(Attribute {
                name,
                value: AttrValue::Expr(island.code),
                span: self.span_from(start),
            });
        }
        Err(self.error("attribute value expected"))
    }
}

fn line_col(text: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut column = 1u32;
    for (index, c) in text.char_indices() {
        if index >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
