//! Minimal namespace-aware XML tree.
//!
//! Request documents are assembled as [`Element`] trees so that the very
//! same tree can be canonicalized, digested, signed and serialized.

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::core::FiscalError;

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An attribute. Namespace declarations are never stored as attributes;
/// they are derived from element and attribute namespaces on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// An XML element with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    /// Element in no namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            namespace: None,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element in `namespace`, written with `prefix` (or as the default
    /// namespace when `prefix` is `None`).
    pub fn in_namespace(prefix: Option<&str>, namespace: &str, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            namespace: Some(namespace.to_string()),
            ..Self::new(name)
        }
    }

    /// A new element sharing this element's prefix and namespace.
    pub fn sibling_kind(&self, name: impl Into<String>) -> Self {
        Self {
            prefix: self.prefix.clone(),
            namespace: self.namespace.clone(),
            ..Self::new(name)
        }
    }

    /// Qualified name as written, e.g. `tns:Racun`.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an unqualified attribute, replacing an existing one.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                prefix: None,
                namespace: None,
                name,
                value,
            }),
        }
    }

    /// Value of an unqualified attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Append text content. Empty text is not stored.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
        self
    }

    /// Append a child in this element's namespace holding only `text`.
    pub fn push_text_child(&mut self, name: &str, text: impl Into<String>) {
        let child = self.sibling_kind(name).with_text(text);
        self.push(child);
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// First descendant (depth-first, including `self`) with the given local name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.elements().find_map(|e| e.find(name))
    }

    /// All descendants with the given local name, depth-first.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                out.push(child);
            }
            child.find_all(name, out);
        }
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Text of the first child with the given local name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }
}

fn xml_err(e: impl std::fmt::Display) -> FiscalError {
    FiscalError::Xml(e.to_string())
}

fn utf8(bytes: &[u8]) -> Result<String, FiscalError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| FiscalError::Xml(format!("invalid UTF-8 in name: {e}")))
}

fn namespace_of(resolved: ResolveResult<'_>) -> Result<Option<String>, FiscalError> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => utf8(uri).map(Some),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(FiscalError::Xml(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn read_start(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, FiscalError> {
    let (resolved, local) = reader.resolve_element(start.name());
    let mut element = Element {
        prefix: start.name().prefix().map(|p| utf8(p.as_ref())).transpose()?,
        namespace: namespace_of(resolved)?,
        name: utf8(local.as_ref())?,
        attributes: Vec::new(),
        children: Vec::new(),
    };
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        element.attributes.push(Attribute {
            prefix: attr.key.prefix().map(|p| utf8(p.as_ref())).transpose()?,
            namespace: namespace_of(resolved)?,
            name: utf8(local.as_ref())?,
            value: attr.unescape_value().map_err(xml_err)?.into_owned(),
        });
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), FiscalError> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(FiscalError::Xml("multiple root elements".into())),
    }
    Ok(())
}

/// Parse a document into an element tree. Whitespace-only text is dropped;
/// comments, processing instructions and the declaration are ignored.
pub fn parse(xml: &[u8]) -> Result<Element, FiscalError> {
    let mut reader = NsReader::from_reader(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(start) => {
                let element = read_start(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = read_start(&reader, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| FiscalError::Xml("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_err)?;
                if let Some(parent) = stack.last_mut() {
                    if !text.trim().is_empty() {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = utf8(&data.into_inner())?;
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FiscalError::Xml("unexpected end of document".into()));
    }
    root.ok_or_else(|| FiscalError::Xml("document has no root element".into()))
}
