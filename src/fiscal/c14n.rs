//! Exclusive XML Canonicalization 1.0, without comments.
//!
//! Works directly on [`Element`] trees, which carry resolved namespaces,
//! so a subtree can be canonicalized on its own (as `SignedInfo` is) with
//! exactly the namespace declarations it visibly uses.

use std::borrow::Cow;
use std::collections::BTreeMap;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;

use super::xml::{Element, Node};
use crate::core::FiscalError;

/// Algorithm URI of exclusive canonicalization without comments.
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// Prefix → namespace URI mappings already rendered by output ancestors.
/// The default namespace is keyed by the empty string.
type Rendered = BTreeMap<String, String>;

fn io_err(e: std::io::Error) -> FiscalError {
    FiscalError::Xml(format!("XML write error: {e}"))
}

/// Canonicalize `root` and its subtree.
pub fn canonicalize(root: &Element) -> Result<Vec<u8>, FiscalError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root, &Rendered::new())?;
    Ok(writer.into_inner())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    rendered: &Rendered,
) -> Result<(), FiscalError> {
    let mut in_force = rendered.clone();
    let mut declarations: BTreeMap<String, String> = BTreeMap::new();

    let mut utilize = |prefix: Option<&str>, namespace: Option<&str>| {
        let key = prefix.unwrap_or("").to_string();
        let uri = namespace.unwrap_or("").to_string();
        let current = in_force.get(&key).map(String::as_str).unwrap_or("");
        if current != uri {
            in_force.insert(key.clone(), uri.clone());
            declarations.insert(key, uri);
        }
    };
    utilize(element.prefix.as_deref(), element.namespace.as_deref());
    // The `xml` prefix is bound implicitly and never declared.
    for attr in &element.attributes {
        if attr.prefix.as_deref().is_some_and(|p| p != "xml") {
            utilize(attr.prefix.as_deref(), attr.namespace.as_deref());
        }
    }

    let qname = element.qualified_name();
    let mut start = BytesStart::new(qname.as_str());

    let declaration_keys: Vec<(String, String)> = declarations
        .into_iter()
        .map(|(prefix, uri)| {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{prefix}")
            };
            (key, escape_attr(&uri))
        })
        .collect();
    for (key, value) in &declaration_keys {
        start.push_attribute(XmlAttribute {
            key: QName(key.as_bytes()),
            value: Cow::Borrowed(value.as_bytes()),
        });
    }

    let mut attributes: Vec<(&str, &str, String, String)> = element
        .attributes
        .iter()
        .map(|a| {
            let qualified = match &a.prefix {
                Some(p) => format!("{p}:{}", a.name),
                None => a.name.clone(),
            };
            (
                a.namespace.as_deref().unwrap_or(""),
                a.name.as_str(),
                qualified,
                escape_attr(&a.value),
            )
        })
        .collect();
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    for (_, _, qualified, value) in &attributes {
        start.push_attribute(XmlAttribute {
            key: QName(qualified.as_bytes()),
            value: Cow::Borrowed(value.as_bytes()),
        });
    }

    writer.write_event(Event::Start(start)).map_err(io_err)?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e, &in_force)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::from_escaped(escape_text(t))))
                .map_err(io_err)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(qname.as_str())))
        .map_err(io_err)?;
    Ok(())
}

/// Escape character data the way canonical XML does.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value the way canonical XML does.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}
