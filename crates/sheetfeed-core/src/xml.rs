//! Namespace-aware element tree over quick-xml
//!
//! Feed responses are small, so they are read into an owned tree of
//! [`Element`]s with every element and attribute name resolved to its
//! namespace URI. Prefixes chosen by the server never leak past this module.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::{NsReader, Reader};
use quick_xml::writer::Writer;

use crate::error::{Error, Result};

/// Atom syndication namespace
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
/// Spreadsheet namespace (`gs:`): worksheet dimensions and cells
pub const GS_NS: &str = "http://schemas.google.com/spreadsheets/2006";
/// Extended namespace (`gsx:`): one element per list-feed column
pub const GSX_NS: &str = "http://schemas.google.com/spreadsheets/2006/extended";
/// GData batch namespace (`batch:`)
pub const BATCH_NS: &str = "http://schemas.google.com/gdata/batch";

/// An attribute with its resolved namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// An element with its resolved namespace, attributes, children and text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Namespace URI, `None` when the element is unqualified
    pub namespace: Option<String>,
    /// Local name (no prefix)
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    /// Unescaped character data directly inside this element
    pub text: String,
}

impl Element {
    /// Check the element's namespace and local name
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name == name
    }

    /// Value of an unqualified attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// First child with the given namespace and local name
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// All children with the given namespace and local name, in document order
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    /// All children in a namespace, in document order
    pub fn children_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |c| c.namespace.as_deref() == Some(namespace))
    }

    /// Text of the first matching child
    pub fn child_text(&self, namespace: &str, name: &str) -> Option<&str> {
        self.child(namespace, name).map(|c| c.text.as_str())
    }
}

/// Parse a document into its root element
pub fn parse(input: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(input);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        let namespace = namespace_of(ns)?;

        match event {
            Event::Start(e) => {
                let element = open_element(&reader, namespace, &e)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = open_element(&reader, namespace, &e)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Parse("unbalanced end tag".into()))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::Parse("unexpected end of document".into()));
    }
    root.ok_or_else(|| Error::Parse("document has no root element".into()))
}

/// Re-serialize a document with four-space indentation, for diagnostics
pub fn pretty_print(input: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            event => writer
                .write_event(event)
                .map_err(|e| Error::Parse(e.to_string()))?,
        }
        buf.clear();
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Parse(e.to_string()))
}

fn namespace_of(result: ResolveResult) -> Result<Option<String>> {
    match result {
        ResolveResult::Bound(ns) => Ok(Some(lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Parse(format!(
            "undeclared namespace prefix '{}'",
            lossy(&prefix)
        ))),
    }
}

fn open_element<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart,
) -> Result<Element> {
    let mut element = Element {
        namespace,
        name: lossy(start.local_name().as_ref()).into_owned(),
        ..Default::default()
    };

    for attr in start.attributes() {
        let attr = attr?;
        // xmlns declarations were already consumed by the reader
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let namespace = namespace_of(ns)?;
        element.attributes.push(Attribute {
            namespace,
            name: lossy(local.as_ref()).into_owned(),
            value: attr.unescape_value()?.into_owned(),
        });
    }

    Ok(element)
}

fn close_element(
    mut element: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
) -> Result<()> {
    // Indentation between child elements is not content
    if !element.children.is_empty() && element.text.trim().is_empty() {
        element.text.clear();
    }

    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Parse("multiple root elements".into())),
    }
    Ok(())
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}
