//! Minimal owned XML tree
//!
//! SBML documents are assembled as a tree of [`XmlElement`] nodes and
//! serialized with `quick-xml`. Parsing produces the same tree, so the
//! reader, the MathML codec and the notes handling share one representation.
//! Whitespace-only text between elements is dropped while parsing and
//! re-created by the indenting writer.

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::sbml::error::SBMLError;

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Sets an attribute if a value is present.
    pub fn with_opt_attr<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.set_attr(key, value.to_string());
        }
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Looks up an attribute by its qualified name, falling back to its
    /// local name (`comp:idRef` matches `idRef`).
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.attributes.iter().find(|(k, _)| local(k) == key))
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attributes.retain(|(k, _)| k != key && local(k) != key);
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Appends a child list element (e.g. `listOfSpecies`) when it has items.
    pub fn push_list(&mut self, name: &str, items: Vec<XmlElement>) {
        if items.is_empty() {
            return;
        }
        let mut list = XmlElement::new(name);
        list.children = items.into_iter().map(XmlNode::Element).collect();
        self.push(list);
    }

    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == name)
    }

    /// Items of a child list element; empty when the list is absent.
    pub fn list(&self, list: &str) -> Vec<&XmlElement> {
        self.child(list)
            .map(|l| l.elements().collect())
            .unwrap_or_default()
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut text = String::new();
        collect_text(self, &mut text);
        text.trim().to_string()
    }

    /// Parses a document and returns its root element.
    pub fn parse(input: &str) -> Result<XmlElement, SBMLError> {
        let mut reader = Reader::from_str(input);
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| SBMLError::XmlError(e.to_string()))?;

            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(element),
                        None => return Ok(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SBMLError::XmlError("unbalanced end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text).into_owned();
                    let raw = if raw.contains('&') {
                        unescape(&raw)
                            .map_err(|e| SBMLError::XmlError(e.to_string()))?
                            .into_owned()
                    } else {
                        raw
                    };
                    push_text(&mut stack, raw);
                }
                Event::CData(data) => {
                    push_text(&mut stack, String::from_utf8_lossy(&data).into_owned());
                }
                Event::GeneralRef(reference) => {
                    let name = String::from_utf8_lossy(&reference).into_owned();
                    push_text(&mut stack, resolve_reference(&name)?);
                }
                Event::Eof => {
                    return Err(SBMLError::XmlError(
                        "unexpected end of document".to_string(),
                    ))
                }
                _ => {}
            }
        }
    }

    /// Serializes the element as an indented document.
    pub fn to_xml_string(&self, declaration: bool) -> Result<String, SBMLError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        if declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(|e| SBMLError::XmlError(e.to_string()))?;
        }
        self.write_into(&mut writer)?;

        let mut out = String::from_utf8(writer.into_inner())
            .map_err(|e| SBMLError::XmlError(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), SBMLError> {
        let xml_err = |e: std::io::Error| SBMLError::XmlError(e.to_string());

        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(xml_err);
        }

        writer.write_event(Event::Start(start)).map_err(xml_err)?;
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_into(writer)?,
                XmlNode::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(xml_err)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(xml_err)
    }
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(inner) => collect_text(inner, out),
        }
    }
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement, SBMLError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| SBMLError::XmlError(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw)
            .map_err(|e| SBMLError::XmlError(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

/// Appends text to the open element, merging adjacent text runs. Runs that
/// are whitespace only are dropped.
fn push_text(stack: &mut [XmlElement], text: String) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    match parent.children.last_mut() {
        Some(XmlNode::Text(existing)) => existing.push_str(&text),
        _ => parent.children.push(XmlNode::Text(text)),
    }
    if let Some(XmlNode::Text(last)) = parent.children.last() {
        if last.trim().is_empty() {
            parent.children.pop();
        }
    }
}

fn resolve_reference(name: &str) -> Result<String, SBMLError> {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        return parsed
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| SBMLError::XmlError(format!("invalid character reference &{name};")));
    }

    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(|| SBMLError::XmlError(format!("unknown entity &{name};")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_write() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<root a="1 &lt; 2">
  <child name="x"/>
  <text>A &amp; B</text>
</root>"#;
        let root = XmlElement::parse(input).unwrap();
        assert_eq!(root.attr("a"), Some("1 < 2"));
        assert_eq!(root.child("text").unwrap().text(), "A & B");
        assert_eq!(root.elements().count(), 2);

        let written = root.to_xml_string(false).unwrap();
        assert!(written.contains("a=\"1 &lt; 2\""));
        assert_eq!(XmlElement::parse(&written).unwrap(), root);
    }

    #[test]
    fn test_attribute_local_name_lookup() {
        let element = XmlElement::new("comp:port").with_attr("comp:idRef", "c");
        assert_eq!(element.attr("idRef"), Some("c"));
        assert_eq!(element.local_name(), "port");
    }

    #[test]
    fn test_unbalanced_document() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("<a>").is_err());
    }
}
