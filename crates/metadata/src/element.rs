//! Minimal element tree over `quick-xml` events
//!
//! Metadata documents are small, so they are read into a tree first and
//! interpreted afterwards. Mixed content is not preserved: text of an
//! element is the concatenation of its trimmed text and CDATA nodes.

use ifw_errors::{Error, FormatError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`, if non-empty
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }
}

fn xml_error(file: &str, position: u64, message: impl std::fmt::Display) -> Error {
    FormatError::Xml {
        file: file.to_string(),
        message: format!("at byte {position}: {message}"),
    }
    .into()
}

fn start_element(start: &BytesStart<'_>, file: &str, position: u64) -> Result<Element, Error> {
    let mut element = Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(file, position, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(file, position, e))?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

/// Parse a whole document and return its root element
pub(crate) fn parse_document(xml: &str, file: &str) -> Result<Element, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| xml_error(file, position, e))?;
        match event {
            Event::Start(start) => stack.push(start_element(&start, file, position)?),
            Event::Empty(start) => {
                let element = start_element(&start, file, position)?;
                attach(&mut stack, &mut root, element, file, position)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| xml_error(file, position, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element, file, position)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| xml_error(file, position, e))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error(
            file,
            reader.buffer_position(),
            "unexpected end of document",
        ));
    }
    root.ok_or_else(|| xml_error(file, 0, "document has no root element"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    file: &str,
    position: u64,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(xml_error(file, position, "more than one root element")),
    }
    Ok(())
}

/// Indented XML output with escaped text and attribute values
#[derive(Debug, Default)]
pub(crate) struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    pub fn new() -> Self {
        let mut writer = Self::default();
        writer.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        writer
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
    }

    fn attributes(&mut self, attributes: &[(&str, &str)]) {
        for (key, value) in attributes {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&quick_xml::escape::escape(*value));
            self.out.push('"');
        }
    }

    pub fn open(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.attributes(attributes);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    pub fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    pub fn element(&mut self, tag: &str, attributes: &[(&str, &str)], text: &str) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.attributes(attributes);
        if text.is_empty() {
            self.out.push_str("/>\n");
        } else {
            self.out.push('>');
            self.out.push_str(&quick_xml::escape::escape(text));
            self.out.push_str("</");
            self.out.push_str(tag);
            self.out.push_str(">\n");
        }
    }

    pub fn text(&mut self, tag: &str, text: &str) {
        self.element(tag, &[], text);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_with_attributes_and_cdata() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
<Root a="1 &amp; 2">
  <!-- comment -->
  <Item>first</Item>
  <Item><![CDATA[<raw>]]></Item>
  <Empty flag="yes"/>
</Root>"#,
            "test.xml",
        )
        .unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.attribute("a"), Some("1 & 2"));
        let items: Vec<_> = root.children_named("Item").map(|i| i.text.as_str()).collect();
        assert_eq!(items, vec!["first", "<raw>"]);
        assert_eq!(root.child("Empty").unwrap().attribute("flag"), Some("yes"));
        assert_eq!(root.child_text("Empty"), None);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_document("<Root><Open></Root>", "bad.xml").is_err());
        assert!(parse_document("<Root>", "bad.xml").is_err());
        assert!(parse_document("", "bad.xml").is_err());
    }

    #[test]
    fn test_writer_escapes() {
        let mut writer = XmlWriter::new();
        writer.open("Root", &[("name", "a\"b")]);
        writer.text("Value", "x < y & z");
        writer.close("Root");
        let xml = writer.finish();
        assert!(xml.contains("<Root name=\"a&quot;b\">"));
        assert!(xml.contains("<Value>x &lt; y &amp; z</Value>"));
        let parsed = parse_document(&xml, "out.xml").unwrap();
        assert_eq!(parsed.child_text("Value"), Some("x < y & z"));
    }
}
