//! Minimal element tree for menu definition documents.
//!
//! Menu documents never mix text and child elements, so an element keeps its
//! concatenated text next to its children instead of a general node list.

use std::fmt::Write as _;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;

/// Public identifier written into saved menu documents.
const DOCTYPE: &str = r#"<!DOCTYPE Menu PUBLIC "-//freedesktop//DTD Menu 1.0//EN" "http://standards.freedesktop.org/menu-spec/menu-1.0.dtd">"#;

/// One markup element with its attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data directly inside this element.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Self>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create an element holding only `text`.
    #[must_use]
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Builder-style child append.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Builder-style attribute set.
    #[must_use]
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_string();
        } else {
            self.attributes.push((key.to_string(), value.to_string()));
        }
    }

    /// Text content with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// Trimmed text of an element whose content is mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyElement`] when the text is blank.
    pub fn required_text(&self, path: &Path) -> Result<String, ParseError> {
        let text = self.trimmed_text();
        if text.is_empty() {
            return Err(ParseError::EmptyElement {
                element: self.name.clone(),
                path: path.to_path_buf(),
            });
        }
        Ok(text.to_string())
    }

    /// First child named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Children named `name`.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parse a document and return its root element.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidMarkup`] if the content is not
    /// well-formed or has no root element.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self, ParseError> {
        let invalid = |message: String| ParseError::InvalidMarkup {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut stack: Vec<Self> = Vec::new();
        let mut root: Option<Self> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => stack.push(start_element(e).map_err(&invalid)?),
                Ok(Event::Empty(ref e)) => {
                    let element = start_element(e).map_err(&invalid)?;
                    attach(&mut stack, &mut root, element).map_err(&invalid)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| invalid("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element).map_err(&invalid)?;
                }
                Ok(Event::Text(ref t)) => {
                    let text = t.unescape().map_err(|e| invalid(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    let pos = reader.buffer_position();
                    return Err(invalid(format!("at byte {pos}: {e}")));
                }
                Ok(_) => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(invalid("unexpected end of document".to_string()));
        }
        root.ok_or_else(|| invalid("document has no root element".to_string()))
    }

    /// Serialize as an indented menu document with declaration and doctype.
    #[must_use]
    pub fn to_document_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(DOCTYPE);
        out.push('\n');
        self.write_indented(&mut out, 0);
        out
    }

    fn write_indented(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
        }

        let text = self.trimmed_text();
        if self.children.is_empty() {
            if text.is_empty() {
                out.push_str("/>\n");
            } else {
                let _ = writeln!(out, ">{}</{}>", escape(text), self.name);
            }
            return;
        }

        out.push_str(">\n");
        if !text.is_empty() {
            let _ = writeln!(out, "{indent}  {}", escape(text));
        }
        for child in &self.children {
            child.write_indented(out, depth + 1);
        }
        let _ = writeln!(out, "{indent}</{}>", self.name);
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element, String> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| err.to_string())?
        .to_string();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err("multiple root elements".to_string())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Element {
        Element::parse_str(content, Path::new("t.menu")).expect("test markup should parse")
    }

    #[test]
    fn parses_nested_elements_and_text() {
        let root = parse(
            "<!DOCTYPE Menu><Menu><Name> Applications </Name>\
             <MergeFile type=\"parent\">/etc/x.menu</MergeFile><DefaultAppDirs/></Menu>",
        );
        assert_eq!(root.name, "Menu");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.find("Name").unwrap().trimmed_text(), "Applications");
        let merge = root.find("MergeFile").unwrap();
        assert_eq!(merge.attribute("type"), Some("parent"));
        assert_eq!(merge.text, "/etc/x.menu");
        assert!(root.find("DefaultAppDirs").unwrap().children.is_empty());
    }

    #[test]
    fn unescapes_entities() {
        let root = parse("<Menu><Name>Tom &amp; Jerry</Name></Menu>");
        assert_eq!(root.find("Name").unwrap().text, "Tom & Jerry");
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = Element::parse_str("<Menu><Name></Menu>", Path::new("bad.menu"))
            .expect_err("mismatched markup");
        assert!(matches!(err, ParseError::InvalidMarkup { .. }));
    }

    #[test]
    fn rejects_unterminated_document() {
        let err = Element::parse_str("<Menu><Name>x</Name>", Path::new("bad.menu"))
            .expect_err("unterminated markup");
        assert!(err.to_string().contains("bad.menu"));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(Element::parse_str("", Path::new("e.menu")).is_err());
    }

    #[test]
    fn serializes_indented_document() {
        let doc = Element::new("Menu")
            .child(Element::with_text("Name", "A & B"))
            .child(Element::new("Include").child(Element::with_text("Filename", "a.desktop")))
            .child(Element::new("MergeFile").attr("type", "parent"));
        insta::assert_snapshot!(doc.to_document_string(), @r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE Menu PUBLIC "-//freedesktop//DTD Menu 1.0//EN" "http://standards.freedesktop.org/menu-spec/menu-1.0.dtd">
        <Menu>
          <Name>A &amp; B</Name>
          <Include>
            <Filename>a.desktop</Filename>
          </Include>
          <MergeFile type="parent"/>
        </Menu>
        "#);
    }

    #[test]
    fn serialized_document_parses_back() {
        let doc = Element::new("Menu")
            .child(Element::with_text("Name", "Games"))
            .child(Element::new("Layout").child(Element::new("Merge").attr("type", "menus")));
        let back = parse(&doc.to_document_string());
        assert_eq!(back, doc);
    }
}
