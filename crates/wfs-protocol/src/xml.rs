//! Generic XML element tree for namespace-agnostic traversal.
//!
//! GML servers disagree on namespace prefixes (`gml:`, `wfs:`, none at all),
//! so the decoder matches on local names only. The tree keeps just what the
//! decoder needs: local tag name, children, and text content.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// One XML element with namespace prefix stripped from its name.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Local tag name (no namespace prefix).
    pub name: String,
    /// Direct text content of this element.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
}

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Document has no root element")]
    NoRoot,
}

impl XmlElement {
    /// Whether this element's local name is one of `names`.
    pub fn is_named(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.name == *n)
    }

    /// First descendant (depth-first, document order) whose local name is in
    /// `names`. The element itself is not considered.
    pub fn find_descendant(&self, names: &[&str]) -> Option<&XmlElement> {
        for child in &self.children {
            if child.is_named(names) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(names) {
                return Some(found);
            }
        }
        None
    }

    /// First of self-or-descendants whose local name is in `names`.
    pub fn find_self_or_descendant(&self, names: &[&str]) -> Option<&XmlElement> {
        if self.is_named(names) {
            return Some(self);
        }
        self.find_descendant(names)
    }

    /// Collect all descendants whose local name is in `names`. Matched
    /// elements are not descended into (rings do not nest).
    pub fn collect_descendants<'a>(&'a self, names: &[&str], out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.is_named(names) {
                out.push(child);
            } else {
                child.collect_descendants(names, out);
            }
        }
    }

    /// Whether this element or any descendant has a local name in `names`.
    pub fn contains_tag(&self, names: &[&str]) -> bool {
        self.is_named(names) || self.find_descendant(names).is_some()
    }

    /// Text of this element and all descendants, space-joined.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
        for child in &self.children {
            child.append_text(out);
        }
    }
}

/// Parse an XML document into an element tree rooted at its root element.
pub fn parse(xml: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(XmlElement {
                    name: local_name(e.name().as_ref()),
                    ..Default::default()
                });
            }
            Ok(Event::Empty(e)) => {
                let element = XmlElement {
                    name: local_name(e.name().as_ref()),
                    ..Default::default()
                };
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let (Some(top), Ok(text)) = (stack.last_mut(), t.unescape()) {
                    if !top.text.is_empty() {
                        top.text.push(' ');
                    }
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    if !top.text.is_empty() {
                        top.text.push(' ');
                    }
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XmlError::Parse {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    root.ok_or(XmlError::NoRoot)
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

/// Strip the namespace prefix from a qualified tag name.
fn local_name(qualified: &[u8]) -> String {
    let name = String::from_utf8_lossy(qualified);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}
