//! A small in-memory element tree standing in for the browser DOM.
//!
//! Elements live in an arena owned by [`Document`] and are addressed by
//! [`ElementId`]. Removing an element detaches it from its parent but keeps it
//! in the arena, so stale handles held by timers stay valid and can be checked
//! with [`Document::is_connected`].

use crate::error::RenderError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Document shared between the renderer, the fade scheduler and the caller.
pub type SharedDocument = Rc<RefCell<Document>>;

const VOID_TAGS: [&str; 4] = ["br", "hr", "img", "input"];
const RAW_TEXT_TAGS: [&str; 2] = ["style", "script"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(ElementId),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    children: Vec<Node>,
    parent: Option<ElementId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }
}

/// An `html` element holding `head` and `body`.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    html: ElementId,
    head: ElementId,
    body: ElementId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            elements: Vec::new(),
            html: ElementId(0),
            head: ElementId(0),
            body: ElementId(0),
        };
        doc.html = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.attach(doc.html, doc.head);
        doc.attach(doc.html, doc.body);
        doc
    }

    /// Wraps a fresh document for sharing.
    pub fn new_shared() -> SharedDocument {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn html(&self) -> ElementId {
        self.html
    }

    pub fn head(&self) -> ElementId {
        self.head
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, RenderError> {
        self.elements.get(id.0).ok_or(RenderError::UnknownElement(id))
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, RenderError> {
        self.elements
            .get_mut(id.0)
            .ok_or(RenderError::UnknownElement(id))
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.elements.push(Element::new(tag));
        ElementId(self.elements.len() - 1)
    }

    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), RenderError> {
        self.element(parent)?;
        self.element(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(RenderError::InvalidHierarchy { parent, child });
        }
        self.detach(child);
        self.attach(parent, child);
        Ok(())
    }

    /// Inserts `child` immediately before `reference`, under the same parent.
    pub fn insert_before(
        &mut self,
        reference: ElementId,
        child: ElementId,
    ) -> Result<(), RenderError> {
        self.element(child)?;
        let parent = self
            .element(reference)?
            .parent
            .ok_or(RenderError::Orphan(reference))?;
        if child == reference || self.is_ancestor_or_self(child, parent) {
            return Err(RenderError::InvalidHierarchy { parent, child });
        }
        self.detach(child);
        let children = &mut self.elements[parent.0].children;
        let at = children
            .iter()
            .position(|n| *n == Node::Element(reference))
            .unwrap_or(children.len());
        children.insert(at, Node::Element(child));
        self.elements[child.0].parent = Some(parent);
        Ok(())
    }

    fn attach(&mut self, parent: ElementId, child: ElementId) {
        self.elements[parent.0].children.push(Node::Element(child));
        self.elements[child.0].parent = Some(parent);
    }

    fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.elements[id.0].parent.take() {
            self.elements[parent.0]
                .children
                .retain(|n| *n != Node::Element(id));
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, mut id: ElementId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.elements[id.0].parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Appends text to `parent`, merging with a trailing text node.
    pub fn append_text(&mut self, parent: ElementId, text: &str) -> Result<(), RenderError> {
        let element = self.element_mut(parent)?;
        if let Some(Node::Text(last)) = element.children.last_mut() {
            last.push_str(text);
        } else {
            element.children.push(Node::Text(text.to_string()));
        }
        Ok(())
    }

    /// Detaches `id` from its parent. The element and its subtree stay in the
    /// arena but are no longer connected.
    pub fn remove(&mut self, id: ElementId) -> Result<(), RenderError> {
        self.element(id)?;
        self.detach(id);
        Ok(())
    }

    /// Whether `id` is reachable from the `html` element.
    pub fn is_connected(&self, id: ElementId) -> bool {
        if self.elements.get(id.0).is_none() {
            return false;
        }
        self.is_ancestor_or_self(self.html, id)
    }

    /// Adds a class. Returns `false` if it was already present.
    pub fn add_class(&mut self, id: ElementId, class: &str) -> Result<bool, RenderError> {
        let element = self.element_mut(id)?;
        if element.has_class(class) {
            return Ok(false);
        }
        element.classes.push(class.to_string());
        Ok(true)
    }

    pub fn remove_class(&mut self, id: ElementId, class: &str) -> Result<bool, RenderError> {
        let element = self.element_mut(id)?;
        let before = element.classes.len();
        element.classes.retain(|c| c != class);
        Ok(element.classes.len() != before)
    }

    /// `false` for unknown elements.
    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id).is_ok_and(|e| e.has_class(class))
    }

    /// Sets an attribute. `class` replaces the class list.
    pub fn set_attribute(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), RenderError> {
        let element = self.element_mut(id)?;
        if name == "class" {
            element.classes = value.split_whitespace().map(str::to_string).collect();
        } else {
            element
                .attributes
                .insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id).ok()?.attribute(name)
    }

    /// Descendant elements of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if self.element(id).is_ok() {
            self.collect_descendants(id, &mut out);
        }
        out
    }

    fn collect_descendants(&self, id: ElementId, out: &mut Vec<ElementId>) {
        for child in &self.elements[id.0].children {
            if let Node::Element(child) = child {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    /// Connected elements with the given tag carrying attribute `name`,
    /// i.e. `querySelectorAll("tag[name]")`.
    pub fn query_all(&self, tag: &str, name: &str) -> Vec<ElementId> {
        self.descendants(self.html)
            .into_iter()
            .filter(|id| {
                let e = &self.elements[id.0];
                e.tag == tag && e.attributes.contains_key(name)
            })
            .collect()
    }

    /// Number of descendants of `root` carrying `class`.
    pub fn count_with_class(&self, root: ElementId, class: &str) -> usize {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.elements[id.0].has_class(class))
            .count()
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        if self.element(id).is_ok() {
            self.collect_text(id, &mut out);
        }
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        for child in &self.elements[id.0].children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(child) => self.collect_text(*child, out),
            }
        }
    }

    /// Serialises `id` and its subtree as HTML.
    pub fn to_html(&self, id: ElementId) -> Result<String, RenderError> {
        self.element(id)?;
        let mut out = String::new();
        self.write_html(id, &mut out);
        Ok(out)
    }

    fn write_html(&self, id: ElementId, out: &mut String) {
        let element = &self.elements[id.0];
        out.push('<');
        out.push_str(&element.tag);
        if !element.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(
                &element.classes.join(" "),
            ));
            out.push('"');
        }
        for (name, value) in &element.attributes {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
        }
        out.push('>');

        if VOID_TAGS.contains(&element.tag.as_str()) {
            return;
        }

        let raw = RAW_TEXT_TAGS.contains(&element.tag.as_str());
        for child in &element.children {
            match child {
                Node::Text(text) if raw => out.push_str(text),
                Node::Text(text) => out.push_str(&html_escape::encode_text(text)),
                Node::Element(child) => self.write_html(*child, out),
            }
        }

        out.push_str("</");
        out.push_str(&element.tag);
        out.push('>');
    }
}
