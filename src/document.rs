//! Flare XML parser - parses topics and snippets into a queryable element arena

use crate::node::Node;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Namespace URI of MadCap Flare elements and attributes
pub const FLARE_NAMESPACE: &str = "http://www.madcapsoftware.com/Schemas/MadCap.xsd";

/// Namespace URI bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Language assumed when neither the document nor the project names one
pub const DEFAULT_LANGUAGE: &str = "en-us";

/// Prefixes that may be used in rule files and queries
const NAMESPACES: [(&str, &str); 2] = [("MadCap", FLARE_NAMESPACE), ("xml", XML_NAMESPACE)];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("Failed to parse XML: {0}")]
    ParseXml(#[from] roxmltree::Error),
}

/// Index of an element in its document's arena
pub type ElementId = usize;

/// A parsed Flare document
#[derive(Debug)]
pub struct Document {
    /// All elements in document order; the root is at index 0
    elements: Vec<Element>,
    /// Parent of every element, built once while parsing
    parents: ParentMap,
    /// Language used when no element up to the root carries `xml:lang`
    default_language: String,
    /// Single-element sibling list for the root
    root: [ElementId; 1],
}

/// An XML element stored in the document arena
#[derive(Debug, Clone)]
pub struct Element {
    /// Expanded name (`{uri}local` when namespaced)
    pub tag: String,
    /// Name as written in rule files (`MadCap:local` for Flare elements)
    pub name: String,
    /// Attributes keyed by expanded name, in source order
    pub attributes: Vec<(String, String)>,
    /// Text runs and child elements, in document order
    pub content: Vec<Content>,
    /// Child element indices
    pub children: Vec<ElementId>,
    /// Rank among all sibling elements
    pub index: usize,
    /// One past the last element of this element's subtree
    pub end: ElementId,
    /// Source location
    pub line: usize,
    pub column: usize,
}

/// A piece of element content
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Element(ElementId),
}

/// Maps every element to its parent element
#[derive(Debug, Default)]
pub struct ParentMap(Vec<Option<ElementId>>);

impl ParentMap {
    /// Build the map in a single pass over the arena
    fn build(elements: &[Element]) -> Self {
        let mut parents = vec![None; elements.len()];
        for (id, element) in elements.iter().enumerate() {
            for &child in &element.children {
                parents[child] = Some(id);
            }
        }
        Self(parents)
    }

    /// Parent of an element, `None` for the root
    pub fn get(&self, id: ElementId) -> Option<ElementId> {
        self.0.get(id).copied().flatten()
    }
}

impl Document {
    /// Parse a Flare file
    pub fn parse_file(path: &Path, default_language: &str) -> Result<Self, ParseError> {
        let source = fs::read_to_string(path)?;
        Self::parse_str(&source, default_language)
    }

    /// Parse Flare XML from a string
    pub fn parse_str(source: &str, default_language: &str) -> Result<Self, ParseError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(source, options)?;
        let mut elements = Vec::new();

        fn parse_node(
            node: roxmltree::Node,
            index: usize,
            elements: &mut Vec<Element>,
        ) -> ElementId {
            let id = elements.len();
            let pos = node.document().text_pos_at(node.range().start);
            let tag_name = node.tag_name();

            let attributes = node
                .attributes()
                .map(|a| (expanded(a.namespace(), a.name()), a.value().to_string()))
                .collect();

            elements.push(Element {
                tag: expanded(tag_name.namespace(), tag_name.name()),
                name: display_name(tag_name.namespace(), tag_name.name()),
                attributes,
                content: Vec::new(),
                children: Vec::new(),
                index,
                end: id + 1,
                line: pos.row as usize,
                column: pos.col as usize,
            });

            let mut content = Vec::new();
            let mut children = Vec::new();
            for child in node.children() {
                if child.is_element() {
                    let child_id = parse_node(child, children.len(), elements);
                    children.push(child_id);
                    content.push(Content::Element(child_id));
                } else if child.is_text() {
                    let text = child.text().unwrap_or("");
                    // Adjacent runs split by a comment read as one
                    match content.last_mut() {
                        Some(Content::Text(previous)) => previous.push_str(text),
                        _ => content.push(Content::Text(text.to_string())),
                    }
                }
            }

            let end = elements.len();
            let element = &mut elements[id];
            element.content = content;
            element.children = children;
            element.end = end;
            id
        }

        parse_node(doc.root_element(), 0, &mut elements);
        let parents = ParentMap::build(&elements);

        Ok(Self {
            elements,
            parents,
            default_language: default_language.to_string(),
            root: [0],
        })
    }

    /// The root element
    pub fn root(&self) -> Node<'_> {
        Node::new(self, 0)
    }

    /// Iterate over every element in document order
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        (0..self.elements.len()).map(move |id| Node::new(self, id))
    }

    /// Number of elements in the document
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document holds no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get an element by index
    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id]
    }

    /// The parent map shared by every node of this document
    pub fn parents(&self) -> &ParentMap {
        &self.parents
    }

    /// Sibling elements of an element, including itself
    pub fn siblings(&self, id: ElementId) -> &[ElementId] {
        match self.parents.get(id) {
            Some(parent) => &self.elements[parent].children,
            None => &self.root,
        }
    }

    /// Language used when no ancestor declares one
    pub fn default_language(&self) -> &str {
        &self.default_language
    }
}

impl Element {
    /// Get an attribute value by expanded name
    pub fn attribute(&self, expanded_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == expanded_name)
            .map(|(_, value)| value.as_str())
    }
}

/// Expand a prefixed name (`MadCap:variable`) into its `{uri}local` form
pub fn expand_name(name: &str) -> Cow<'_, str> {
    if let Some((prefix, local)) = name.split_once(':') {
        if let Some((_, uri)) = NAMESPACES.iter().find(|(p, _)| *p == prefix) {
            return Cow::Owned(format!("{{{uri}}}{local}"));
        }
    }
    Cow::Borrowed(name)
}

fn expanded(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(uri) => format!("{{{uri}}}{local}"),
        None => local.to_string(),
    }
}

fn display_name(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(FLARE_NAMESPACE) => format!("MadCap:{local}"),
        _ => expanded(namespace, local),
    }
}
