//! XPath-inspired queries over Flare documents
//!
//! A [`Node`] is a cheap, copyable handle to one element of a [`Document`].
//! Every navigation method returns either a real node or [`EMPTY`], and
//! every operation on [`EMPTY`] yields [`EMPTY`] or a falsy value, so
//! queries chain without presence checks:
//!
//! ```
//! use flare_lint::{Document, DEFAULT_LANGUAGE};
//!
//! let doc = Document::parse_str("<ul><li>One</li></ul>", DEFAULT_LANGUAGE).unwrap();
//! let root = doc.root();
//! assert!(root.child("li").exists());
//! assert!(root.child("ol").child("li").parent("*").is_empty());
//! ```
//!
//! "Style" here means a Flare style: an element tag combined with its
//! `class` attribute, as shown in Flare's style picker. See [`Node::style`].

use crate::document::{expand_name, Content, Document, ElementId};
use std::fmt;

/// The empty node returned by navigation that finds nothing
pub const EMPTY: Node<'static> = Node {
    doc: None,
    id: 0,
    position: -1,
};

/// Name filter matching any element
pub const ANY: &str = "*";

const LANG_ATTRIBUTE: &str = "xml:lang";
const CONDITIONS_ATTRIBUTE: &str = "MadCap:conditions";
const SNIPPET_ELEMENTS: [&str; 2] = ["MadCap:snippetBlock", "MadCap:snippetText"];

/// Direction of navigation from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Parent,
    AncestorOrSelf,
    Ancestor,
    DescendantOrSelf,
    Descendant,
    PrecedingSibling,
    FollowingSibling,
    PreviousSibling,
    NextSibling,
    IsElement,
}

/// A handle to an element of a parsed document
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: Option<&'a Document>,
    id: ElementId,
    position: isize,
}

fn always(_: Node<'_>) -> bool {
    true
}

impl<'a> Node<'a> {
    pub(crate) fn new(doc: &'a Document, id: ElementId) -> Self {
        Self {
            doc: Some(doc),
            id,
            position: 0,
        }
    }

    fn at(self, position: isize) -> Self {
        Self { position, ..self }
    }

    fn related(&self, id: ElementId) -> Self {
        match self.doc {
            Some(doc) => Node::new(doc, id),
            None => EMPTY,
        }
    }

    /// Whether this is the empty node
    pub fn is_empty(&self) -> bool {
        self.doc.is_none()
    }

    /// Whether this node refers to an element
    pub fn exists(&self) -> bool {
        self.doc.is_some()
    }

    /// The document this node belongs to
    pub fn document(&self) -> Option<&'a Document> {
        self.doc
    }

    /// Arena index of the element, `None` for the empty node
    pub fn id(&self) -> Option<ElementId> {
        self.doc.map(|_| self.id)
    }

    /// Element name as written in rule files, e.g. `p` or `MadCap:variable`
    pub fn name(&self) -> &'a str {
        match self.doc {
            Some(doc) => &doc.element(self.id).name,
            None => "",
        }
    }

    /// Whether the element name matches a filter
    pub fn matches_name(&self, name: &str) -> bool {
        match self.doc {
            Some(doc) => name == ANY || doc.element(self.id).tag == expand_name(name),
            None => false,
        }
    }

    /// Attribute value, or "" when absent
    pub fn attribute(&self, name: &str) -> &'a str {
        match self.doc {
            Some(doc) => doc
                .element(self.id)
                .attribute(&expand_name(name))
                .unwrap_or(""),
            None => "",
        }
    }

    /// Text owned directly by the element, including text after each child
    pub fn text(&self) -> String {
        let Some(doc) = self.doc else {
            return String::new();
        };
        doc.element(self.id)
            .content
            .iter()
            .filter_map(|c| match c {
                Content::Text(text) => Some(text.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }

    /// All text in the element's subtree, in document order
    pub fn value_of(&self) -> String {
        fn collect(doc: &Document, id: ElementId, out: &mut String) {
            for content in &doc.element(id).content {
                match content {
                    Content::Text(text) => out.push_str(text),
                    Content::Element(child) => collect(doc, *child, out),
                }
            }
        }

        let mut value = String::new();
        if let Some(doc) = self.doc {
            collect(doc, self.id, &mut value);
        }
        value
    }

    /// Rank among the elements that matched the name filter of the axis
    /// that produced this node; -1 for the empty node
    pub fn position(&self) -> isize {
        if self.is_empty() {
            -1
        } else {
            self.position
        }
    }

    /// Rank among all sibling elements; 0 for the root, -1 for the empty node
    pub fn document_index(&self) -> isize {
        match self.doc {
            Some(doc) => doc.element(self.id).index as isize,
            None => -1,
        }
    }

    /// 1-based source line, 0 for the empty node
    pub fn line(&self) -> usize {
        self.doc.map_or(0, |doc| doc.element(self.id).line)
    }

    /// 1-based source column, 0 for the empty node
    pub fn column(&self) -> usize {
        self.doc.map_or(0, |doc| doc.element(self.id).column)
    }

    /// Walk an axis and return the first element matching `name`
    pub fn axis(&self, axis: Axis, name: &str) -> Node<'a> {
        self.axis_where(axis, name, always)
    }

    /// Walk an axis and return the first element matching `name` and `predicate`
    pub fn axis_where<F>(&self, axis: Axis, name: &str, predicate: F) -> Node<'a>
    where
        F: Fn(Node<'a>) -> bool,
    {
        let Some(doc) = self.doc else {
            return EMPTY;
        };
        let id = self.id;
        let parents = doc.parents();

        match axis {
            Axis::Child => {
                let children = doc.element(id).children.iter().copied();
                self.first_match(children, name, predicate)
            }
            Axis::Parent => match parents.get(id) {
                Some(parent) => self.first_match(std::iter::once(parent), name, predicate),
                None => EMPTY,
            },
            Axis::AncestorOrSelf => {
                let ids = std::iter::successors(Some(id), |&id| parents.get(id));
                self.first_match(ids, name, predicate)
            }
            Axis::Ancestor => {
                let ids = std::iter::successors(parents.get(id), |&id| parents.get(id));
                self.first_match(ids, name, predicate)
            }
            // Elements are stored in document order, so a subtree is contiguous
            Axis::DescendantOrSelf => self.first_match(id..doc.element(id).end, name, predicate),
            Axis::Descendant => self.first_match(id + 1..doc.element(id).end, name, predicate),
            Axis::PrecedingSibling => {
                let (before, _) = self.split_siblings(doc);
                self.first_match(before.iter().rev().copied(), name, predicate)
            }
            Axis::FollowingSibling => {
                let (_, after) = self.split_siblings(doc);
                self.first_match(after.iter().copied(), name, predicate)
            }
            Axis::PreviousSibling => {
                let (before, _) = self.split_siblings(doc);
                self.first_match(before.last().copied(), name, predicate)
            }
            Axis::NextSibling => {
                let (_, after) = self.split_siblings(doc);
                self.first_match(after.first().copied(), name, predicate)
            }
            Axis::IsElement => {
                if self.matches_name(name) && predicate(*self) {
                    *self
                } else {
                    EMPTY
                }
            }
        }
    }

    /// Assign axis positions to name matches and return the first that
    /// satisfies the predicate
    fn first_match<I, F>(&self, candidates: I, name: &str, predicate: F) -> Node<'a>
    where
        I: IntoIterator<Item = ElementId>,
        F: Fn(Node<'a>) -> bool,
    {
        let mut position = 0;
        for id in candidates {
            let candidate = self.related(id);
            if candidate.matches_name(name) {
                let candidate = candidate.at(position);
                position += 1;
                if predicate(candidate) {
                    return candidate;
                }
            }
        }
        EMPTY
    }

    /// Siblings before and after this node, nearest last and first respectively
    fn split_siblings(&self, doc: &'a Document) -> (&'a [ElementId], &'a [ElementId]) {
        let siblings = doc.siblings(self.id);
        let index = doc.element(self.id).index;
        (&siblings[..index], &siblings[index + 1..])
    }

    pub fn child(&self, name: &str) -> Node<'a> {
        self.axis(Axis::Child, name)
    }

    pub fn child_where<F: Fn(Node<'a>) -> bool>(&self, name: &str, predicate: F) -> Node<'a> {
        self.axis_where(Axis::Child, name, predicate)
    }

    pub fn parent(&self, name: &str) -> Node<'a> {
        self.axis(Axis::Parent, name)
    }

    pub fn parent_where<F: Fn(Node<'a>) -> bool>(&self, name: &str, predicate: F) -> Node<'a> {
        self.axis_where(Axis::Parent, name, predicate)
    }

    pub fn ancestor_or_self(&self, name: &str) -> Node<'a> {
        self.axis(Axis::AncestorOrSelf, name)
    }

    pub fn ancestor_or_self_where<F: Fn(Node<'a>) -> bool>(
        &self,
        name: &str,
        predicate: F,
    ) -> Node<'a> {
        self.axis_where(Axis::AncestorOrSelf, name, predicate)
    }

    pub fn ancestor(&self, name: &str) -> Node<'a> {
        self.axis(Axis::Ancestor, name)
    }

    pub fn ancestor_where<F: Fn(Node<'a>) -> bool>(&self, name: &str, predicate: F) -> Node<'a> {
        self.axis_where(Axis::Ancestor, name, predicate)
    }

    pub fn descendant_or_self(&self, name: &str) -> Node<'a> {
        self.axis(Axis::DescendantOrSelf, name)
    }

    pub fn descendant_or_self_where<F: Fn(Node<'a>) -> bool>(
        &self,
        name: &str,
        predicate: F,
    ) -> Node<'a> {
        self.axis_where(Axis::DescendantOrSelf, name, predicate)
    }

    pub fn descendant(&self, name: &str) -> Node<'a> {
        self.axis(Axis::Descendant, name)
    }

    pub fn descendant_where<F: Fn(Node<'a>) -> bool>(&self, name: &str, predicate: F) -> Node<'a> {
        self.axis_where(Axis::Descendant, name, predicate)
    }

    pub fn preceding_sibling(&self, name: &str) -> Node<'a> {
        self.axis(Axis::PrecedingSibling, name)
    }

    pub fn preceding_sibling_where<F: Fn(Node<'a>) -> bool>(
        &self,
        name: &str,
        predicate: F,
    ) -> Node<'a> {
        self.axis_where(Axis::PrecedingSibling, name, predicate)
    }

    pub fn following_sibling(&self, name: &str) -> Node<'a> {
        self.axis(Axis::FollowingSibling, name)
    }

    pub fn following_sibling_where<F: Fn(Node<'a>) -> bool>(
        &self,
        name: &str,
        predicate: F,
    ) -> Node<'a> {
        self.axis_where(Axis::FollowingSibling, name, predicate)
    }

    /// The immediately preceding sibling, if it matches
    pub fn previous_sibling(&self, name: &str) -> Node<'a> {
        self.axis(Axis::PreviousSibling, name)
    }

    pub fn previous_sibling_where<F: Fn(Node<'a>) -> bool>(
        &self,
        name: &str,
        predicate: F,
    ) -> Node<'a> {
        self.axis_where(Axis::PreviousSibling, name, predicate)
    }

    /// The immediately following sibling, if it matches
    pub fn next_sibling(&self, name: &str) -> Node<'a> {
        self.axis(Axis::NextSibling, name)
    }

    pub fn next_sibling_where<F: Fn(Node<'a>) -> bool>(
        &self,
        name: &str,
        predicate: F,
    ) -> Node<'a> {
        self.axis_where(Axis::NextSibling, name, predicate)
    }

    /// This node, if it matches
    pub fn is_element(&self, name: &str) -> Node<'a> {
        self.axis(Axis::IsElement, name)
    }

    pub fn is_element_where<F: Fn(Node<'a>) -> bool>(&self, name: &str, predicate: F) -> Node<'a> {
        self.axis_where(Axis::IsElement, name, predicate)
    }

    /// Match a Flare style: `tag.class`, `tag`, or `.class`
    ///
    /// The tag part is ignored when empty. The class part must equal the
    /// element's `class` attribute, so a bare `tag` only matches elements
    /// without a class.
    pub fn style(&self, spec: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut parts = spec.split('.');
        let tag = parts.next().unwrap_or("");
        let class = parts.next().unwrap_or("");

        (tag.is_empty() || tag == self.name()) && class == self.attribute("class")
    }

    /// Whether the element's language starts with `tag`, ignoring case
    ///
    /// The language comes from the nearest `xml:lang` on this element or
    /// an ancestor, falling back to the document's default language.
    pub fn language(&self, tag: &str) -> bool {
        let Some(doc) = self.doc else {
            return false;
        };
        let carrier = self.ancestor_or_self_where(ANY, |n| !n.attribute(LANG_ATTRIBUTE).is_empty());
        let language = if carrier.exists() {
            carrier.attribute(LANG_ATTRIBUTE)
        } else {
            doc.default_language()
        };
        language.to_lowercase().starts_with(&tag.to_lowercase())
    }

    /// Whether this element or an ancestor is tagged with condition `name`
    pub fn has_condition(&self, name: &str) -> bool {
        self.ancestor_or_self_where(ANY, |n| {
            n.attribute(CONDITIONS_ATTRIBUTE)
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .any(|condition| condition == name)
        })
        .exists()
    }

    /// Whether this element is a snippet reference to `src`
    pub fn snippet(&self, src: &str) -> bool {
        SNIPPET_ELEMENTS.iter().any(|element| {
            self.is_element_where(element, |n| n.attribute("src") == src)
                .exists()
        })
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.doc, other.doc) {
            (Some(a), Some(b)) => std::ptr::eq(a, b) && self.id == other.id,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Node(EMPTY)");
        }
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("id", &self.id)
            .field("position", &self.position)
            .finish()
    }
}
