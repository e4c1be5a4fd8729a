//! Compiled predicates and their evaluation
//!
//! A predicate is plain data: an optional negation plus either a
//! standalone test (`condition`, `fail`, `language`, `snippet`) or a
//! point of view paired with a sub-predicate and its arguments. All
//! evaluation goes through [`Predicate::evaluate`].

use super::tokenizer::quote;
use crate::node::{Axis, Node, ANY};
use std::fmt;

const VARIABLE_ELEMENT: &str = "MadCap:variable";

/// The node a predicate looks at, relative to the node being linted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOfView {
    After,
    Ancestor,
    Before,
    Child,
    Descendant,
    Next,
    Parent,
    Previous,
    Itself,
}

impl PointOfView {
    pub const ALL: [PointOfView; 9] = [
        PointOfView::After,
        PointOfView::Ancestor,
        PointOfView::Before,
        PointOfView::Child,
        PointOfView::Descendant,
        PointOfView::Next,
        PointOfView::Parent,
        PointOfView::Previous,
        PointOfView::Itself,
    ];

    /// Keyword used in rule files
    pub fn keyword(&self) -> &'static str {
        match self {
            PointOfView::After => "after",
            PointOfView::Ancestor => "ancestor",
            PointOfView::Before => "before",
            PointOfView::Child => "child",
            PointOfView::Descendant => "descendant",
            PointOfView::Next => "next",
            PointOfView::Parent => "parent",
            PointOfView::Previous => "previous",
            PointOfView::Itself => "self",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pov| pov.keyword() == keyword)
    }

    /// Axis walked from the linted node
    pub fn axis(&self) -> Axis {
        match self {
            PointOfView::After => Axis::FollowingSibling,
            PointOfView::Ancestor => Axis::Ancestor,
            PointOfView::Before => Axis::PrecedingSibling,
            PointOfView::Child => Axis::Child,
            PointOfView::Descendant => Axis::Descendant,
            PointOfView::Next => Axis::NextSibling,
            PointOfView::Parent => Axis::Parent,
            PointOfView::Previous => Axis::PreviousSibling,
            PointOfView::Itself => Axis::IsElement,
        }
    }
}

/// Comparison applied to the node found along the point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    /// The node exists
    Exists { tag: String },
    /// The node has a Flare style
    Style { spec: String },
    /// The node exists and holds only whitespace
    Empty { tag: String },
    Position { tag: String, position: usize },
    First { tag: String },
    Last { tag: String },
    /// The node's own text has leading or trailing whitespace
    Padding { tag: String },
    Contains { tag: String, text: String },
    Text { tag: String, text: String },
    Ends { tag: String, text: String },
    Begins { tag: String, text: String },
    Attribute { tag: String, name: String },
    AttributeEquals { tag: String, name: String, text: String },
    AttributeContains { tag: String, name: String, text: String },
    AttributeEnds { tag: String, name: String, text: String },
    /// A variable reference to the named variable
    Variable { name: String },
}

impl Test {
    /// Sub-predicate keyword, empty for [`Test::Exists`]
    pub fn keyword(&self) -> &'static str {
        match self {
            Test::Exists { .. } => "",
            Test::Style { .. } => "style",
            Test::Empty { .. } => "empty",
            Test::Position { .. } => "position",
            Test::First { .. } => "first",
            Test::Last { .. } => "last",
            Test::Padding { .. } => "padding",
            Test::Contains { .. } => "contains",
            Test::Text { .. } => "text",
            Test::Ends { .. } => "ends",
            Test::Begins { .. } => "begins",
            Test::Attribute { .. } => "attribute",
            Test::AttributeEquals { .. } => "attribute-equals",
            Test::AttributeContains { .. } => "attribute-contains",
            Test::AttributeEnds { .. } => "attribute-ends",
            Test::Variable { .. } => "variable",
        }
    }

    fn evaluate(&self, node: Node<'_>, axis: Axis) -> bool {
        match self {
            Test::Exists { tag } => node.axis(axis, tag).exists(),
            Test::Style { spec } => node.axis_where(axis, ANY, |n| n.style(spec)).exists(),
            Test::Empty { tag } => {
                let found = node.axis(axis, tag);
                found.exists() && found.value_of().trim().is_empty()
            }
            Test::Position { tag, position } => {
                usize::try_from(node.axis(axis, tag).position()).is_ok_and(|p| p == *position)
            }
            Test::First { tag } => node.axis(axis, tag).document_index() == 0,
            Test::Last { tag } => node.axis(axis, tag).next_sibling(ANY).is_empty(),
            Test::Padding { tag } => {
                let text = node.axis(axis, tag).text();
                text.trim() != text
            }
            Test::Contains { tag, text } => node.axis(axis, tag).value_of().contains(text.as_str()),
            Test::Text { tag, text } => node.axis(axis, tag).text().contains(text.as_str()),
            Test::Ends { tag, text } => node
                .axis(axis, tag)
                .value_of()
                .trim()
                .ends_with(text.trim_end()),
            Test::Begins { tag, text } => node
                .axis(axis, tag)
                .value_of()
                .trim()
                .starts_with(text.trim_start()),
            Test::Attribute { tag, name } => {
                !node.axis(axis, tag).attribute(name).trim().is_empty()
            }
            Test::AttributeEquals { tag, name, text } => {
                node.axis(axis, tag).attribute(name) == text
            }
            Test::AttributeContains { tag, name, text } => {
                node.axis(axis, tag).attribute(name).contains(text.as_str())
            }
            Test::AttributeEnds { tag, name, text } => node
                .axis(axis, tag)
                .attribute(name)
                .trim()
                .ends_with(text.trim_end()),
            Test::Variable { name } => node
                .axis_where(axis, VARIABLE_ELEMENT, |n| n.attribute("name") == name)
                .exists(),
        }
    }
}

/// What a predicate checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateKind {
    /// The node or an ancestor carries a condition tag
    Condition(String),
    /// Never holds
    Fail,
    /// The node's language starts with a tag
    Language(String),
    /// The node is a snippet reference to a file
    Snippet(String),
    /// A test on the node found along a point of view
    Axis { view: PointOfView, test: Test },
}

/// A possibly negated predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub negated: bool,
    pub kind: PredicateKind,
}

impl Predicate {
    pub fn new(kind: PredicateKind) -> Self {
        Self { negated: false, kind }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Evaluate the predicate against a node
    pub fn evaluate(&self, node: Node<'_>) -> bool {
        let holds = match &self.kind {
            PredicateKind::Condition(name) => node.has_condition(name),
            PredicateKind::Fail => false,
            PredicateKind::Language(tag) => node.language(tag),
            PredicateKind::Snippet(src) => node.snippet(src),
            PredicateKind::Axis { view, test } => test.evaluate(node, view.axis()),
        };
        holds != self.negated
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("not ")?;
        }
        match &self.kind {
            PredicateKind::Condition(name) => write!(f, "condition {name}"),
            PredicateKind::Fail => f.write_str("fail"),
            PredicateKind::Language(tag) => write!(f, "language {tag}"),
            PredicateKind::Snippet(src) => write!(f, "snippet {}", quote(src)),
            PredicateKind::Axis { view, test } => {
                f.write_str(view.keyword())?;
                if !test.keyword().is_empty() {
                    write!(f, "-{}", test.keyword())?;
                }
                match test {
                    Test::Exists { tag }
                    | Test::Empty { tag }
                    | Test::First { tag }
                    | Test::Last { tag }
                    | Test::Padding { tag } => write!(f, " {tag}"),
                    Test::Style { spec } => write!(f, " {spec}"),
                    Test::Position { tag, position } => write!(f, " {tag} {position}"),
                    Test::Contains { tag, text }
                    | Test::Text { tag, text }
                    | Test::Ends { tag, text }
                    | Test::Begins { tag, text } => write!(f, " {tag} {}", quote(text)),
                    Test::Attribute { tag, name } => write!(f, " {tag} {name}"),
                    Test::AttributeEquals { tag, name, text }
                    | Test::AttributeContains { tag, name, text }
                    | Test::AttributeEnds { tag, name, text } => {
                        write!(f, " {tag} {name} {}", quote(text))
                    }
                    Test::Variable { name } => write!(f, " {name}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DEFAULT_LANGUAGE};
    use crate::node::EMPTY;

    const TOPIC: &str = r#"<html xmlns:MadCap="http://www.madcapsoftware.com/Schemas/MadCap.xsd">
  <body>
    <h1>Overview</h1>
    <p class="Note"> Padded text</p>
    <p>See <a href="install.htm">the install guide</a>.</p>
    <ul>
      <li>One</li>
      <li>  </li>
      <li>Press <MadCap:variable name="Product.Name" /> now</li>
    </ul>
    <img src="diagram.png" alt="" />
  </body>
</html>"#;

    fn axis(view: PointOfView, test: Test) -> Predicate {
        Predicate::new(PredicateKind::Axis { view, test })
    }

    fn tag(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn test_point_of_view_keywords() {
        for view in PointOfView::ALL {
            assert_eq!(PointOfView::from_keyword(view.keyword()), Some(view));
        }
        assert_eq!(PointOfView::from_keyword("sibling"), None);
    }

    #[test]
    fn test_exists_and_negation() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let body = doc.root().child("body");

        let has_heading = axis(PointOfView::Child, Test::Exists { tag: tag("h1") });
        assert!(has_heading.evaluate(body));
        assert!(!has_heading.clone().negate().evaluate(body));
        assert!(!has_heading.evaluate(EMPTY));
        assert!(has_heading.negate().evaluate(EMPTY));
    }

    #[test]
    fn test_style() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let note = doc.root().descendant_where("p", |n| n.position() == 0);
        assert!(axis(PointOfView::Itself, Test::Style { spec: tag("p.Note") }).evaluate(note));
        assert!(axis(PointOfView::Itself, Test::Style { spec: tag(".Note") }).evaluate(note));
        assert!(!axis(PointOfView::Itself, Test::Style { spec: tag("p") }).evaluate(note));
        assert!(axis(PointOfView::Next, Test::Style { spec: tag("p") }).evaluate(note));
    }

    #[test]
    fn test_empty_and_padding() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let ul = doc.root().descendant("ul");
        let blank = ul.child_where("li", |n| n.position() == 1);

        let empty = axis(PointOfView::Itself, Test::Empty { tag: tag("li") });
        assert!(empty.evaluate(blank));
        assert!(!empty.evaluate(ul.child("li")));
        assert!(!empty.evaluate(ul));

        let padding = axis(PointOfView::Itself, Test::Padding { tag: tag("p") });
        assert!(padding.evaluate(doc.root().descendant("p")));
        assert!(!padding.evaluate(doc.root().descendant("h1")));
    }

    #[test]
    fn test_position_first_last() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let body = doc.root().child("body");
        let ul = doc.root().descendant("ul");
        let second = ul.child_where("li", |n| n.position() == 1);

        let position = |name: &str| Test::Position { tag: tag(name), position: 0 };
        assert!(axis(PointOfView::Before, position("li")).evaluate(second));
        assert!(!axis(PointOfView::Before, position("ol")).evaluate(second));

        let first = |name: &str| axis(PointOfView::Itself, Test::First { tag: tag(name) });
        assert!(first("h1").evaluate(doc.root().descendant("h1")));
        assert!(!first("li").evaluate(second));

        assert!(axis(PointOfView::Child, Test::Last { tag: tag("img") }).evaluate(body));
        assert!(!axis(PointOfView::Itself, Test::Last { tag: tag("li") }).evaluate(second));
    }

    #[test]
    fn test_last_holds_when_nothing_is_found() {
        let doc = Document::parse_str("<body><ul><p/></ul></body>", DEFAULT_LANGUAGE).unwrap();
        let ul = doc.root().child("ul");

        let last_item = axis(PointOfView::Child, Test::Last { tag: tag("li") });
        assert!(last_item.evaluate(ul));
        assert!(!last_item.clone().negate().evaluate(ul));
        assert!(last_item.evaluate(EMPTY));
    }

    #[test]
    fn test_text_comparisons() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let p = doc.root().descendant_where("p", |n| n.position() == 1);
        let itself = |test: Test| axis(PointOfView::Itself, test).evaluate(p);

        let contains = |text: &str| itself(Test::Contains { tag: tag("p"), text: tag(text) });
        assert!(contains("install guide"));
        assert!(!contains("uninstall"));

        let own_text = |text: &str| itself(Test::Text { tag: tag("p"), text: tag(text) });
        assert!(own_text("See"));
        assert!(!own_text("install guide"));

        assert!(itself(Test::Ends { tag: tag("p"), text: tag("guide. ") }));
        assert!(itself(Test::Begins { tag: tag("p"), text: tag(" See") }));
        assert!(!itself(Test::Begins { tag: tag("p"), text: tag("the") }));
    }

    #[test]
    fn test_attribute_comparisons() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let p = doc.root().descendant_where("p", |n| n.position() == 1);
        let img = doc.root().descendant("img");

        let link = |test: Test| axis(PointOfView::Child, test).evaluate(p);
        assert!(link(Test::Attribute { tag: tag("a"), name: tag("href") }));
        assert!(!link(Test::Attribute { tag: tag("a"), name: tag("title") }));

        let equals = |text: &str| Test::AttributeEquals {
            tag: tag("a"),
            name: tag("href"),
            text: tag(text),
        };
        let contains = |text: &str| Test::AttributeContains {
            tag: tag("a"),
            name: tag("href"),
            text: tag(text),
        };
        let ends = |text: &str| Test::AttributeEnds {
            tag: tag("a"),
            name: tag("href"),
            text: tag(text),
        };
        assert!(link(equals("install.htm")));
        assert!(!link(equals("install")));
        assert!(link(contains("stall")));
        assert!(link(ends(".htm")));
        assert!(!link(ends(".html")));

        let alt = Test::Attribute { tag: tag("img"), name: tag("alt") };
        assert!(!axis(PointOfView::Itself, alt).evaluate(img));
    }

    #[test]
    fn test_variable() {
        let doc = Document::parse_str(TOPIC, DEFAULT_LANGUAGE).unwrap();
        let li = doc.root().descendant_where("li", |n| n.position() == 2);
        let variable = |name: &str| axis(PointOfView::Child, Test::Variable { name: tag(name) });
        assert!(variable("Product.Name").evaluate(li));
        assert!(!variable("Product.Version").evaluate(li));
    }

    #[test]
    fn test_standalone_predicates() {
        let source = r#"<html
  xmlns:MadCap="http://www.madcapsoftware.com/Schemas/MadCap.xsd"
  xml:lang="fr-FR">
  <p MadCap:conditions="Default.PrintOnly">Bonjour</p>
  <MadCap:snippetText src="../Snippets/Name.flsnp" />
</html>"#;
        let doc = Document::parse_str(source, DEFAULT_LANGUAGE).unwrap();
        let p = doc.root().child("p");
        let snippet = doc.root().child("MadCap:snippetText");

        let print_only = Predicate::new(PredicateKind::Condition(tag("Default.PrintOnly")));
        assert!(print_only.evaluate(p));
        assert!(!print_only.evaluate(snippet));
        assert!(Predicate::new(PredicateKind::Language(tag("fr"))).evaluate(p));
        assert!(!Predicate::new(PredicateKind::Language(tag("en"))).evaluate(p));
        let name_snippet = Predicate::new(PredicateKind::Snippet(tag("../Snippets/Name.flsnp")));
        assert!(name_snippet.evaluate(snippet));
        assert!(!Predicate::new(PredicateKind::Fail).evaluate(p));
        assert!(Predicate::new(PredicateKind::Fail).negate().evaluate(p));
    }

    #[test]
    fn test_display() {
        let predicate = axis(
            PointOfView::Itself,
            Test::AttributeEquals {
                tag: tag("img"),
                name: tag("src"),
                text: tag("a\\b.png"),
            },
        )
        .negate();
        assert_eq!(
            predicate.to_string(),
            r#"not self-attribute-equals img src "a\\b.png""#
        );
        assert_eq!(
            axis(PointOfView::Descendant, Test::Exists { tag: tag("*") }).to_string(),
            "descendant *"
        );
        assert_eq!(
            axis(PointOfView::Before, Test::Position { tag: tag("li"), position: 2 }).to_string(),
            "before-position li 2"
        );
        assert_eq!(
            Predicate::new(PredicateKind::Snippet(tag("a.flsnp"))).to_string(),
            r#"snippet "a.flsnp""#
        );
    }
}
