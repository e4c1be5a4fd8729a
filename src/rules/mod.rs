//! Rule definitions and the rule-file language

pub mod compiler;
pub mod predicate;
pub mod tokenizer;

pub use compiler::{compile, CompileError, CompileErrorKind};
pub use predicate::{PointOfView, Predicate, PredicateKind, Test};

use crate::diagnostics::{Severity, Violation};
use crate::node::Node;
use std::fmt;
use std::path::Path;

/// Predicates that must all hold
pub type Conjunction = Vec<Predicate>;

/// Expression lines of a `when:` or `test:` section; holds when any line holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    lines: Vec<Conjunction>,
}

impl Expression {
    pub fn new(lines: Vec<Conjunction>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[Conjunction] {
        &self.lines
    }

    /// Evaluate the expression against a node
    pub fn evaluate(&self, node: Node<'_>) -> bool {
        self.lines
            .iter()
            .any(|line| line.iter().all(|predicate| predicate.evaluate(node)))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            for (j, predicate) in line.iter().enumerate() {
                if j > 0 {
                    f.write_str(" and ")?;
                }
                write!(f, "{predicate}")?;
            }
        }
        Ok(())
    }
}

/// A compiled rule file
#[derive(Debug, Clone)]
pub struct Rule {
    /// Rule file name
    pub source: String,
    /// Text of the `comment:` section
    pub description: Option<String>,
    pub severity: Severity,
    /// File extensions the rule applies to, without the dot
    pub extensions: Vec<String>,
    /// Which nodes the rule is about
    pub condition: Expression,
    /// What those nodes must satisfy
    pub test: Expression,
    /// Message, with `*bold*` and `` `code` `` markup
    pub message: String,
}

impl Rule {
    /// Check a node; a violation is reported when the condition holds and the test does not
    pub fn apply<'a>(&self, path: &Path, node: Node<'a>) -> Option<Violation<'a>> {
        if self.condition.evaluate(node) && !self.test.evaluate(node) {
            Some(Violation::new(path, &self.source, self.severity, node, &self.message))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DEFAULT_LANGUAGE};
    use crate::node::EMPTY;

    const H1_FIRST: &str = "rule: error
extensions: htm
when: self h1
test: self-first h1
message: must be first
";

    #[test]
    fn test_h1_not_first_is_violation() {
        let rule = compile("h1_first_rule.txt", H1_FIRST).unwrap();
        let source = "<body><p>Intro</p><h1>Title</h1></body>";
        let doc = Document::parse_str(source, DEFAULT_LANGUAGE).unwrap();
        let h1 = doc.root().child("h1");

        let violation = rule.apply(Path::new("Content/topic.htm"), h1).unwrap();
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.message, "must be first");
        assert_eq!(violation.source, "h1_first_rule.txt");
        assert_eq!(violation.node, h1);
        assert_eq!(violation.path, Path::new("Content/topic.htm"));
    }

    #[test]
    fn test_h1_first_is_not_violation() {
        let rule = compile("h1_first_rule.txt", H1_FIRST).unwrap();
        let source = "<body><h1>Title</h1><p>Intro</p></body>";
        let doc = Document::parse_str(source, DEFAULT_LANGUAGE).unwrap();
        let path = Path::new("Content/topic.htm");

        assert!(doc.nodes().all(|node| rule.apply(path, node).is_none()));
    }

    #[test]
    fn test_condition_false_means_no_violation() {
        let rule = compile("h1_first_rule.txt", H1_FIRST).unwrap();
        assert!(rule.apply(Path::new("a.htm"), EMPTY).is_none());
    }

    #[test]
    fn test_empty_list_item() {
        let source = "rule: error
extensions: htm
when: self-empty li
test: descendant img
      descendant iframe
      descendant MadCap:snippetText
      descendant MadCap:variable
message: List items must not be empty.
";
        let rule = compile("list_emptyitem_rule.txt", source).unwrap();
        let doc = Document::parse_str("<ul><li>Item</li><li></li></ul>", DEFAULT_LANGUAGE).unwrap();
        let path = Path::new("a.htm");

        let flagged: Vec<_> = doc
            .nodes()
            .filter_map(|node| rule.apply(path, node))
            .collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].node, doc.root().child_where("li", |n| n.position() == 1));
    }

    #[test]
    fn test_empty_list_item_with_image_is_accepted() {
        let source = "rule: error
extensions: htm
when: self-empty li
test: descendant img
message: List items must not be empty.
";
        let rule = compile("list_emptyitem_rule.txt", source).unwrap();
        let topic = r#"<ul><li><img src="a.png"/></li></ul>"#;
        let doc = Document::parse_str(topic, DEFAULT_LANGUAGE).unwrap();
        assert!(doc.nodes().all(|node| rule.apply(Path::new("a.htm"), node).is_none()));
    }

    #[test]
    fn test_expression_display() {
        let source = "rule: error\nextensions: htm\nwhen: self p and not child b\n  self h1\n\
                      test: fail\nmessage: m";
        let rule = compile("r.txt", source).unwrap();
        assert_eq!(rule.condition.to_string(), "self p and not child b\nself h1");
        assert_eq!(rule.test.to_string(), "fail");
    }
}
