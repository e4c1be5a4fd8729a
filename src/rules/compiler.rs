//! Recursive-descent compiler for rule files
//!
//! ```text
//! rule-file       := [comment-section] type-section extensions-section
//!                    when-section+ test-section+ message-section
//! type-section    := "rule:" name            ; error | warning
//! extensions      := "extensions:" name*
//! when-section    := "when:" expression-line*
//! test-section    := "test:" expression-line*
//! expression-line := term ("and" term)*
//! term            := ["not"] predicate
//! message-section := "message:" text up to end of file
//! ```

use super::predicate::{PointOfView, Predicate, PredicateKind, Test};
use super::tokenizer::{unquote, Token, TokenKind, Tokenizer};
use super::{Expression, Rule};
use crate::diagnostics::Severity;
use thiserror::Error;

const COMMENT: &str = "comment:";
const RULE: &str = "rule:";
const EXTENSIONS: &str = "extensions:";
const WHEN: &str = "when:";
const TEST: &str = "test:";
const MESSAGE: &str = "message:";

/// A rule file that cannot be compiled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}, line {line}: {kind}")]
pub struct CompileError {
    /// Rule file name
    pub file: String,
    /// 1-based line of the offending token
    pub line: usize,
    pub kind: CompileErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    #[error("expected section '{expected}' but found {found}")]
    ExpectedSection { expected: &'static str, found: String },
    #[error("'{context}' expects a tag name or * but found {found}")]
    ExpectedTag { context: String, found: String },
    #[error("'{context}' expects a name but found {found}")]
    ExpectedName { context: String, found: String },
    #[error("'{context}' expects a number but found {found}")]
    ExpectedNumber { context: String, found: String },
    #[error("'{context}' expects a quoted string but found {found}")]
    ExpectedQuote { context: String, found: String },
    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),
    #[error("rule type must be 'error' or 'warning' but found '{0}'")]
    UnknownRuleType(String),
    #[error("'message:' must be the last section but found {0}")]
    SectionInMessage(String),
    #[error("section '{0}' has no expressions")]
    EmptyExpression(&'static str),
}

/// Compile the text of one rule file
///
/// `file` identifies the rule in diagnostics and lint results.
pub fn compile(file: &str, source: &str) -> Result<Rule, CompileError> {
    Compiler {
        file,
        tokens: Tokenizer::new(source),
    }
    .rule()
}

struct Compiler<'a> {
    file: &'a str,
    tokens: Tokenizer<'a>,
}

impl Compiler<'_> {
    fn token(&self) -> &Token {
        self.tokens.current()
    }

    fn error_at(&self, line: usize, kind: CompileErrorKind) -> CompileError {
        CompileError {
            file: self.file.to_string(),
            line,
            kind,
        }
    }

    fn error(&self, kind: CompileErrorKind) -> CompileError {
        self.error_at(self.token().line, kind)
    }

    fn rule(mut self) -> Result<Rule, CompileError> {
        let description = self.comment();
        let severity = self.rule_type()?;
        let extensions = self.extensions()?;
        let condition = self.expression_section(WHEN)?;
        let test = self.expression_section(TEST)?;
        let message = self.message()?;

        Ok(Rule {
            source: self.file.to_string(),
            description,
            severity,
            extensions,
            condition,
            test,
            message,
        })
    }

    /// Check for a section header without consuming it
    fn expect_section(&mut self, header: &'static str) -> Result<(), CompileError> {
        self.tokens.skip_blank();
        if self.token().is_section(header) {
            Ok(())
        } else {
            Err(self.error(CompileErrorKind::ExpectedSection {
                expected: header,
                found: self.token().to_string(),
            }))
        }
    }

    /// Collect raw token text up to the next section
    fn text_until_section(&mut self) -> String {
        let mut text = String::new();
        while !matches!(self.token().kind, TokenKind::Section | TokenKind::End) {
            text.push_str(&self.token().value);
            self.tokens.advance();
        }
        text.trim().to_string()
    }

    fn comment(&mut self) -> Option<String> {
        self.tokens.skip_blank();
        if !self.token().is_section(COMMENT) {
            return None;
        }
        self.tokens.advance();
        Some(self.text_until_section()).filter(|text| !text.is_empty())
    }

    fn rule_type(&mut self) -> Result<Severity, CompileError> {
        self.expect_section(RULE)?;
        self.tokens.advance();
        let line = {
            self.tokens.skip_blank();
            self.token().line
        };
        let name = self.name(RULE)?;
        name.parse()
            .map_err(|found| self.error_at(line, CompileErrorKind::UnknownRuleType(found)))
    }

    fn extensions(&mut self) -> Result<Vec<String>, CompileError> {
        self.expect_section(EXTENSIONS)?;
        self.tokens.advance();
        self.tokens.skip_blank();

        let mut extensions = Vec::new();
        while self.token().kind == TokenKind::Name {
            extensions.push(self.token().value.clone());
            self.tokens.advance();
            self.tokens.skip_blank();
        }
        Ok(extensions)
    }

    /// Compile every repetition of a `when:` or `test:` section
    fn expression_section(&mut self, header: &'static str) -> Result<Expression, CompileError> {
        self.expect_section(header)?;

        let mut lines = Vec::new();
        while self.token().is_section(header) {
            self.tokens.advance();
            self.tokens.skip_blank();
            while self.token().kind == TokenKind::Name {
                lines.push(self.expression_line()?);
            }
        }

        if lines.is_empty() {
            return Err(self.error(CompileErrorKind::EmptyExpression(header)));
        }
        Ok(Expression::new(lines))
    }

    fn expression_line(&mut self) -> Result<Vec<Predicate>, CompileError> {
        let mut terms = vec![self.term()?];
        self.tokens.skip_blank();
        while self.token().kind == TokenKind::Name && self.token().value == "and" {
            self.tokens.advance();
            terms.push(self.term()?);
            self.tokens.skip_blank();
        }
        Ok(terms)
    }

    fn term(&mut self) -> Result<Predicate, CompileError> {
        self.tokens.skip_blank();
        if self.token().kind == TokenKind::Name && self.token().value == "not" {
            self.tokens.advance();
            Ok(self.predicate()?.negate())
        } else {
            self.predicate()
        }
    }

    fn predicate(&mut self) -> Result<Predicate, CompileError> {
        self.tokens.skip_blank();
        let name = self.token().value.clone();
        let line = self.token().line;
        self.tokens.advance();

        let (view, sub) = name.split_once('-').unwrap_or((name.as_str(), ""));
        let kind = match PointOfView::from_keyword(view) {
            Some(view) => PredicateKind::Axis {
                view,
                test: self.test(&name, sub, line)?,
            },
            None => match name.as_str() {
                "condition" => PredicateKind::Condition(self.name(&name)?),
                "fail" => PredicateKind::Fail,
                "language" => PredicateKind::Language(self.name(&name)?),
                "snippet" => PredicateKind::Snippet(self.quote(&name)?),
                _ => return Err(self.error_at(line, CompileErrorKind::UnknownPredicate(name))),
            },
        };
        Ok(Predicate::new(kind))
    }

    /// Compile a sub-predicate and its arguments
    fn test(&mut self, predicate: &str, sub: &str, line: usize) -> Result<Test, CompileError> {
        let test = match sub {
            "" => Test::Exists { tag: self.tag(predicate)? },
            "style" => Test::Style { spec: self.tag(predicate)? },
            "empty" => Test::Empty { tag: self.tag(predicate)? },
            "position" => Test::Position {
                tag: self.tag(predicate)?,
                position: self.number(predicate)?,
            },
            "first" => Test::First { tag: self.tag(predicate)? },
            "last" => Test::Last { tag: self.tag(predicate)? },
            "padding" => Test::Padding { tag: self.tag(predicate)? },
            "contains" => Test::Contains {
                tag: self.tag(predicate)?,
                text: self.quote(predicate)?,
            },
            "text" => Test::Text {
                tag: self.tag(predicate)?,
                text: self.quote(predicate)?,
            },
            "ends" => Test::Ends {
                tag: self.tag(predicate)?,
                text: self.quote(predicate)?,
            },
            "begins" => Test::Begins {
                tag: self.tag(predicate)?,
                text: self.quote(predicate)?,
            },
            "attribute" => Test::Attribute {
                tag: self.tag(predicate)?,
                name: self.name(predicate)?,
            },
            "attribute-equals" => Test::AttributeEquals {
                tag: self.tag(predicate)?,
                name: self.name(predicate)?,
                text: self.quote(predicate)?,
            },
            "attribute-contains" => Test::AttributeContains {
                tag: self.tag(predicate)?,
                name: self.name(predicate)?,
                text: self.quote(predicate)?,
            },
            "attribute-ends" => Test::AttributeEnds {
                tag: self.tag(predicate)?,
                name: self.name(predicate)?,
                text: self.quote(predicate)?,
            },
            "variable" => Test::Variable {
                name: self.name(predicate)?,
            },
            _ => {
                let kind = CompileErrorKind::UnknownPredicate(predicate.to_string());
                return Err(self.error_at(line, kind));
            }
        };
        Ok(test)
    }

    /// Read an argument token of one of the given kinds
    fn argument(
        &mut self,
        accept: &[TokenKind],
        expected: impl FnOnce(String) -> CompileErrorKind,
    ) -> Result<String, CompileError> {
        self.tokens.skip_blank();
        if accept.contains(&self.token().kind) {
            let value = self.token().value.clone();
            self.tokens.advance();
            Ok(value)
        } else {
            Err(self.error(expected(self.token().to_string())))
        }
    }

    fn tag(&mut self, context: &str) -> Result<String, CompileError> {
        self.argument(&[TokenKind::Name, TokenKind::Wildcard], |found| {
            CompileErrorKind::ExpectedTag {
                context: context.to_string(),
                found,
            }
        })
    }

    fn name(&mut self, context: &str) -> Result<String, CompileError> {
        self.argument(&[TokenKind::Name], |found| CompileErrorKind::ExpectedName {
            context: context.to_string(),
            found,
        })
    }

    fn number(&mut self, context: &str) -> Result<usize, CompileError> {
        let line = {
            self.tokens.skip_blank();
            self.token().line
        };
        let digits = self.argument(&[TokenKind::Number], |found| CompileErrorKind::ExpectedNumber {
            context: context.to_string(),
            found,
        })?;
        digits.parse().map_err(|_| {
            self.error_at(
                line,
                CompileErrorKind::ExpectedNumber {
                    context: context.to_string(),
                    found: format!("'{digits}'"),
                },
            )
        })
    }

    fn quote(&mut self, context: &str) -> Result<String, CompileError> {
        let quoted = self.argument(&[TokenKind::Quote], |found| CompileErrorKind::ExpectedQuote {
            context: context.to_string(),
            found,
        })?;
        Ok(unquote(&quoted))
    }

    fn message(&mut self) -> Result<String, CompileError> {
        self.expect_section(MESSAGE)?;
        self.tokens.advance();
        self.tokens.skip_blank();

        let message = self.text_until_section();
        if self.token().kind == TokenKind::Section {
            return Err(self.error(CompileErrorKind::SectionInMessage(self.token().to_string())));
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup;
    use pretty_assertions::assert_eq;

    fn axis(view: PointOfView, test: Test) -> Predicate {
        Predicate::new(PredicateKind::Axis { view, test })
    }

    fn compile_err(source: &str) -> CompileError {
        compile("test_rule.txt", source).unwrap_err()
    }

    /// Rule source with the given `when:` text and placeholder sections
    fn with_when(when: &str) -> String {
        format!("rule: error\nextensions: htm\nwhen: {when}\ntest: fail\nmessage: m")
    }

    const LIST_RULE: &str = r#"comment:
  List items need content. Images, snippets and variables count.

rule: error

extensions: htm flsnp

when: self-empty li

test: descendant img
      descendant iframe
test: descendant MadCap:snippetText
      descendant MadCap:variable

message: A *list item* must not be empty. Remove the `li` or add text.
"#;

    #[test]
    fn test_compile_full_rule() {
        let rule = compile("list_emptyitem_rule.txt", LIST_RULE).unwrap();
        assert_eq!(rule.source, "list_emptyitem_rule.txt");
        assert_eq!(
            rule.description.as_deref(),
            Some("List items need content. Images, snippets and variables count.")
        );
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.extensions, vec!["htm", "flsnp"]);
        assert_eq!(
            rule.condition.lines(),
            &[vec![axis(PointOfView::Itself, Test::Empty { tag: "li".to_string() })]]
        );
        let tags: Vec<String> = rule
            .test
            .lines()
            .iter()
            .map(|line| line[0].to_string())
            .collect();
        assert_eq!(
            tags,
            vec![
                "descendant img",
                "descendant iframe",
                "descendant MadCap:snippetText",
                "descendant MadCap:variable",
            ]
        );
        assert_eq!(
            rule.message,
            "A *list item* must not be empty. Remove the `li` or add text."
        );
    }

    #[test]
    fn test_and_not_and_arguments() {
        let source = r#"rule: warning
extensions: htm
when: self p and not parent-style li.Step
      and child-attribute-equals a href "x\\y.htm"
test: self-position p 3 and self-contains * "a\nb"
      condition Default.Print and language fr and snippet "s.flsnp" and fail
message: Check it.
"#;
        let rule = compile("r.txt", source).unwrap();
        assert_eq!(rule.severity, Severity::Warning);
        assert_eq!(rule.condition.lines().len(), 1);
        assert_eq!(
            rule.condition.lines()[0],
            vec![
                axis(PointOfView::Itself, Test::Exists { tag: "p".to_string() }),
                axis(PointOfView::Parent, Test::Style { spec: "li.Step".to_string() }).negate(),
                axis(
                    PointOfView::Child,
                    Test::AttributeEquals {
                        tag: "a".to_string(),
                        name: "href".to_string(),
                        text: "x\\y.htm".to_string(),
                    }
                ),
            ]
        );
        assert_eq!(
            rule.test.lines()[0],
            vec![
                axis(PointOfView::Itself, Test::Position { tag: "p".to_string(), position: 3 }),
                axis(
                    PointOfView::Itself,
                    Test::Contains { tag: "*".to_string(), text: "a\nb".to_string() }
                ),
            ]
        );
        assert_eq!(
            rule.test.lines()[1],
            vec![
                Predicate::new(PredicateKind::Condition("Default.Print".to_string())),
                Predicate::new(PredicateKind::Language("fr".to_string())),
                Predicate::new(PredicateKind::Snippet("s.flsnp".to_string())),
                Predicate::new(PredicateKind::Fail),
            ]
        );
    }

    #[test]
    fn test_every_sub_predicate_compiles() {
        let lines = [
            "after-style .Note",
            "ancestor-first table",
            "before-last tr",
            "child-padding p",
            "descendant-text p \"x\"",
            "next-ends p \".\"",
            "parent-begins p \"Note\"",
            "previous-attribute img alt",
            "self-attribute-contains a href \"http\"",
            "self-attribute-ends a href \".htm\"",
            "child-variable General.Company",
        ];
        let source = with_when(&lines.join("\n  "));
        let rule = compile("all_rule.txt", &source).unwrap();
        let compiled: Vec<String> = rule
            .condition
            .lines()
            .iter()
            .map(|l| l[0].to_string())
            .collect();
        assert_eq!(compiled, lines);
    }

    #[test]
    fn test_repeated_when_sections() {
        let source = with_when("self h1\nwhen: self h2");
        let rule = compile("r.txt", &source).unwrap();
        assert_eq!(rule.condition.lines().len(), 2);
    }

    #[test]
    fn test_message_keeps_quotes_and_lines() {
        let source = "rule: error\nextensions: htm\nwhen: self h1\ntest: fail\n\
                      message:\n  Say \"hi\"\n  twice.\n\n";
        let rule = compile("r.txt", source).unwrap();
        assert_eq!(rule.message, "Say \"hi\"\n  twice.");
    }

    #[test]
    fn test_message_escapes_survive_compilation() {
        let source = "rule: error\nextensions: htm\nwhen: self p\ntest: fail\n\
                      message: Use \\*stars\\* and \\`ticks\\` in *a\\\\b*.\n";
        let rule = compile("r.txt", source).unwrap();
        assert_eq!(rule.message, r"Use \*stars\* and \`ticks\` in *a\\b*.");
        assert_eq!(
            markup::to_source(&markup::parse(&rule.message)),
            r"Use *stars* and `ticks` in *a\b*."
        );
    }

    #[test]
    fn test_missing_message_section() {
        let err = compile_err("rule: error\nextensions: htm\nwhen: self h1\ntest: self-first h1\n");
        assert_eq!(err.file, "test_rule.txt");
        assert_eq!(
            err.kind,
            CompileErrorKind::ExpectedSection {
                expected: "message:",
                found: "end of file".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "test_rule.txt, line 4: expected section 'message:' but found end of file"
        );
    }

    #[test]
    fn test_missing_rule_section() {
        let err = compile_err("extensions: htm\n");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, CompileErrorKind::ExpectedSection { expected: "rule:", .. }));
    }

    #[test]
    fn test_unknown_rule_type() {
        let err = compile_err("rule: fatal\n");
        assert_eq!(err.kind, CompileErrorKind::UnknownRuleType("fatal".to_string()));
    }

    #[test]
    fn test_unknown_predicate() {
        let err = compile_err(&with_when("sibling p"));
        assert_eq!(err.kind, CompileErrorKind::UnknownPredicate("sibling".to_string()));
        assert_eq!(err.line, 3);

        let err = compile_err(&with_when("self-bold p"));
        assert_eq!(err.kind, CompileErrorKind::UnknownPredicate("self-bold".to_string()));
    }

    #[test]
    fn test_wrong_argument_kinds() {
        let err = compile_err(&with_when("self \"p\""));
        assert!(matches!(err.kind, CompileErrorKind::ExpectedTag { .. }));

        let err = compile_err(&with_when("self-position p first"));
        assert_eq!(
            err.kind,
            CompileErrorKind::ExpectedNumber {
                context: "self-position".to_string(),
                found: "'first'".to_string(),
            }
        );

        let err = compile_err(&with_when("self-contains p Note"));
        assert!(matches!(err.kind, CompileErrorKind::ExpectedQuote { .. }));

        let err = compile_err(&with_when("self-attribute p *"));
        assert!(matches!(err.kind, CompileErrorKind::ExpectedName { .. }));
    }

    #[test]
    fn test_empty_expression_section() {
        let err = compile_err("rule: error\nextensions: htm\nwhen:\ntest: fail\nmessage: m");
        assert_eq!(err.kind, CompileErrorKind::EmptyExpression("when:"));
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_section_inside_message() {
        let err = compile_err(&format!("{}\nNote: more", with_when("self p")));
        assert_eq!(err.kind, CompileErrorKind::SectionInMessage("'Note:'".to_string()));
        assert_eq!(err.line, 6);
    }

    #[test]
    fn test_bom_is_ignored() {
        let source = "\u{feff}rule: error\nextensions: htm\nwhen: self h1\ntest: fail\nmessage: m";
        assert!(compile("r.txt", source).is_ok());
    }
}
