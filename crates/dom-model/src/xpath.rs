//! XPath 1.0 subset, enough to evaluate recorder locators.
//!
//! Supported: absolute, descendant and relative location paths; the child,
//! descendant-or-self, self, parent and attribute axes (abbreviated syntax
//! only); name tests, `*`, `node()` and `text()`; predicates combining
//! positions, `=`/`!=`, `and`/`or` and the functions `normalize-space`,
//! `string`, `contains`, `starts-with`, `concat`, `position`, `last`,
//! `not` and `count`. Paths never enter shadow trees.

use std::collections::HashSet;

use crate::errors::DomError;
use crate::node::{NodeId, NodeKind};
use crate::page::{normalize_space, Page};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    At,
    Star,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Eq,
    NotEq,
    Name(String),
    Literal(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Attribute,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    AnyNode,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare {
        left: Box<Expr>,
        right: Box<Expr>,
        negate: bool,
    },
    Literal(String),
    Number(f64),
    Path(LocationPath),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum XNode {
    Node(NodeId),
    Attr(NodeId, usize),
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<XNode>),
    Str(String),
    Num(f64),
    Bool(bool),
}

/// Evaluates `expr` and returns the matched nodes in tree order.
pub fn evaluate(page: &Page, expr: &str, context: NodeId) -> Result<Vec<NodeId>, DomError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        source: expr,
    };
    let ast = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        return Err(DomError::xpath(expr, "unexpected trailing tokens"));
    }
    let evaluator = Evaluator { page };
    let value = evaluator.eval(&ast, XNode::Node(context), 1, 1);
    let Value::Nodes(nodes) = value else {
        return Err(DomError::xpath(expr, "expression does not select nodes"));
    };
    let mut ids: Vec<NodeId> = nodes
        .into_iter()
        .filter_map(|node| match node {
            XNode::Node(id) => Some(id),
            XNode::Attr(..) => None,
        })
        .collect();
    if ids.len() > 1 {
        ids.sort_by_cached_key(|id| page.order_key(*id));
    }
    Ok(ids)
}

fn tokenize(expr: &str) -> Result<Vec<Token>, DomError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '.' if chars.get(i + 1).map(|n| n.is_ascii_digit()) == Some(true) => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse()
                    .map_err(|_| DomError::xpath(expr, format!("bad number '{text}'")))?;
                tokens.push(Token::Number(number));
            }
            '.' => {
                if chars.get(i + 1) == Some(&'.') {
                    tokens.push(Token::DoubleDot);
                    i += 2;
                } else {
                    tokens.push(Token::Dot);
                    i += 1;
                }
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|ch| *ch == c)
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| DomError::xpath(expr, "unterminated string literal"))?;
                tokens.push(Token::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse()
                    .map_err(|_| DomError::xpath(expr, format!("bad number '{text}'")))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '-' | ':'))
                {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => {
                return Err(DomError::xpath(expr, format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), DomError> {
        match self.advance() {
            Some(token) if *token == expected => Ok(()),
            other => Err(self.error(format!("expected {expected:?}, found {other:?}"))),
        }
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::xpath(self.source, reason)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(name)) if name == word)
    }

    fn parse_expr(&mut self) -> Result<Expr, DomError> {
        let mut left = self.parse_and()?;
        while self.is_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, DomError> {
        let mut left = self.parse_compare()?;
        while self.is_keyword("and") {
            self.pos += 1;
            let right = self.parse_compare()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> Result<Expr, DomError> {
        let left = self.parse_primary()?;
        let negate = match self.peek() {
            Some(Token::Eq) => false,
            Some(Token::NotEq) => true,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_primary()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            negate,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, DomError> {
        match self.peek().cloned() {
            Some(Token::Literal(text)) => {
                self.pos += 1;
                Ok(Expr::Literal(text))
            }
            Some(Token::Number(number)) => {
                self.pos += 1;
                Ok(Expr::Number(number))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name))
                if self.peek_at(1) == Some(&Token::LParen) && name != "text" && name != "node" =>
            {
                self.pos += 2;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.pos += 1;
                            continue;
                        }
                        break;
                    }
                }
                self.expect(Token::RParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(_) => Ok(Expr::Path(self.parse_path()?)),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_path(&mut self) -> Result<LocationPath, DomError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.starts_step() {
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    steps.push(self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }
        Ok(LocationPath { absolute, steps })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_)) | Some(Token::Star) | Some(Token::At) | Some(Token::Dot) | Some(Token::DoubleDot)
        )
    }

    fn parse_step(&mut self) -> Result<Step, DomError> {
        let (axis, test) = match self.advance().cloned() {
            Some(Token::Dot) => (Axis::SelfAxis, NodeTest::AnyNode),
            Some(Token::DoubleDot) => (Axis::Parent, NodeTest::AnyNode),
            Some(Token::At) => match self.advance().cloned() {
                Some(Token::Name(name)) => (Axis::Attribute, NodeTest::Name(name)),
                Some(Token::Star) => (Axis::Attribute, NodeTest::AnyElement),
                other => return Err(self.error(format!("bad attribute test {other:?}"))),
            },
            Some(Token::Star) => (Axis::Child, NodeTest::AnyElement),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.expect(Token::RParen)?;
                    match name.as_str() {
                        "text" => (Axis::Child, NodeTest::Text),
                        "node" => (Axis::Child, NodeTest::AnyNode),
                        other => return Err(self.error(format!("unsupported node test {other}()"))),
                    }
                } else {
                    (Axis::Child, NodeTest::Name(name.to_ascii_lowercase()))
                }
            }
            other => return Err(self.error(format!("expected a step, found {other:?}"))),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            predicates.push(self.parse_expr()?);
            self.expect(Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

struct Evaluator<'p> {
    page: &'p Page,
}

impl<'p> Evaluator<'p> {
    fn eval(&self, expr: &Expr, context: XNode, position: usize, size: usize) -> Value {
        match expr {
            Expr::Literal(text) => Value::Str(text.clone()),
            Expr::Number(number) => Value::Num(*number),
            Expr::Or(left, right) => Value::Bool(
                self.boolean(&self.eval(left, context, position, size))
                    || self.boolean(&self.eval(right, context, position, size)),
            ),
            Expr::And(left, right) => Value::Bool(
                self.boolean(&self.eval(left, context, position, size))
                    && self.boolean(&self.eval(right, context, position, size)),
            ),
            Expr::Compare {
                left,
                right,
                negate,
            } => {
                let left = self.eval(left, context, position, size);
                let right = self.eval(right, context, position, size);
                Value::Bool(self.compare(&left, &right, *negate))
            }
            Expr::Path(path) => Value::Nodes(self.eval_path(path, context)),
            Expr::Call(name, args) => self.call(name, args, context, position, size),
        }
    }

    fn call(&self, name: &str, args: &[Expr], context: XNode, position: usize, size: usize) -> Value {
        let arg_string = |index: usize| -> String {
            match args.get(index) {
                Some(arg) => self.string(&self.eval(arg, context, position, size)),
                None => self.string_value(context),
            }
        };
        match name {
            "normalize-space" => Value::Str(normalize_space(&arg_string(0))),
            "string" => Value::Str(arg_string(0)),
            "contains" => Value::Bool(arg_string(0).contains(&arg_string(1))),
            "starts-with" => Value::Bool(arg_string(0).starts_with(&arg_string(1))),
            "concat" => Value::Str(
                args.iter()
                    .map(|arg| self.string(&self.eval(arg, context, position, size)))
                    .collect(),
            ),
            "position" => Value::Num(position as f64),
            "last" => Value::Num(size as f64),
            "not" => Value::Bool(
                !args
                    .first()
                    .map(|arg| self.boolean(&self.eval(arg, context, position, size)))
                    .unwrap_or(false),
            ),
            "count" => match args.first().map(|arg| self.eval(arg, context, position, size)) {
                Some(Value::Nodes(nodes)) => Value::Num(nodes.len() as f64),
                _ => Value::Num(0.0),
            },
            _ => Value::Bool(false),
        }
    }

    fn eval_path(&self, path: &LocationPath, context: XNode) -> Vec<XNode> {
        let mut current = if path.absolute {
            match context {
                XNode::Node(id) | XNode::Attr(id, _) => vec![XNode::Node(self.page.root_node(id))],
            }
        } else {
            vec![context]
        };
        for step in &path.steps {
            let mut next = Vec::new();
            let mut seen = HashSet::new();
            for node in &current {
                for candidate in self.apply_step(step, *node) {
                    if seen.insert(candidate) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }
        current
    }

    fn apply_step(&self, step: &Step, context: XNode) -> Vec<XNode> {
        let XNode::Node(id) = context else {
            return Vec::new();
        };
        let mut candidates: Vec<XNode> = match step.axis {
            Axis::Child => self
                .page
                .children(id)
                .iter()
                .copied()
                .filter(|child| self.matches(&step.test, *child))
                .map(XNode::Node)
                .collect(),
            Axis::DescendantOrSelf => {
                let mut out = Vec::new();
                let mut stack = vec![id];
                while let Some(node) = stack.pop() {
                    if self.matches(&step.test, node) {
                        out.push(XNode::Node(node));
                    }
                    stack.extend(self.page.children(node).iter().rev().copied());
                }
                out
            }
            Axis::SelfAxis => {
                if self.matches(&step.test, id) {
                    vec![XNode::Node(id)]
                } else {
                    Vec::new()
                }
            }
            Axis::Parent => self
                .page
                .parent(id)
                .filter(|parent| self.matches(&step.test, *parent))
                .map(XNode::Node)
                .into_iter()
                .collect(),
            Axis::Attribute => match self.page.element(id) {
                Some(data) => data
                    .attrs()
                    .iter()
                    .enumerate()
                    .filter(|(_, (key, _))| match &step.test {
                        NodeTest::Name(name) => key.eq_ignore_ascii_case(name),
                        _ => true,
                    })
                    .map(|(index, _)| XNode::Attr(id, index))
                    .collect(),
                None => Vec::new(),
            },
        };

        for predicate in &step.predicates {
            let size = candidates.len();
            candidates = candidates
                .into_iter()
                .enumerate()
                .filter(|(index, node)| {
                    let value = self.eval(predicate, *node, index + 1, size);
                    match value {
                        Value::Num(n) => (n - (index + 1) as f64).abs() < f64::EPSILON,
                        other => self.boolean(&other),
                    }
                })
                .map(|(_, node)| node)
                .collect();
        }
        candidates
    }

    fn matches(&self, test: &NodeTest, id: NodeId) -> bool {
        match (test, self.page.kind(id)) {
            (NodeTest::AnyNode, _) => true,
            (NodeTest::Text, NodeKind::Text(_)) => true,
            (NodeTest::AnyElement, NodeKind::Element(_)) => true,
            (NodeTest::Name(name), NodeKind::Element(data)) => data.tag() == name,
            _ => false,
        }
    }

    fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Node(id) => self.page.text_content(id),
            XNode::Attr(id, index) => self
                .page
                .element(id)
                .and_then(|data| data.attrs().get(index))
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Str(text) => text.clone(),
            Value::Num(number) => {
                if number.fract() == 0.0 {
                    format!("{}", *number as i64)
                } else {
                    number.to_string()
                }
            }
            Value::Bool(flag) => flag.to_string(),
            Value::Nodes(nodes) => nodes
                .first()
                .map(|node| self.string_value(*node))
                .unwrap_or_default(),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Bool(flag) => *flag,
            Value::Num(number) => *number != 0.0 && !number.is_nan(),
            Value::Str(text) => !text.is_empty(),
            Value::Nodes(nodes) => !nodes.is_empty(),
        }
    }

    fn compare(&self, left: &Value, right: &Value, negate: bool) -> bool {
        let check = |a: &str, b: &str| (a == b) != negate;
        match (left, right) {
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|x| {
                let x = self.string_value(*x);
                b.iter().any(|y| check(&x, &self.string_value(*y)))
            }),
            (Value::Nodes(nodes), other) | (other, Value::Nodes(nodes)) => match other {
                Value::Bool(flag) => (!nodes.is_empty() == *flag) != negate,
                Value::Num(number) => nodes.iter().any(|node| {
                    let parsed = self.string_value(*node).trim().parse::<f64>().ok();
                    (parsed == Some(*number)) != negate
                }),
                _ => {
                    let target = self.string(other);
                    nodes
                        .iter()
                        .any(|node| check(&self.string_value(*node), &target))
                }
            },
            (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                (self.boolean(left) == self.boolean(right)) != negate
            }
            (Value::Num(a), Value::Num(b)) => (a == b) != negate,
            _ => check(&self.string(left), &self.string(right)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> Page {
        Page::parse(
            r#"<html><body>
                <div id="main">
                  <button id="submit" class="btn">Go</button>
                  <button data-testid="cancel">  Cancel
                    now </button>
                  <ul><li>a</li><li>b</li></ul>
                  <ul><li>c</li></ul>
                </div>
                <x-host><template shadowrootmode="open"><button id="inner">In</button></template></x-host>
              </body></html>"#,
            "https://a.example/",
        )
        .unwrap()
    }

    fn texts(page: &Page, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| page.text_content(*id).trim().to_string())
            .collect()
    }

    #[test]
    fn attribute_predicate_with_tag() {
        let page = page();
        let doc = page.document(page.top_window());
        let hits = evaluate(&page, r#"//button[@id="submit"]"#, doc).unwrap();
        assert_eq!(texts(&page, &hits), vec!["Go"]);
        let none = evaluate(&page, r#"//a[@id="submit"]"#, doc).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn positional_steps_are_per_parent() {
        let page = page();
        let doc = page.document(page.top_window());
        let firsts = evaluate(&page, "//ul/li[1]", doc).unwrap();
        assert_eq!(texts(&page, &firsts), vec!["a", "c"]);
        let second_list = evaluate(&page, r#"//*[@id="main"]/ul[2]/li[1]"#, doc).unwrap();
        assert_eq!(texts(&page, &second_list), vec!["c"]);
        let absolute = evaluate(&page, "/html[1]/body[1]/div[1]/ul[1]/li[2]", doc).unwrap();
        assert_eq!(texts(&page, &absolute), vec!["b"]);
    }

    #[test]
    fn normalize_space_matches_wrapped_text() {
        let page = page();
        let doc = page.document(page.top_window());
        let hits = evaluate(&page, r#"//button[normalize-space(.)="Cancel now"]"#, doc).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(page.attr(hits[0], "data-testid"), Some("cancel"));
    }

    #[test]
    fn concat_literal_handles_mixed_quotes() {
        let page = Page::parse(
            r#"<span aria-label="it's &quot;fine&quot;">x</span>"#,
            "https://a.example/",
        )
        .unwrap();
        let doc = page.document(page.top_window());
        let hits = evaluate(
            &page,
            r#"//span[@aria-label=concat("it's ", '"', "fine", '"')]"#,
            doc,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn paths_do_not_pierce_shadow_roots() {
        let page = page();
        let doc = page.document(page.top_window());
        assert!(evaluate(&page, r#"//button[@id="inner"]"#, doc).unwrap().is_empty());

        let host = evaluate(&page, "//x-host", doc).unwrap()[0];
        let root = page.open_shadow_root(host).unwrap();
        let hits = evaluate(&page, r#".//button[@id="inner"]"#, root).unwrap();
        assert_eq!(texts(&page, &hits), vec!["In"]);
        let rooted = evaluate(&page, "./button[1]", root).unwrap();
        assert_eq!(rooted, hits);
    }

    #[test]
    fn boolean_operators_and_functions() {
        let page = page();
        let doc = page.document(page.top_window());
        let hits = evaluate(
            &page,
            r#"//button[contains(@class, "btn") or starts-with(@data-testid, "can")]"#,
            doc,
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        let last = evaluate(&page, "//ul[last()]/li", doc).unwrap();
        assert_eq!(texts(&page, &last), vec!["c"]);
        let without_id = evaluate(&page, "//div[@id]/button[not(@id)]", doc).unwrap();
        assert_eq!(without_id.len(), 1);
    }

    #[test]
    fn malformed_expressions_error() {
        let page = page();
        let doc = page.document(page.top_window());
        assert!(evaluate(&page, r#"//button[@id="x"#, doc).is_err());
        assert!(evaluate(&page, "//button[", doc).is_err());
        assert!(evaluate(&page, r#""just a string""#, doc).is_err());
    }
}
