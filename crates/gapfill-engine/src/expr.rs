//! Boolean filter expressions over table columns.
//!
//! Variable metadata carries eligibility filters (`filter`, `impute_only`)
//! and forced-missing rules (`set_nan_eval`) as strings like
//! `internet == 1`, `gk_sbs < 20`, or `regio == 'west' and omzet >= 100`.
//! Expressions are parsed once into a small AST and compiled to a Polars
//! expression for vectorized evaluation.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or-expr  := and-expr (("or" | "||" | "|") and-expr)*
//! and-expr := cmp-expr (("and" | "&&" | "&") cmp-expr)*
//! cmp-expr := term (("==" | "!=" | "<" | "<=" | ">" | ">=") term)?
//! term     := identifier | number | string | "true" | "false" | "(" or-expr ")"
//! ```
//!
//! String literals accept single or double quotes. By authoring convention a
//! filter may be just a column name; a non-boolean root is therefore
//! normalized to `<expr> == 1`.

use std::collections::BTreeSet;

use polars::prelude::{DataFrame, Expr, IntoLazy, col, lit};
use thiserror::Error;

/// Errors from parsing or evaluating a filter expression.
///
/// All of these are recovered by the caller: a column whose filter fails is
/// imputed without a filter, with a warning.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("empty filter expression")]
    Empty,
    #[error("unexpected character `{0}` in filter expression")]
    UnexpectedChar(char),
    #[error("unterminated string literal in filter expression")]
    UnterminatedString,
    #[error("invalid numeric literal `{0}` in filter expression")]
    InvalidNumber(String),
    #[error("expected a column, literal, or `(` in filter expression")]
    ExpectedValue,
    #[error("missing closing `)` in filter expression")]
    MissingParen,
    #[error("unexpected trailing input in filter expression")]
    TrailingInput,
    #[error("filter references columns not in the table: {0}")]
    UnknownColumns(String),
    #[error("filter evaluation failed: {0}")]
    Evaluation(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Number(String),
    Str(String),
    Bool(bool),
    LParen,
    RParen,
    Minus,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
enum FilterNode {
    Column(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Compare {
        op: CompareOp,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
}

impl FilterNode {
    /// True when the node already produces a boolean; bare columns and
    /// literals need the `== 1` normalization.
    fn is_boolean(&self) -> bool {
        matches!(
            self,
            FilterNode::Compare { .. }
                | FilterNode::And(..)
                | FilterNode::Or(..)
                | FilterNode::Bool(_)
        )
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            FilterNode::Column(name) => {
                out.insert(name.clone());
            }
            FilterNode::Compare { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            FilterNode::And(left, right) | FilterNode::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            _ => {}
        }
    }

    fn to_expr(&self) -> Expr {
        match self {
            FilterNode::Column(name) => col(name.as_str()),
            FilterNode::Int(value) => lit(*value),
            FilterNode::Float(value) => lit(*value),
            FilterNode::Str(value) => lit(value.clone()),
            FilterNode::Bool(value) => lit(*value),
            FilterNode::Compare { op, left, right } => {
                let left = left.to_expr();
                let right = right.to_expr();
                match op {
                    CompareOp::Eq => left.eq(right),
                    CompareOp::NotEq => left.neq(right),
                    CompareOp::Lt => left.lt(right),
                    CompareOp::Lte => left.lt_eq(right),
                    CompareOp::Gt => left.gt(right),
                    CompareOp::Gte => left.gt_eq(right),
                }
            }
            FilterNode::And(left, right) => left.to_expr().and(right.to_expr()),
            FilterNode::Or(left, right) => left.to_expr().or(right.to_expr()),
        }
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, FilterError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0usize;

    while index < chars.len() {
        let ch = chars[index];

        if ch.is_whitespace() {
            index += 1;
            continue;
        }

        if ch == '\'' || ch == '"' {
            let quote = ch;
            index += 1;
            let mut literal = String::new();
            let mut terminated = false;
            while index < chars.len() {
                if chars[index] == '\\' {
                    let Some(escaped) = chars.get(index + 1) else {
                        return Err(FilterError::UnterminatedString);
                    };
                    literal.push(*escaped);
                    index += 2;
                    continue;
                }
                if chars[index] == quote {
                    index += 1;
                    terminated = true;
                    break;
                }
                literal.push(chars[index]);
                index += 1;
            }
            if !terminated {
                return Err(FilterError::UnterminatedString);
            }
            tokens.push(Token::Str(literal));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = index;
            index += 1;
            while index < chars.len() && (chars[index].is_ascii_alphanumeric() || chars[index] == '_')
            {
                index += 1;
            }
            let identifier: String = chars[start..index].iter().collect();
            let token = match identifier.to_ascii_lowercase().as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "true" => Token::Bool(true),
                "false" => Token::Bool(false),
                _ => Token::Identifier(identifier),
            };
            tokens.push(token);
            continue;
        }

        if ch.is_ascii_digit()
            || (ch == '.' && chars.get(index + 1).is_some_and(char::is_ascii_digit))
        {
            let start = index;
            index += 1;
            while index < chars.len() && chars[index].is_ascii_digit() {
                index += 1;
            }
            if index < chars.len() && chars[index] == '.' {
                index += 1;
                while index < chars.len() && chars[index].is_ascii_digit() {
                    index += 1;
                }
            }
            tokens.push(Token::Number(chars[start..index].iter().collect()));
            continue;
        }

        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '-' => Token::Minus,
            '=' => {
                if chars.get(index + 1) == Some(&'=') {
                    index += 1;
                }
                Token::Eq
            }
            '!' => {
                if chars.get(index + 1) == Some(&'=') {
                    index += 1;
                    Token::NotEq
                } else {
                    return Err(FilterError::UnexpectedChar('!'));
                }
            }
            '<' => {
                if chars.get(index + 1) == Some(&'=') {
                    index += 1;
                    Token::Lte
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if chars.get(index + 1) == Some(&'=') {
                    index += 1;
                    Token::Gte
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if chars.get(index + 1) == Some(&'&') {
                    index += 1;
                }
                Token::And
            }
            '|' => {
                if chars.get(index + 1) == Some(&'|') {
                    index += 1;
                }
                Token::Or
            }
            other => return Err(FilterError::UnexpectedChar(other)),
        };
        tokens.push(token);
        index += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }

    fn parse(mut self) -> Result<FilterNode, FilterError> {
        let root = self.parse_or()?;
        if self.cursor != self.tokens.len() {
            return Err(FilterError::TrailingInput);
        }
        Ok(root)
    }

    fn parse_or(&mut self) -> Result<FilterNode, FilterError> {
        let mut node = self.parse_and()?;
        while self.consume_if(|token| matches!(token, Token::Or)) {
            let right = self.parse_and()?;
            node = FilterNode::Or(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<FilterNode, FilterError> {
        let mut node = self.parse_comparison()?;
        while self.consume_if(|token| matches!(token, Token::And)) {
            let right = self.parse_comparison()?;
            node = FilterNode::And(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<FilterNode, FilterError> {
        let left = self.parse_term()?;
        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::NotEq,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Lte) => CompareOp::Lte,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Gte) => CompareOp::Gte,
            _ => return Ok(left),
        };
        self.cursor += 1;
        let right = self.parse_term()?;
        Ok(FilterNode::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_term(&mut self) -> Result<FilterNode, FilterError> {
        if self.consume_if(|token| matches!(token, Token::LParen)) {
            let node = self.parse_or()?;
            if !self.consume_if(|token| matches!(token, Token::RParen)) {
                return Err(FilterError::MissingParen);
            }
            return Ok(node);
        }

        if self.consume_if(|token| matches!(token, Token::Minus)) {
            let Some(Token::Number(value)) = self.take_current() else {
                return Err(FilterError::ExpectedValue);
            };
            return match parse_number(&value)? {
                FilterNode::Int(number) => Ok(FilterNode::Int(-number)),
                FilterNode::Float(number) => Ok(FilterNode::Float(-number)),
                _ => Err(FilterError::ExpectedValue),
            };
        }

        match self.take_current() {
            Some(Token::Identifier(name)) => Ok(FilterNode::Column(name)),
            Some(Token::Number(value)) => parse_number(&value),
            Some(Token::Str(value)) => Ok(FilterNode::Str(value)),
            Some(Token::Bool(value)) => Ok(FilterNode::Bool(value)),
            _ => Err(FilterError::ExpectedValue),
        }
    }

    fn consume_if(&mut self, predicate: impl FnOnce(&Token) -> bool) -> bool {
        let Some(token) = self.tokens.get(self.cursor) else {
            return false;
        };
        if predicate(token) {
            self.cursor += 1;
            return true;
        }
        false
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn take_current(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(token)
    }
}

fn parse_number(value: &str) -> Result<FilterNode, FilterError> {
    if let Ok(integer) = value.parse::<i64>() {
        return Ok(FilterNode::Int(integer));
    }
    value
        .parse::<f64>()
        .map(FilterNode::Float)
        .map_err(|_| FilterError::InvalidNumber(value.to_string()))
}

/// A parsed row filter, ready for evaluation against any table.
#[derive(Debug, Clone)]
pub struct RowFilter {
    source: String,
    root: FilterNode,
}

impl RowFilter {
    /// Parse a filter expression. Parsing is independent of any table; column
    /// existence is checked per evaluation.
    pub fn parse(expression: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(expression)?;
        if tokens.is_empty() {
            return Err(FilterError::Empty);
        }
        let root = Parser::new(tokens).parse()?;
        Ok(Self {
            source: expression.to_string(),
            root,
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Column names the expression references.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut columns = BTreeSet::new();
        self.root.collect_columns(&mut columns);
        columns
    }

    /// The compiled predicate. A non-boolean root is normalized to
    /// `<expr> == 1`.
    pub fn predicate(&self) -> Expr {
        let expr = self.root.to_expr();
        if self.root.is_boolean() {
            expr
        } else {
            expr.eq(lit(1))
        }
    }

    /// Evaluate the predicate row-wise. A row evaluates to `None` when the
    /// expression hits a missing value; callers treat that as not selected.
    pub fn evaluate(&self, df: &DataFrame) -> Result<Vec<Option<bool>>, FilterError> {
        let missing: Vec<String> = self
            .columns()
            .into_iter()
            .filter(|name| df.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(FilterError::UnknownColumns(missing.join(", ")));
        }

        let mask = df
            .clone()
            .lazy()
            .select([self.predicate().alias("__selected")])
            .collect()
            .map_err(|error| FilterError::Evaluation(error.to_string()))?;
        let selected = mask
            .column("__selected")
            .and_then(|column| column.bool().cloned())
            .map_err(|error| FilterError::Evaluation(error.to_string()))?;
        Ok(selected.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_column_is_normalized_to_equals_one() {
        let filter = RowFilter::parse("internet").unwrap();
        assert_eq!(filter.columns().into_iter().collect::<Vec<_>>(), ["internet"]);
        // the root stays a bare column; predicate() adds the comparison
        assert!(!filter.root.is_boolean());
    }

    #[test]
    fn comparison_root_is_kept_as_is() {
        let filter = RowFilter::parse("gk_sbs < 20").unwrap();
        assert!(filter.root.is_boolean());
        assert_eq!(
            filter.columns().into_iter().collect::<Vec<_>>(),
            ["gk_sbs"]
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let filter = RowFilter::parse("a == 1 or b == 2 and c == 3").unwrap();
        let FilterNode::Or(_, right) = &filter.root else {
            panic!("expected or at the root");
        };
        assert!(matches!(**right, FilterNode::And(..)));
    }

    #[test]
    fn symbolic_operators_parse_like_keywords() {
        let keyword = RowFilter::parse("a == 1 and b == 2 or c == 3").unwrap();
        let symbolic = RowFilter::parse("a == 1 && b == 2 || c == 3").unwrap();
        assert_eq!(keyword.root, symbolic.root);
        let single_char = RowFilter::parse("(a == 1) & (b == 2) | (c == 3)").unwrap();
        assert_eq!(keyword.root, single_char.root);
    }

    #[test]
    fn literals_and_negative_numbers() {
        let filter = RowFilter::parse("regio == 'west' or omzet >= -1.5").unwrap();
        let columns = filter.columns();
        assert!(columns.contains("regio"));
        assert!(columns.contains("omzet"));

        let filter = RowFilter::parse("code != \"A 12\"").unwrap();
        assert!(filter.root.is_boolean());
    }

    #[test]
    fn single_equals_reads_as_equality() {
        let single = RowFilter::parse("internet = 1").unwrap();
        let double = RowFilter::parse("internet == 1").unwrap();
        assert_eq!(single.root, double.root);
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        assert!(matches!(RowFilter::parse(""), Err(FilterError::Empty)));
        assert!(matches!(
            RowFilter::parse("   "),
            Err(FilterError::Empty)
        ));
        assert!(matches!(
            RowFilter::parse("(a == 1"),
            Err(FilterError::MissingParen)
        ));
        assert!(matches!(
            RowFilter::parse("a == "),
            Err(FilterError::ExpectedValue)
        ));
        assert!(matches!(
            RowFilter::parse("a == 1 b"),
            Err(FilterError::TrailingInput)
        ));
        assert!(matches!(
            RowFilter::parse("a ? 1"),
            Err(FilterError::UnexpectedChar('?'))
        ));
        assert!(matches!(
            RowFilter::parse("naam == 'onvoltooid"),
            Err(FilterError::UnterminatedString)
        ));
    }
}
