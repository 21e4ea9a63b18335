//! Single-pass descriptor parser.
//!
//! The parser is purely syntactic: it knows the grammar but nothing about
//! categories, key types, or which clauses a statement kind may carry.

use crate::{
    MAX_STATEMENT_SLOTS,
    db::statement::{
        ast::{
            Assignment, Clause, CompareOp, Filter, LimitTerm, Placeholder, SortDirection,
            SortItem, StatementAst, StatementKind,
        },
        token::{Token, TokenKind, tokenize},
    },
    schema::ScalarKind,
};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Expected
///
/// Token class the parser wanted at the point of failure.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Expected {
    #[display("statement type (ADD, REPLACE, UPDATE, REMOVE, QUERY, QUERY-COUNT)")]
    StatementType,
    #[display("category name")]
    CategoryName,
    #[display("clause keyword (SET, WHERE, SORT, LIMIT) in that order")]
    ClauseKeyword,
    #[display("quoted key name")]
    QuotedKey,
    #[display("'='")]
    Equals,
    #[display("comparator (=, !=, <, <=, >, >=)")]
    Comparator,
    #[display("placeholder (?s, ?l, ?i, ?d, ?b)")]
    Placeholder,
    #[display("sort direction (ASC or DSC)")]
    SortDirection,
    #[display("placeholder ?i or integer literal")]
    LimitValue,
}

///
/// ParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ParseError {
    #[error("descriptor is empty")]
    Empty,

    #[error("unexpected '{found}' at offset {offset}; expected {expected}")]
    Unexpected {
        offset: usize,
        found: String,
        expected: Expected,
    },

    #[error("descriptor ends early; expected {expected}")]
    UnexpectedEnd { expected: Expected },

    #[error("unknown statement type '{found}'")]
    UnknownStatement { found: String },

    #[error("unknown operator '{found}' at offset {offset}")]
    UnknownOperator { offset: usize, found: String },

    #[error("quoted key starting at offset {offset} is never closed")]
    UnterminatedQuote { offset: usize },

    #[error("quoted key at offset {offset} is empty")]
    EmptyKey { offset: usize },

    #[error("malformed placeholder '{found}' at offset {offset}")]
    MalformedPlaceholder { offset: usize, found: String },

    #[error("LIMIT literal '{found}' at offset {offset} is not a non-negative integer")]
    InvalidLimit { offset: usize, found: String },

    #[error("descriptor declares more than {max} placeholders")]
    TooManyPlaceholders { max: usize },
}

/// Parse a raw descriptor into its syntax tree.
pub fn parse(raw: &str) -> Result<StatementAst, ParseError> {
    let tokens = tokenize(raw)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    Parser::new(raw, &tokens).run()
}

///
/// State
///
/// Parser position in the grammar. Each state consumes exactly one
/// grammar item and names its successor.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    StatementType,
    Category,
    ClauseStart,
    SetItem,
    AfterSetItem,
    FilterItem,
    AfterFilterItem,
    SortItem,
    AfterSortItem,
    Limit,
    Done,
}

struct Parser<'a> {
    raw: &'a str,
    tokens: &'a [Token],
    pos: usize,
    last_clause: Option<Clause>,
    kind: Option<StatementKind>,
    category: String,
    assignments: Vec<Assignment>,
    filters: Vec<Filter>,
    sort: Vec<SortItem>,
    limit: Option<LimitTerm>,
    placeholders: usize,
}

impl<'a> Parser<'a> {
    const fn new(raw: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            raw,
            tokens,
            pos: 0,
            last_clause: None,
            kind: None,
            category: String::new(),
            assignments: Vec::new(),
            filters: Vec::new(),
            sort: Vec::new(),
            limit: None,
            placeholders: 0,
        }
    }

    fn run(mut self) -> Result<StatementAst, ParseError> {
        let mut state = State::StatementType;

        while state != State::Done {
            state = self.step(state)?;
        }

        let kind = self.kind.ok_or(ParseError::UnexpectedEnd {
            expected: Expected::StatementType,
        })?;

        Ok(StatementAst {
            kind,
            category: self.category,
            assignments: self.assignments,
            filters: self.filters,
            sort: self.sort,
            limit: self.limit,
        })
    }

    fn step(&mut self, state: State) -> Result<State, ParseError> {
        let next = match state {
            State::StatementType => {
                let word = self.expect_word(Expected::StatementType)?;
                let kind = StatementKind::from_keyword(&word)
                    .ok_or(ParseError::UnknownStatement { found: word })?;
                self.kind = Some(kind);

                State::Category
            }

            State::Category => {
                self.category = self.expect_word(Expected::CategoryName)?;

                State::ClauseStart
            }

            State::ClauseStart => {
                let Some(token) = self.peek() else {
                    return Ok(State::Done);
                };
                let clause = match &token.kind {
                    TokenKind::Word(word) => Clause::from_keyword(word),
                    _ => None,
                };
                let clause = match clause {
                    Some(clause) if self.last_clause.is_none_or(|last| clause > last) => clause,
                    _ => return Err(self.unexpected(token, Expected::ClauseKeyword)),
                };
                self.pos += 1;
                self.last_clause = Some(clause);

                match clause {
                    Clause::Set => State::SetItem,
                    Clause::Where => State::FilterItem,
                    Clause::Sort => State::SortItem,
                    Clause::Limit => State::Limit,
                }
            }

            State::SetItem => {
                let key = self.expect_key()?;
                let op = self.expect_comparator(Expected::Equals)?;
                if op != CompareOp::Eq {
                    let token = &self.tokens[self.pos - 1];
                    return Err(self.unexpected(token, Expected::Equals));
                }
                let placeholder = self.expect_placeholder(Expected::Placeholder)?;
                self.assignments.push(Assignment { key, placeholder });

                State::AfterSetItem
            }

            State::AfterSetItem => {
                if self.eat(|kind| matches!(kind, TokenKind::Comma)) {
                    State::SetItem
                } else {
                    State::ClauseStart
                }
            }

            State::FilterItem => {
                let key = self.expect_key()?;
                let op = self.expect_comparator(Expected::Comparator)?;
                let placeholder = self.expect_placeholder(Expected::Placeholder)?;
                self.filters.push(Filter {
                    key,
                    op,
                    placeholder,
                });

                State::AfterFilterItem
            }

            State::AfterFilterItem => {
                let joined = self.eat(|kind| match kind {
                    TokenKind::Comma => true,
                    TokenKind::Word(word) => word == "AND",
                    _ => false,
                });

                if joined {
                    State::FilterItem
                } else {
                    State::ClauseStart
                }
            }

            State::SortItem => {
                let key = self.expect_key()?;
                let word = self.expect_word(Expected::SortDirection)?;
                let Some(direction) = SortDirection::from_keyword(&word) else {
                    let token = &self.tokens[self.pos - 1];
                    return Err(self.unexpected(token, Expected::SortDirection));
                };
                self.sort.push(SortItem { key, direction });

                State::AfterSortItem
            }

            State::AfterSortItem => {
                if self.eat(|kind| matches!(kind, TokenKind::Comma)) {
                    State::SortItem
                } else {
                    State::ClauseStart
                }
            }

            State::Limit => {
                let token = self.advance(Expected::LimitValue)?;
                let term = match &token.kind {
                    TokenKind::Placeholder { .. } => {
                        LimitTerm::Placeholder(self.resolve_placeholder(token)?)
                    }
                    TokenKind::Word(word) => {
                        let count = word.parse::<u32>().map_err(|_| ParseError::InvalidLimit {
                            offset: token.span.start,
                            found: word.clone(),
                        })?;
                        LimitTerm::Literal(count)
                    }
                    _ => return Err(self.unexpected(token, Expected::LimitValue)),
                };
                self.limit = Some(term);

                State::ClauseStart
            }

            State::Done => State::Done,
        };

        Ok(next)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self, expected: Expected) -> Result<&'a Token, ParseError> {
        let token = self
            .peek()
            .ok_or(ParseError::UnexpectedEnd { expected })?;
        self.pos += 1;

        Ok(token)
    }

    // Consume the next token only when it matches.
    fn eat(&mut self, matches: impl Fn(&TokenKind) -> bool) -> bool {
        match self.peek() {
            Some(token) if matches(&token.kind) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_word(&mut self, expected: Expected) -> Result<String, ParseError> {
        let token = self.advance(expected)?;
        match &token.kind {
            TokenKind::Word(word) => Ok(word.clone()),
            _ => Err(self.unexpected(token, expected)),
        }
    }

    fn expect_key(&mut self) -> Result<String, ParseError> {
        let token = self.advance(Expected::QuotedKey)?;
        match &token.kind {
            TokenKind::QuotedKey(key) if key.is_empty() => Err(ParseError::EmptyKey {
                offset: token.span.start,
            }),
            TokenKind::QuotedKey(key) => Ok(key.clone()),
            _ => Err(self.unexpected(token, Expected::QuotedKey)),
        }
    }

    fn expect_comparator(&mut self, expected: Expected) -> Result<CompareOp, ParseError> {
        let token = self.advance(expected)?;
        match token.kind {
            TokenKind::Comparator(op) => Ok(op),
            _ => Err(self.unexpected(token, expected)),
        }
    }

    fn expect_placeholder(&mut self, expected: Expected) -> Result<Placeholder, ParseError> {
        let token = self.advance(expected)?;
        match token.kind {
            TokenKind::Placeholder { .. } => self.resolve_placeholder(token),
            _ => Err(self.unexpected(token, expected)),
        }
    }

    fn resolve_placeholder(&mut self, token: &Token) -> Result<Placeholder, ParseError> {
        let TokenKind::Placeholder { type_char, list } = token.kind else {
            return Err(self.unexpected(token, Expected::Placeholder));
        };
        let kind =
            ScalarKind::from_type_char(type_char).ok_or_else(|| ParseError::MalformedPlaceholder {
                offset: token.span.start,
                found: token.text(self.raw).to_string(),
            })?;

        self.placeholders += 1;
        if self.placeholders > MAX_STATEMENT_SLOTS {
            return Err(ParseError::TooManyPlaceholders {
                max: MAX_STATEMENT_SLOTS,
            });
        }

        Ok(Placeholder { kind, list })
    }

    fn unexpected(&self, token: &Token, expected: Expected) -> ParseError {
        ParseError::Unexpected {
            offset: token.span.start,
            found: token.text(self.raw).to_string(),
            expected,
        }
    }
}
