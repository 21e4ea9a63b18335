use crate::db::statement::{ast::CompareOp, parse::ParseError};

///
/// Span
///
/// Byte range of one token inside the raw descriptor.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

///
/// TokenKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// Bare word: statement type, category name, clause keyword, AND,
    /// sort direction, or a literal LIMIT count.
    Word(String),

    /// `'name'`, always a key reference.
    QuotedKey(String),

    /// `?c` or `?c[`; the type character is resolved by the parser.
    Placeholder { type_char: char, list: bool },

    Comparator(CompareOp),

    Comma,
}

///
/// Token
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Source text covered by this token.
    #[must_use]
    pub fn text<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.span.start..self.span.end]
    }
}

/// Split a descriptor into tokens.
///
/// Whitespace separates tokens but is otherwise insignificant. Operators and
/// commas terminate words even without surrounding whitespace.
pub fn tokenize(raw: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = raw.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let (kind, end) = match ch {
            ',' => {
                chars.next();
                (TokenKind::Comma, start + 1)
            }

            '=' => {
                chars.next();
                (TokenKind::Comparator(CompareOp::Eq), start + 1)
            }

            '<' | '>' | '!' => {
                chars.next();
                let has_eq = chars.next_if(|&(_, next)| next == '=').is_some();
                let op = match (ch, has_eq) {
                    ('<', true) => CompareOp::Lte,
                    ('<', false) => CompareOp::Lt,
                    ('>', true) => CompareOp::Gte,
                    ('>', false) => CompareOp::Gt,
                    ('!', true) => CompareOp::Ne,
                    _ => {
                        return Err(ParseError::UnknownOperator {
                            offset: start,
                            found: "!".to_string(),
                        });
                    }
                };
                let width = if has_eq { 2 } else { 1 };

                (TokenKind::Comparator(op), start + width)
            }

            '\'' => {
                chars.next();
                let mut end = None;
                for (index, next) in chars.by_ref() {
                    if next == '\'' {
                        end = Some(index);
                        break;
                    }
                }
                let Some(close) = end else {
                    return Err(ParseError::UnterminatedQuote { offset: start });
                };

                (
                    TokenKind::QuotedKey(raw[start + 1..close].to_string()),
                    close + 1,
                )
            }

            '?' => {
                let end = scan_word(&mut chars, raw.len());
                let kind = placeholder(raw, start, end)?;

                (kind, end)
            }

            _ => {
                let end = scan_word(&mut chars, raw.len());

                (TokenKind::Word(raw[start..end].to_string()), end)
            }
        };

        tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    Ok(tokens)
}

// Consume a run of word characters, returning the end offset.
fn scan_word(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, len: usize) -> usize {
    // the leading char is always consumed, even a '?'
    chars.next();

    while let Some(&(index, ch)) = chars.peek() {
        if is_delimiter(ch) {
            return index;
        }
        chars.next();
    }

    len
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '\'' | ',' | '=' | '<' | '>' | '!' | '?')
}

fn placeholder(raw: &str, start: usize, end: usize) -> Result<TokenKind, ParseError> {
    let text = &raw[start..end];
    let mut body = text[1..].chars();

    let malformed = || ParseError::MalformedPlaceholder {
        offset: start,
        found: text.to_string(),
    };

    let type_char = body.next().ok_or_else(malformed)?;
    let list = match body.next() {
        None => false,
        Some('[') => true,
        Some(_) => return Err(malformed()),
    };
    if body.next().is_some() {
        return Err(malformed());
    }

    Ok(TokenKind::Placeholder { type_char, list })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(raw: &str) -> Vec<TokenKind> {
        tokenize(raw)
            .expect("descriptor should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn operators_split_words_without_whitespace() {
        assert_eq!(
            kinds("WHERE 'a'>=?l,'b'!=?s["),
            vec![
                TokenKind::Word("WHERE".to_string()),
                TokenKind::QuotedKey("a".to_string()),
                TokenKind::Comparator(CompareOp::Gte),
                TokenKind::Placeholder {
                    type_char: 'l',
                    list: false,
                },
                TokenKind::Comma,
                TokenKind::QuotedKey("b".to_string()),
                TokenKind::Comparator(CompareOp::Ne),
                TokenKind::Placeholder {
                    type_char: 's',
                    list: true,
                },
            ]
        );
    }

    #[test]
    fn spans_cover_source_text() {
        let raw = "QUERY  cpu-stats WHERE 'agentId' = ?s";
        let tokens = tokenize(raw).expect("descriptor should tokenize");

        let texts: Vec<_> = tokens.iter().map(|token| token.text(raw)).collect();
        assert_eq!(
            texts,
            ["QUERY", "cpu-stats", "WHERE", "'agentId'", "=", "?s"]
        );
    }

    #[test]
    fn quoted_keys_may_contain_spaces() {
        assert_eq!(
            kinds("'cpu usage'"),
            vec![TokenKind::QuotedKey("cpu usage".to_string())]
        );
    }

    #[test]
    fn unterminated_quote_reports_its_start() {
        assert_eq!(
            tokenize("SET 'agentId = ?s"),
            Err(ParseError::UnterminatedQuote { offset: 4 })
        );
    }

    #[test]
    fn malformed_placeholders_are_rejected() {
        for raw in ["?", "?ss", "?s[x", "?s[["] {
            assert_eq!(
                tokenize(raw),
                Err(ParseError::MalformedPlaceholder {
                    offset: 0,
                    found: raw.to_string(),
                })
            );
        }
    }

    #[test]
    fn bare_bang_is_an_unknown_operator() {
        assert!(matches!(
            tokenize("'a' ! ?s"),
            Err(ParseError::UnknownOperator { offset: 4, .. })
        ));
    }
}
