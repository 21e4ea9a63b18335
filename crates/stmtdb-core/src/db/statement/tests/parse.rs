use crate::{
    MAX_STATEMENT_SLOTS,
    db::statement::{
        Expected, ParseError, parse,
        ast::{
            Assignment, CompareOp, Filter, LimitTerm, Placeholder, SortDirection, SortItem,
            StatementKind,
        },
    },
    schema::ScalarKind,
};

const ADD_CPU: &str =
    "ADD cpu-stats SET 'agentId' = ?s , 'perProcessorUsage' = ?d[ , 'timeStamp' = ?l";
const QUERY_SESSIONS: &str = "QUERY vm-thread-session WHERE 'vmId' = ?s , 'timeStamp' >= ?l AND 'timeStamp' <= ?l SORT 'timeStamp' DSC LIMIT ?i";

fn filter(key: &str, op: CompareOp, kind: ScalarKind) -> Filter {
    Filter {
        key: key.to_string(),
        op,
        placeholder: Placeholder::scalar(kind),
    }
}

#[test]
fn add_example_parses_every_assignment() {
    let ast = parse(ADD_CPU).expect("add example should parse");

    assert_eq!(ast.kind, StatementKind::Add);
    assert_eq!(ast.category, "cpu-stats");
    assert_eq!(
        ast.assignments,
        vec![
            Assignment {
                key: "agentId".to_string(),
                placeholder: Placeholder::scalar(ScalarKind::String),
            },
            Assignment {
                key: "perProcessorUsage".to_string(),
                placeholder: Placeholder::list(ScalarKind::Double),
            },
            Assignment {
                key: "timeStamp".to_string(),
                placeholder: Placeholder::scalar(ScalarKind::Long),
            },
        ]
    );
    assert!(ast.filters.is_empty());
    assert_eq!(ast.limit, None);
}

#[test]
fn query_example_mixes_comma_and_and_separators() {
    let ast = parse(QUERY_SESSIONS).expect("query example should parse");

    assert_eq!(ast.kind, StatementKind::Query);
    assert_eq!(
        ast.filters,
        vec![
            filter("vmId", CompareOp::Eq, ScalarKind::String),
            filter("timeStamp", CompareOp::Gte, ScalarKind::Long),
            filter("timeStamp", CompareOp::Lte, ScalarKind::Long),
        ]
    );
    assert_eq!(
        ast.sort,
        vec![SortItem {
            key: "timeStamp".to_string(),
            direction: SortDirection::Desc,
        }]
    );
    assert_eq!(
        ast.limit,
        Some(LimitTerm::Placeholder(Placeholder::scalar(ScalarKind::Integer)))
    );
}

#[test]
fn display_renders_canonical_text() {
    let ast = parse(QUERY_SESSIONS).expect("query example should parse");

    assert_eq!(
        ast.to_string(),
        "QUERY vm-thread-session WHERE 'vmId' = ?s AND 'timeStamp' >= ?l AND 'timeStamp' <= ?l SORT 'timeStamp' DSC LIMIT ?i"
    );
    assert_eq!(
        parse(&ast.to_string()).expect("canonical text should parse"),
        ast
    );
}

#[test]
fn supplemented_statement_kinds_parse() {
    let update = parse("UPDATE vm-thread-session SET 'live' = ?b WHERE 'vmId' = ?s")
        .expect("update should parse");
    assert_eq!(update.kind, StatementKind::Update);

    let count = parse("QUERY-COUNT vm-thread-session WHERE 'live' != ?b")
        .expect("count should parse");
    assert_eq!(count.kind, StatementKind::QueryCount);
    assert_eq!(count.filters[0].op, CompareOp::Ne);

    let literal = parse("QUERY agent-config WHERE 'agentId' = ?s LIMIT 1")
        .expect("literal limit should parse");
    assert_eq!(literal.limit, Some(LimitTerm::Literal(1)));
}

#[test]
fn bare_word_is_an_unknown_statement() {
    assert_eq!(
        parse("foo"),
        Err(ParseError::UnknownStatement {
            found: "foo".to_string(),
        })
    );
}

#[test]
fn blank_descriptors_are_empty() {
    assert_eq!(parse(""), Err(ParseError::Empty));
    assert_eq!(parse("  \t "), Err(ParseError::Empty));
}

#[test]
fn missing_category_reports_end_of_input() {
    assert_eq!(
        parse("QUERY"),
        Err(ParseError::UnexpectedEnd {
            expected: Expected::CategoryName,
        })
    );
}

#[test]
fn unquoted_key_names_are_rejected_with_offset() {
    assert_eq!(
        parse("QUERY cat WHERE foo = ?l"),
        Err(ParseError::Unexpected {
            offset: 16,
            found: "foo".to_string(),
            expected: Expected::QuotedKey,
        })
    );
}

#[test]
fn clauses_out_of_order_or_repeated_are_rejected() {
    for raw in [
        "QUERY cat SORT 'a' ASC WHERE 'a' = ?s",
        "QUERY cat LIMIT ?i LIMIT ?i",
        "UPDATE cat WHERE 'a' = ?s SET 'b' = ?s",
    ] {
        let err = parse(raw).expect_err("clause order should be enforced");
        assert!(
            matches!(
                err,
                ParseError::Unexpected {
                    expected: Expected::ClauseKeyword,
                    ..
                }
            ),
            "unexpected error for {raw}: {err:?}"
        );
    }
}

#[test]
fn assignments_only_accept_equals() {
    assert_eq!(
        parse("ADD cat SET 'a' >= ?s"),
        Err(ParseError::Unexpected {
            offset: 16,
            found: ">=".to_string(),
            expected: Expected::Equals,
        })
    );
}

#[test]
fn truncated_item_reports_the_missing_token() {
    assert_eq!(
        parse("ADD cat SET 'a' ="),
        Err(ParseError::UnexpectedEnd {
            expected: Expected::Placeholder,
        })
    );
}

#[test]
fn trailing_separator_needs_another_item() {
    assert_eq!(
        parse("QUERY cat WHERE 'a' = ?s AND"),
        Err(ParseError::UnexpectedEnd {
            expected: Expected::QuotedKey,
        })
    );
}

#[test]
fn unknown_placeholder_types_are_malformed() {
    assert_eq!(
        parse("QUERY cat WHERE 'a' = ?x"),
        Err(ParseError::MalformedPlaceholder {
            offset: 22,
            found: "?x".to_string(),
        })
    );
}

#[test]
fn sort_direction_must_be_asc_or_dsc() {
    let err = parse("QUERY cat SORT 'a' DESC").expect_err("DESC is not a direction");

    assert_eq!(
        err,
        ParseError::Unexpected {
            offset: 19,
            found: "DESC".to_string(),
            expected: Expected::SortDirection,
        }
    );
}

#[test]
fn negative_or_garbage_limit_literals_are_rejected() {
    for (raw, found) in [("QUERY cat LIMIT -1", "-1"), ("QUERY cat LIMIT ten", "ten")] {
        assert_eq!(
            parse(raw),
            Err(ParseError::InvalidLimit {
                offset: 16,
                found: found.to_string(),
            })
        );
    }
}

#[test]
fn empty_quoted_key_is_rejected() {
    assert_eq!(
        parse("QUERY cat WHERE '' = ?s"),
        Err(ParseError::EmptyKey { offset: 16 })
    );
}

#[test]
fn trailing_tokens_after_last_clause_are_rejected() {
    let err = parse("ADD cat SET 'a' = ?s extra").expect_err("trailing word should fail");

    assert!(matches!(
        err,
        ParseError::Unexpected {
            expected: Expected::ClauseKeyword,
            ..
        }
    ));
}

#[test]
fn placeholder_count_is_bounded() {
    let filters = vec!["'a' = ?l"; MAX_STATEMENT_SLOTS + 1].join(" AND ");
    let raw = format!("QUERY cat WHERE {filters}");

    assert_eq!(
        parse(&raw),
        Err(ParseError::TooManyPlaceholders {
            max: MAX_STATEMENT_SLOTS,
        })
    );
}
