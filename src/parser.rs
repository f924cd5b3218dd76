/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! A `nom`-combinator recognizer for a restricted SPARQL `SELECT` dialect:
//! `PREFIX`, `SELECT [DISTINCT] (* | ?var+)`, `WHERE { triple-pattern* }`
//! with `;`-continuation, a handful of `FILTER` forms, a single `ORDER BY`
//! key, and `LIMIT`/`OFFSET`.

use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1, space0, space1},
    combinator::{opt, recognize},
    multi::many0,
    sequence::{delimited, preceded},
    IResult, Parser,
};

use crate::ast::{FilterExpr, OrderBy, Projection, SelectQuery, SortDirection};
use crate::error::ParseError;
use crate::term::Term;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-').parse(input)
}

pub fn prefixed_identifier(input: &str) -> IResult<&str, &str> {
    recognize((identifier, char(':'), identifier)).parse(input)
}

pub fn variable(input: &str) -> IResult<&str, &str> {
    recognize((char('?'), identifier)).parse(input)
}

pub fn parse_literal(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while1(|c| c != '"'), char('"')).parse(input)
}

pub fn parse_uri(input: &str) -> IResult<&str, &str> {
    delimited(char('<'), take_while1(|c| c != '>'), char('>')).parse(input)
}

/// A raw term as it comes out of the grammar, before prefix expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawTerm<'a> {
    Variable(&'a str),
    Uri(&'a str),
    Literal(&'a str),
    Prefixed(&'a str),
    RdfTypeShortcut,
}

fn raw_subject(input: &str) -> IResult<&str, RawTerm<'_>> {
    alt((
        variable.map(RawTerm::Variable),
        parse_uri.map(RawTerm::Uri),
        recognize((char(':'), identifier)).map(RawTerm::Prefixed),
        prefixed_identifier.map(RawTerm::Prefixed),
        identifier.map(RawTerm::Uri),
    ))
    .parse(input)
}

fn raw_predicate(input: &str) -> IResult<&str, RawTerm<'_>> {
    alt((
        variable.map(RawTerm::Variable),
        parse_uri.map(RawTerm::Uri),
        tag("a").map(|_| RawTerm::RdfTypeShortcut),
        recognize((char(':'), identifier)).map(RawTerm::Prefixed),
        prefixed_identifier.map(RawTerm::Prefixed),
    ))
    .parse(input)
}

fn raw_object(input: &str) -> IResult<&str, RawTerm<'_>> {
    alt((
        variable.map(RawTerm::Variable),
        parse_uri.map(RawTerm::Uri),
        parse_literal.map(RawTerm::Literal),
        recognize((char(':'), identifier)).map(RawTerm::Prefixed),
        prefixed_identifier.map(RawTerm::Prefixed),
        identifier.map(RawTerm::Uri),
    ))
    .parse(input)
}

fn expand(term: RawTerm<'_>, prefixes: &HashMap<String, String>) -> Term {
    match term {
        RawTerm::Variable(v) => Term::Variable(v.trim_start_matches('?').to_string()),
        RawTerm::Uri(u) => Term::Uri(u.to_string()),
        RawTerm::Literal(l) => Term::Literal(l.to_string()),
        RawTerm::RdfTypeShortcut => Term::Uri(
            prefixes
                .get("rdf")
                .map(|base| format!("{base}type"))
                .unwrap_or_else(|| RDF_TYPE.to_string()),
        ),
        RawTerm::Prefixed(p) => Term::Uri(expand_qname(p, prefixes)),
    }
}

fn expand_qname(qname: &str, prefixes: &HashMap<String, String>) -> String {
    match qname.split_once(':') {
        Some((prefix, local)) => match prefixes.get(prefix) {
            Some(base) => format!("{base}{local}"),
            None => qname.to_string(),
        },
        None => qname.to_string(),
    }
}

fn predicate_object(input: &str) -> IResult<&str, (RawTerm<'_>, RawTerm<'_>)> {
    let (input, p) = raw_predicate(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, o) = raw_object(input)?;
    Ok((input, (p, o)))
}

/// One subject followed by one or more `;`-separated predicate-object
/// pairs, all sharing that subject.
fn triple_block(input: &str) -> IResult<&str, Vec<(RawTerm<'_>, RawTerm<'_>, RawTerm<'_>)>> {
    let (input, subject) = raw_subject(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, first) = predicate_object(input)?;
    let (input, rest) = many0(preceded(
        (multispace0, char(';'), multispace0),
        predicate_object,
    ))
    .parse(input)?;

    let mut pairs = vec![first];
    pairs.extend(rest);
    let triples = pairs
        .into_iter()
        .map(|(p, o)| (subject.clone(), p, o))
        .collect();
    Ok((input, triples))
}

fn filter_comparand(input: &str) -> IResult<&str, &str> {
    alt((variable, parse_literal, take_while1(|c: char| c.is_ascii_digit()))).parse(input)
}

fn filter_regex(input: &str) -> IResult<&str, FilterExpr> {
    let (input, _) = tag_no_case("REGEX").parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char('(').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, var) = variable(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(',').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, pattern) = parse_literal(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(')').parse(input)?;
    Ok((
        input,
        FilterExpr::Regex {
            variable: var.trim_start_matches('?').to_string(),
            pattern: pattern.to_string(),
        },
    ))
}

fn filter_contains(input: &str) -> IResult<&str, FilterExpr> {
    let (input, _) = tag_no_case("CONTAINS").parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char('(').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, var) = variable(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(',').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, needle) = parse_literal(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(')').parse(input)?;
    Ok((
        input,
        FilterExpr::Contains {
            variable: var.trim_start_matches('?').to_string(),
            needle: needle.to_string(),
        },
    ))
}

fn filter_equality(input: &str) -> IResult<&str, FilterExpr> {
    let (input, var) = variable(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, op) = alt((tag("!="), tag("="))).parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, value) = filter_comparand(input)?;
    let variable = var.trim_start_matches('?').to_string();
    let value = value.trim_matches('"').to_string();
    Ok((
        input,
        if op == "!=" {
            FilterExpr::NotEq { variable, value }
        } else {
            FilterExpr::Eq { variable, value }
        },
    ))
}

/// Anything inside `FILTER(...)` that isn't one of the recognized forms is
/// kept verbatim as [`FilterExpr::Unsupported`] rather than rejected; the
/// executor treats it as always-true and logs a diagnostic at the point of
/// evaluation.
fn filter_body(input: &str) -> IResult<&str, FilterExpr> {
    alt((filter_regex, filter_contains, filter_equality)).parse(input)
}

/// True only when `input` begins with the `FILTER` keyword followed by
/// (optional whitespace and) an opening paren — i.e. the start of an actual
/// `FILTER(...)` clause, not just a bareword that happens to start with
/// "filter" (`FILTERED <hasBug> ?p` is a triple pattern, not a filter).
fn looks_like_filter(input: &str) -> bool {
    let Ok((rest, _)) = tag_no_case::<_, _, nom::error::Error<&str>>("FILTER").parse(input) else {
        return false;
    };
    let Ok((rest, _)) = multispace0::<_, nom::error::Error<&str>>(rest) else {
        return false;
    };
    rest.starts_with('(')
}

fn filter_clause(input: &str) -> IResult<&str, FilterExpr> {
    let (input, _) = tag_no_case("FILTER").parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char('(').parse(input)?;
    let start = input;
    match filter_body(input) {
        Ok((rest, expr)) => {
            let (rest, _) = multispace0.parse(rest)?;
            let (rest, _) = char(')').parse(rest)?;
            Ok((rest, expr))
        }
        Err(_) => {
            // Not one of the recognized forms: consume the balanced
            // parenthesized body verbatim and remember its text.
            let (rest, body) = balanced_parens(start)?;
            Ok((rest, FilterExpr::Unsupported(body.trim().to_string())))
        }
    }
}

/// Consumes up to (and including) the `)` that balances the already-opened
/// `(`, tracking nesting depth so a filter body containing its own
/// parentheses does not terminate early.
fn balanced_parens(input: &str) -> IResult<&str, &str> {
    let mut depth = 1i32;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..i]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeUntil,
    )))
}

fn prefix_decl(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = tag_no_case("PREFIX").parse(input)?;
    let (input, _) = space1.parse(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, _) = space0.parse(input)?;
    let (input, base) = parse_uri(input)?;
    let (input, _) = multispace0.parse(input)?;
    Ok((input, (name, base)))
}

fn select_clause(input: &str) -> IResult<&str, (bool, Projection)> {
    let (input, _) = tag_no_case("SELECT").parse(input)?;
    let (input, _) = space1.parse(input)?;
    let (input, distinct) = opt((tag_no_case("DISTINCT"), space1)).parse(input)?;
    let (input, projection) = alt((
        tag("*").map(|_| Projection::All),
        nom::multi::separated_list1(space1, variable)
            .map(|vars| Projection::Variables(vars.into_iter().map(|v| v[1..].to_string()).collect())),
    ))
    .parse(input)?;
    Ok((input, (distinct.is_some(), projection)))
}

fn where_clause<'a>(
    input: &'a str,
    prefixes: &HashMap<String, String>,
    original: &str,
) -> Result<(&'a str, (Vec<crate::ast::TriplePattern>, Vec<FilterExpr>)), ParseError> {
    let as_syntax_error = |e: nom::Err<nom::error::Error<&str>>| syntax_error(original, &e);

    let (input, _) = multispace0::<_, nom::error::Error<&str>>(input).unwrap_or((input, ()));
    let (input, _) = tag_no_case::<_, _, nom::error::Error<&str>>("WHERE")
        .parse(input)
        .map_err(as_syntax_error)?;
    let (input, _) = multispace0::<_, nom::error::Error<&str>>(input).unwrap_or((input, ()));
    let (mut input, _) = char::<_, nom::error::Error<&str>>('{')
        .parse(input)
        .map_err(as_syntax_error)?;

    let mut patterns = Vec::new();
    let mut filters = Vec::new();

    loop {
        let (rest, _) = multispace0::<_, nom::error::Error<&str>>(input).unwrap_or((input, ()));
        input = rest;
        if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('}').parse(input) {
            input = rest;
            break;
        }
        if looks_like_filter(input) {
            match filter_clause(input) {
                Ok((rest, expr)) => {
                    filters.push(expr);
                    input = rest;
                }
                // filter_clause only fails to produce a result when no closing
                // parenthesis balances the one that opened the FILTER body.
                Err(_) => return Err(ParseError::UnbalancedFilter(input.to_string())),
            }
        } else if let Ok((rest, block)) = triple_block(input) {
            patterns.extend(
                block
                    .into_iter()
                    .map(|(s, p, o)| (expand(s, prefixes), expand(p, prefixes), expand(o, prefixes))),
            );
            input = rest;
        } else {
            return Err(syntax_error(
                original,
                &nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Alt)),
            ));
        }
        let (rest, _) = multispace0::<_, nom::error::Error<&str>>(input).unwrap_or((input, ()));
        input = rest;
        if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('.').parse(input) {
            input = rest;
        }
    }

    Ok((input, (patterns, filters)))
}

fn order_by_clause(input: &str) -> IResult<&str, OrderBy> {
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = tag_no_case("ORDER").parse(input)?;
    let (input, _) = space1.parse(input)?;
    let (input, _) = tag_no_case("BY").parse(input)?;
    let (input, _) = space1.parse(input)?;
    let (input, explicit) = opt(alt((tag_no_case("ASC"), tag_no_case("DESC")))).parse(input)?;
    let (input, _) = if explicit.is_some() {
        char('(').parse(input)?
    } else {
        (input, ' ')
    };
    let (input, var) = variable(input)?;
    let (input, _) = if explicit.is_some() {
        char(')').parse(input)?
    } else {
        (input, ')')
    };
    let direction = match explicit.map(str::to_uppercase).as_deref() {
        Some("DESC") => SortDirection::Descending,
        _ => SortDirection::Ascending,
    };
    Ok((
        input,
        OrderBy {
            variable: var.trim_start_matches('?').to_string(),
            direction,
        },
    ))
}

fn limit_clause(input: &str) -> IResult<&str, u64> {
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = tag_no_case("LIMIT").parse(input)?;
    let (input, _) = space1.parse(input)?;
    let (input, digits) = take_while1(|c: char| c.is_ascii_digit()).parse(input)?;
    Ok((input, digits.parse().unwrap_or(0)))
}

fn offset_clause(input: &str) -> IResult<&str, u64> {
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = tag_no_case("OFFSET").parse(input)?;
    let (input, _) = space1.parse(input)?;
    let (input, digits) = take_while1(|c: char| c.is_ascii_digit()).parse(input)?;
    Ok((input, digits.parse().unwrap_or(0)))
}

/// Parses a full `SELECT` query, or fails with a [`ParseError`] describing
/// what went wrong and, where the underlying `nom` error carries a byte
/// offset, at what line/column.
pub fn parse_select_query(query: &str) -> Result<SelectQuery, ParseError> {
    let trimmed = query.trim_start();
    if !trimmed.to_uppercase().starts_with("SELECT") && !trimmed.to_uppercase().contains("PREFIX")
    {
        return Err(ParseError::UnsupportedQueryType);
    }

    let mut input = query;
    let mut prefixes = HashMap::new();
    while let Ok((rest, (name, base))) = prefix_decl(input) {
        prefixes.insert(name.to_string(), base.to_string());
        input = rest;
    }

    let (input, _) = multispace0::<_, nom::error::Error<&str>>(input)
        .map_err(|_| ParseError::UnsupportedQueryType)?;

    if !input.trim_start().to_uppercase().starts_with("SELECT") {
        return Err(ParseError::UnsupportedQueryType);
    }

    let (input, (distinct, projection)) =
        select_clause(input).map_err(|_| ParseError::UnsupportedQueryType)?;
    let (input, _) = multispace0::<_, nom::error::Error<&str>>(input).unwrap_or((input, ()));

    if !input.trim_start().to_uppercase().starts_with("WHERE") {
        return Err(ParseError::MissingWhere);
    }

    let (input, (where_patterns, filters)) = where_clause(input, &prefixes, query)?;

    let (input, order_by) = opt(order_by_clause)
        .parse(input)
        .unwrap_or((input, None));
    let (input, limit) = opt(limit_clause).parse(input).unwrap_or((input, None));
    let (_input, offset) = opt(offset_clause).parse(input).unwrap_or((input, None));

    Ok(SelectQuery {
        prefixes,
        distinct,
        projection,
        where_clause: where_patterns,
        filters,
        order_by,
        limit: limit.unwrap_or(0),
        offset: offset.unwrap_or(0),
    })
}

fn syntax_error(original: &str, err: &nom::Err<nom::error::Error<&str>>) -> ParseError {
    let remaining = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
        nom::Err::Incomplete(_) => "",
    };
    let consumed = original.len().saturating_sub(remaining.len());
    let mut line = 1usize;
    let mut column = 1usize;
    for c in original[..consumed.min(original.len())].chars() {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    ParseError::Syntax {
        line,
        column,
        message: format!(
            "unexpected input near {:?}",
            &remaining[..remaining.len().min(24)]
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_parsing() {
        assert_eq!(identifier("main_go"), Ok(("", "main_go")));
        assert!(identifier("").is_err());
    }

    #[test]
    fn variable_parsing() {
        assert_eq!(variable("?module"), Ok(("", "?module")));
        assert!(variable("module").is_err());
    }

    #[test]
    fn triple_block_with_semicolon_continuation() {
        let input = "?m <exports> ?e ; <name> \"main.go\"";
        let (rest, triples) = triple_block(input).unwrap();
        assert_eq!(rest, "");
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].0, triples[1].0);
    }

    #[test]
    fn a_shortcut_expands_to_rdf_type() {
        let query = "SELECT ?m WHERE { ?m a <Module> }";
        let ast = parse_select_query(query).unwrap();
        let (_, p, _) = &ast.where_clause[0];
        assert_eq!(p.text(), RDF_TYPE);
    }

    #[test]
    fn select_star_with_prefix() {
        let query = r#"PREFIX ex: <http://example.org#>
SELECT *
WHERE { ?s ?p ?o . }"#;
        let ast = parse_select_query(query).unwrap();
        assert_eq!(ast.projection, Projection::All);
        assert_eq!(ast.prefixes.get("ex").map(String::as_str), Some("http://example.org#"));
        assert_eq!(ast.where_clause.len(), 1);
    }

    #[test]
    fn distinct_limit_offset_order_by() {
        let query = "SELECT DISTINCT ?s WHERE { ?s <p> ?o } ORDER BY DESC(?s) LIMIT 5 OFFSET 10";
        let ast = parse_select_query(query).unwrap();
        assert!(ast.distinct);
        assert_eq!(ast.limit, 5);
        assert_eq!(ast.offset, 10);
        let order = ast.order_by.unwrap();
        assert_eq!(order.variable, "s");
        assert_eq!(order.direction, SortDirection::Descending);
    }

    #[test]
    fn filter_regex_is_recognized() {
        let query = r#"SELECT ?m ?n WHERE { ?m <name> ?n . FILTER(REGEX(?n, "^main")) }"#;
        let ast = parse_select_query(query).unwrap();
        assert_eq!(
            ast.filters[0],
            FilterExpr::Regex {
                variable: "n".to_string(),
                pattern: "^main".to_string()
            }
        );
    }

    #[test]
    fn unknown_filter_form_is_kept_as_unsupported() {
        let query = "SELECT ?s WHERE { ?s <p> ?o . FILTER(?o > 5) }";
        let ast = parse_select_query(query).unwrap();
        assert!(matches!(ast.filters[0], FilterExpr::Unsupported(_)));
    }

    #[test]
    fn bareword_subject_starting_with_filter_is_a_triple_not_a_filter_clause() {
        let query = "SELECT ?p WHERE { FILTERED <hasBug> ?p }";
        let ast = parse_select_query(query).unwrap();
        assert!(ast.filters.is_empty());
        assert_eq!(ast.where_clause.len(), 1);
        assert_eq!(ast.where_clause[0].0.text(), "FILTERED");
    }

    #[test]
    fn missing_where_is_an_error() {
        let query = "SELECT ?s";
        assert_eq!(parse_select_query(query), Err(ParseError::MissingWhere));
    }

    #[test]
    fn unclosed_filter_parenthesis_is_an_unbalanced_filter_error() {
        let query = "SELECT ?s WHERE { ?s <p> ?o . FILTER(?o > 5 }";
        assert!(matches!(
            parse_select_query(query),
            Err(ParseError::UnbalancedFilter(_))
        ));
    }

    #[test]
    fn non_select_query_is_unsupported() {
        let query = "ASK { ?s ?p ?o }";
        assert_eq!(
            parse_select_query(query),
            Err(ParseError::UnsupportedQueryType)
        );
    }
}
