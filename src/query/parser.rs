use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt},
    multi::separated_list1,
    sequence::{delimited, preceded},
};
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::{Direction, OrderArg, OrderTerm};

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

fn direction(input: &str) -> IResult<&str, Direction> {
    alt((
        map(tag_no_case("desc"), |_| Direction::Desc),
        map(tag_no_case("asc"), |_| Direction::Asc),
    ))
    .parse(input)
}

fn order_term(input: &str) -> IResult<&str, OrderTerm> {
    map(
        (identifier, opt(preceded(multispace1, direction))),
        |(field, direction)| OrderTerm {
            field: field.to_string(),
            direction: direction.unwrap_or_default(),
        },
    )
    .parse(input)
}

fn order_terms(input: &str) -> IResult<&str, Vec<OrderTerm>> {
    separated_list1(delimited(multispace0, char(','), multispace0), order_term).parse(input)
}

/// Parse an SQL-like ordering clause
/// Examples:
/// - "name" -> [name ASC]
/// - "name, population DESC" -> [name ASC, population DESC]
pub fn parse_order_clause(input: &str) -> Result<Vec<OrderTerm>> {
    match all_consuming(delimited(multispace0, order_terms, multispace0)).parse(input) {
        Ok((_, terms)) => Ok(terms),
        Err(e) => Err(Error::new(
            ErrorKind::Parse,
            format!("Invalid order clause {:?}: {}", input, e),
        )),
    }
}

/// Flatten `order` arguments into terms, in the order they were written.
/// Blank clauses are skipped.
pub fn expand_order_args(args: Vec<OrderArg>) -> Result<Vec<OrderTerm>> {
    let mut terms = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            OrderArg::Term(term) => terms.push(term),
            OrderArg::Clause(clause) if clause.trim().is_empty() => continue,
            OrderArg::Clause(clause) => terms.extend(parse_order_clause(&clause)?),
        }
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_field_is_ascending() {
        assert_eq!(parse_order_clause("name").unwrap(), vec![OrderTerm::asc("name")]);
    }

    #[test]
    fn clause_with_directions() {
        let terms = parse_order_clause("name, population DESC, iso_code asc").unwrap();
        assert_eq!(
            terms,
            vec![
                OrderTerm::asc("name"),
                OrderTerm::desc("population"),
                OrderTerm::asc("iso_code"),
            ]
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_order_clause("name DESC junk").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert!(parse_order_clause("name,").is_err());
    }

    #[test]
    fn expands_mixed_arguments() {
        let terms = expand_order_args(vec![
            OrderArg::from(("id", Direction::Desc)),
            OrderArg::from(""),
            OrderArg::from("name"),
        ])
        .unwrap();
        assert_eq!(terms, vec![OrderTerm::desc("id"), OrderTerm::asc("name")]);
    }
}
