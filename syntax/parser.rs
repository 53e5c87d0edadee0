//! Parse a stream of tokens with [nom](https://crates.io/crates/nom).

use nom::{
    branch::alt,
    combinator::{cut, eof, map, map_opt, opt, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    Err, IResult,
};

use crate::{
    excerpt, Atom, Choice, Lex as _, Literal, LpadLexer, LpadToken, Rule, Statement,
    SyntaxError, Token, Tokens,
};

/// An input stream to a parser.
pub type Input<'a> = Tokens<'a, Token<LpadToken, &'a str>>;

/// A parser of a whole token stream.
pub trait Parse<'a> {
    /// The syntax tree (output) type.
    type Tree;

    /// Parse a token stream.
    fn parse(input: Input<'a>) -> IResult<Input<'a>, Vec<Self::Tree>>;
}

/// Ground program parser.
pub struct LpadParser;

impl<'a> Parse<'a> for LpadParser {
    type Tree = Statement;

    /// Parse a sequence of statements. If some statement fails to parse,
    /// report the error from inside it rather than at its first token.
    fn parse(input: Input<'a>) -> IResult<Input<'a>, Vec<Self::Tree>> {
        let (rest, statements) = many0(statement)(input)?;
        if rest.is_empty() {
            Ok((rest, statements))
        } else {
            let (rest, _) = statement(rest)?;
            Err(Err::Error(Error::new(rest, ErrorKind::Many0)))
        }
    }
}

/// Turn a parse result into a syntax tree or an error
/// pointing at the offending source text.
pub(crate) fn finish<T>(result: IResult<Input<'_>, T>) -> Result<T, SyntaxError> {
    match result {
        Ok((rest, tree)) if rest.is_empty() => Ok(tree),
        Ok((rest, _)) => Err(error_at(rest)),
        Err(Err::Error(e) | Err::Failure(e)) => Err(error_at(e.input)),
        Err(Err::Incomplete(_)) => Err(SyntaxError::Eof),
    }
}

fn error_at(rest: Input<'_>) -> SyntaxError {
    match rest.first() {
        Some(token) => SyntaxError::Parse(excerpt(token.source)),
        None => SyntaxError::Eof,
    }
}

/// Parse one signed atom, and nothing else.
pub(crate) fn parse_literal(source: &str) -> Result<Literal, SyntaxError> {
    let (rest, tokens) =
        LpadLexer::lex(source).map_err(|e| SyntaxError::Lex(e.to_string()))?;
    if !rest.is_empty() {
        return Err(SyntaxError::Lex(excerpt(rest)));
    }
    let parsed = finish(terminated(literal, eof)(Tokens::new(&tokens)));
    parsed
}

fn next(input: Input<'_>) -> IResult<Input<'_>, &LpadToken> {
    match input.split_first() {
        Some((first, rest)) => Ok((rest, &first.token)),
        None => Err(Err::Error(Error::new(input, ErrorKind::Eof))),
    }
}

/// Define a parser combinator that recognizes a single token.
/// Named (mostly) after what they mean, not how they look.
macro_rules! parse_token {
    ($function: ident, $token: ident) => {
        fn $function(input: Input<'_>) -> IResult<Input<'_>, ()> {
            match next(input)? {
                (rest, LpadToken::$token) => Ok((rest, ())),
                _ => Err(Err::Error(Error::new(input, ErrorKind::Tag))),
            }
        }
    };
}

parse_token!(query, Query);
parse_token!(evidence, Evidence);
parse_token!(r#true, True);
parse_token!(r#false, False);
parse_token!(not, Not);
parse_token!(naf, BackslashPlus);
parse_token!(minus, Dash);
parse_token!(annotate, ColonColon);
parse_token!(r#if, ColonDash);
parse_token!(if_arrow, LeftArrow);
parse_token!(or, Semi);
parse_token!(and, Comma);
parse_token!(end, Dot);
parse_token!(over, Slash);
parse_token!(lparen, LParen);
parse_token!(rparen, RParen);

fn atom(input: Input<'_>) -> IResult<Input<'_>, Atom> {
    map_opt(next, |t| match t {
        LpadToken::Atom(a) => Some(a.clone()),
        _ => None,
    })(input)
}

fn number(input: Input<'_>) -> IResult<Input<'_>, f64> {
    map_opt(next, |t| match t {
        LpadToken::Number(n) => Some(*n),
        _ => None,
    })(input)
}

/// A decimal number or a fraction `n/d` with `d ≠ 0`.
fn probability(input: Input<'_>) -> IResult<Input<'_>, f64> {
    map_opt(pair(number, opt(preceded(over, number))), |(n, d)| match d {
        None => Some(n),
        Some(d) if d != 0.0 => Some(n / d),
        Some(_) => None,
    })(input)
}

fn truth(input: Input<'_>) -> IResult<Input<'_>, bool> {
    alt((value(true, r#true), value(false, r#false)))(input)
}

/// Negation markers compose, so double negation cancels.
pub(crate) fn literal(input: Input<'_>) -> IResult<Input<'_>, Literal> {
    alt((
        map(preceded(alt((not, naf, minus)), literal), Literal::negate),
        delimited(lparen, literal, rparen),
        map(atom, Literal::positive),
    ))(input)
}

/// An absent annotation means probability one.
fn choice(input: Input<'_>) -> IResult<Input<'_>, Choice> {
    map(
        pair(opt(terminated(probability, annotate)), atom),
        |(p, atom)| Choice::new(p.unwrap_or(1.0), atom),
    )(input)
}

fn body(input: Input<'_>) -> IResult<Input<'_>, Vec<Literal>> {
    alt((value(vec![], r#true), separated_list1(and, literal)))(input)
}

fn rule(input: Input<'_>) -> IResult<Input<'_>, Rule> {
    map(
        terminated(
            pair(
                separated_list1(or, choice),
                opt(preceded(alt((r#if, if_arrow)), body)),
            ),
            end,
        ),
        |(head, body)| Rule::new(head, body.unwrap_or_default()),
    )(input)
}

/// Once a directive keyword is seen, errors are not backtracked over.
fn query_statement(input: Input<'_>) -> IResult<Input<'_>, Literal> {
    preceded(query, cut(delimited(lparen, literal, pair(rparen, end))))(input)
}

/// Evidence is either `evidence(a, true|false)` or `evidence(lit)`.
fn evidence_statement(input: Input<'_>) -> IResult<Input<'_>, Literal> {
    preceded(
        evidence,
        cut(delimited(
            lparen,
            alt((
                map(separated_pair(atom, and, truth), |(atom, positive)| {
                    Literal::new(atom, positive)
                }),
                literal,
            )),
            pair(rparen, end),
        )),
    )(input)
}

fn statement(input: Input<'_>) -> IResult<Input<'_>, Statement> {
    alt((
        map(query_statement, Statement::Query),
        map(evidence_statement, Statement::Evidence),
        map(rule, Statement::Rule),
    ))(input)
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse<T>(
        source: &str,
        parser: impl FnMut(Input<'_>) -> IResult<Input<'_>, T>,
    ) -> Result<T, SyntaxError> {
        let (_, tokens) = LpadLexer::lex(source).expect("lex failed");
        let parsed = finish(terminated(parser, eof)(Tokens::new(&tokens)));
        parsed
    }

    #[test]
    fn probabilities() {
        assert_eq!(parse("0.5", probability), Ok(0.5));
        assert_eq!(parse("3/4", probability), Ok(0.75));
        assert!(parse("3/0", probability).is_err());
        assert!(parse("a", probability).is_err());
    }

    #[test]
    fn choices() {
        assert_eq!(parse("a", choice), Ok(Choice::new(1.0, Atom::from("a"))));
        assert_eq!(
            parse("0.1::p(x)", choice),
            Ok(Choice::new(0.1, Atom::from("p(x)")))
        );
    }

    #[test]
    fn statements() {
        assert_eq!(
            parse("evidence(a, false).", statement),
            Ok(Statement::Evidence(Literal::negative(Atom::from("a"))))
        );
        assert_eq!(
            parse("evidence(-(a)).", statement),
            Ok(Statement::Evidence(Literal::negative(Atom::from("a"))))
        );
        assert_eq!(
            parse("query(\\+ \\+ a).", statement),
            Ok(Statement::Query(Literal::positive(Atom::from("a"))))
        );
        assert_eq!(
            parse("a :- true.", statement),
            Ok(Statement::Rule(Rule::new(
                [Choice::new(1.0, Atom::from("a"))],
                []
            )))
        );
    }

    #[test]
    fn error_position() {
        assert_eq!(
            parse("a :- b c.", statement),
            Err(SyntaxError::Parse(String::from("c.")))
        );
        assert_eq!(parse("query(a", statement), Err(SyntaxError::Eof));
    }

    #[test]
    fn token_mismatch() {
        assert_eq!(parse("true", r#true), Ok(()));
        assert!(parse("false", r#true).is_err());
        assert!(parse("a", query).is_err());
        assert!(parse("", evidence).is_err());
        assert!(parse("evidence(a, maybe).", statement).is_err());
    }
}
