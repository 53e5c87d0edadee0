//! Tokenize a string representation of a ground program.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    error::ParseError,
    multi::{many0, many0_count},
    sequence::{delimited, pair, terminated},
    IResult, Parser,
};

use crate::Atom;

/// Lexical element of a ground program.
/// Named after how they look, not what they mean.
#[derive(Clone, Debug, PartialEq)]
pub enum LpadToken {
    Atom(Atom),
    Number(f64),
    Query,
    Evidence,
    True,
    False,
    Not,
    BackslashPlus,
    Dash,
    ColonColon,
    ColonDash,
    LeftArrow,
    Semi,
    Comma,
    Dot,
    Slash,
    LParen,
    RParen,
}

/// Whitespace and `%` comments.
pub(crate) fn space(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            recognize(pair(char('%'), not_line_ending)),
        ))),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// A balanced, parenthesized argument list, e.g. `(a,f(b),3)`.
fn arguments(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('('),
        many0_count(alt((is_not("()"), arguments))),
        char(')'),
    ))(input)
}

/// Ground atoms are identifiers with optional arguments. Whitespace
/// inside the arguments is insignificant and dropped from the name.
pub(crate) fn atom(input: &str) -> IResult<&str, Atom> {
    map(recognize(pair(identifier, opt(arguments))), |text: &str| {
        Atom::new(text.split_whitespace().collect::<String>())
    })(input)
}

pub(crate) fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        str::parse::<f64>,
    )(input)
}

/// A word that may not continue as an identifier, so that
/// `not` is a keyword but `nothing` is an atom.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(peek(alt((alphanumeric1, tag("_"))))))
}

/// A word that introduces a parenthesized directive, e.g. `query(`.
fn directive<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), peek(char('(')))
}

pub(crate) fn token<I, O, E, F>(mut parser: F) -> impl FnMut(I) -> IResult<I, Token<O, I>, E>
where
    I: Clone,
    O: Clone,
    E: ParseError<I>,
    F: Parser<I, O, E>,
{
    move |input: I| {
        let i = input.clone();
        let (input, t) = parser.parse(input)?;
        Ok((input, Token::new(t, i)))
    }
}

/// Define a lexer combinator for a token denoted by a fixed string.
macro_rules! lex_token {
    ($function: ident, $recognizer: expr, $token: ident) => {
        fn $function(input: &str) -> IResult<&str, Token<LpadToken, &str>> {
            token(map($recognizer, |_| LpadToken::$token))(input)
        }
    };
}

lex_token!(query, directive("query"), Query);
lex_token!(evidence, directive("evidence"), Evidence);
lex_token!(r#true, keyword("true"), True);
lex_token!(r#false, keyword("false"), False);
lex_token!(not_, keyword("not"), Not);
lex_token!(backslash_plus, tag("\\+"), BackslashPlus);
lex_token!(dash, tag("-"), Dash);
lex_token!(colon_colon, tag("::"), ColonColon);
lex_token!(colon_dash, tag(":-"), ColonDash);
lex_token!(left_arrow, tag("<-"), LeftArrow);
lex_token!(semi, tag(";"), Semi);
lex_token!(comma, tag(","), Comma);
lex_token!(dot, tag("."), Dot);
lex_token!(slash, tag("/"), Slash);
lex_token!(lparen, tag("("), LParen);
lex_token!(rparen, tag(")"), RParen);

/// A token with source information: the input remaining
/// at the point where the token starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Token<T: Clone, S: Clone> {
    pub token: T,
    pub source: S,
}

impl<T: Clone, S: Clone> Token<T, S> {
    pub fn new(token: T, source: S) -> Self {
        Self { token, source }
    }
}

/// A lexer, a.k.a. lexical analyzer, tokenizer.
pub trait Lex<'a> {
    type Token;

    /// Tokenize an input string.
    fn lex(input: &'a str) -> IResult<&'a str, Vec<Self::Token>>;
}

/// Lexer for ground annotated-disjunction programs.
pub struct LpadLexer;

impl<'a> Lex<'a> for LpadLexer {
    type Token = Token<LpadToken, &'a str>;

    fn lex(input: &'a str) -> IResult<&'a str, Vec<Self::Token>> {
        let (input, _) = space(input)?;
        many0(terminated(
            alt((
                alt((query, evidence, r#true, r#false, not_)),
                alt((backslash_plus, colon_colon, colon_dash, left_arrow)),
                alt((dash, semi, comma, dot, slash, lparen, rparen)),
                token(map(number, LpadToken::Number)),
                token(map(atom, LpadToken::Atom)),
            )),
            space,
        ))(input)
    }
}
