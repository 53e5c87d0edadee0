//! Syntactic elements of ground probabilistic logic programs.
//!
//! A ground program is a list of _annotated disjunctions_ (rules whose
//! heads are probability-weighted choices between atoms), queries, and
//! evidence. Everything is propositional: an atom is an opaque name,
//! and a literal is an atom with a polarity.

mod lexer;
mod parser;
mod tokens;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

pub use lexer::{Lex, LpadLexer, LpadToken, Token};
pub use parser::{LpadParser, Parse};
pub use tokens::Tokens;

/// An uninterpreted propositional identifier. Cloning is cheap;
/// the name is shared.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Atom(Arc<str>);

impl Atom {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Derive a related atom by appending a suffix, e.g. `a` → `a_1`.
    pub fn suffixed(&self, suffix: impl fmt::Display) -> Self {
        Self::new(format!("{}_{suffix}", self.name()))
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A signed atom. Equality, ordering, and hashing all follow the signed
/// textual form (`a`, `-a`), so an atom and its negation are distinct
/// keys and double negation cancels.
#[derive(Clone, Debug)]
pub struct Literal {
    atom: Atom,
    positive: bool,
}

impl Literal {
    pub fn new(atom: Atom, positive: bool) -> Self {
        Self { atom, positive }
    }

    pub fn positive(atom: Atom) -> Self {
        Self::new(atom, true)
    }

    pub fn negative(atom: Atom) -> Self {
        Self::new(atom, false)
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    pub fn negate(self) -> Self {
        Self {
            atom: self.atom,
            positive: !self.positive,
        }
    }

    /// The same atom with this literal's polarity,
    /// e.g., `(-a).with_atom(b) = -b`.
    pub fn with_atom(&self, atom: Atom) -> Self {
        Self::new(atom, self.positive)
    }

    /// Render with Prolog-style negation, `not(a)`.
    pub fn prolog(&self) -> Prolog<'_> {
        Prolog(self)
    }

    fn text(&self) -> impl Iterator<Item = char> + '_ {
        (!self.positive)
            .then_some('-')
            .into_iter()
            .chain(self.atom.name().chars())
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.text().eq(other.text())
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.text() {
            c.hash(state);
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text().cmp(other.text())
    }
}

impl ops::Neg for Literal {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl From<Atom> for Literal {
    fn from(atom: Atom) -> Self {
        Self::positive(atom)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            f.write_str("-")?;
        }
        self.atom.fmt(f)
    }
}

impl FromStr for Literal {
    type Err = SyntaxError;

    /// Parse a signed atom: `a`, `-a`, `\+a`, `not a`, `not(a)`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_literal(s)
    }
}

/// A literal rendered as Prolog source text.
pub struct Prolog<'a>(&'a Literal);

impl fmt::Display for Prolog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_positive() {
            self.0.atom.fmt(f)
        } else {
            f.write_fmt(format_args!("not({})", self.0.atom))
        }
    }
}

/// One alternative of an annotated disjunction: `p::a`.
#[derive(Clone, Debug, PartialEq)]
pub struct Choice {
    pub probability: f64,
    pub atom: Atom,
}

impl Choice {
    pub fn new(probability: f64, atom: Atom) -> Self {
        Self { probability, atom }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}::{}", self.probability, self.atom))
    }
}

/// An annotated disjunction `p1::h1; ...; pn::hn :- b1, ..., bm.`
/// At most one head atom is chosen, with the given probabilities,
/// whenever the body holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub head: Vec<Choice>,
    pub body: Vec<Literal>,
}

impl Rule {
    pub fn new(
        head: impl IntoIterator<Item = Choice>,
        body: impl IntoIterator<Item = Literal>,
    ) -> Self {
        Self {
            head: head.into_iter().collect(),
            body: body.into_iter().collect(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self
            .head
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&head)?;
        if !self.body.is_empty() {
            let body = self
                .body
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            f.write_fmt(format_args!(" :- {body}"))?;
        }
        f.write_str(".")
    }
}

/// A top-level element of a ground program.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Rule(Rule),
    Query(Literal),
    Evidence(Literal),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule(rule) => rule.fmt(f),
            Self::Query(lit) => f.write_fmt(format_args!("query({lit}).")),
            Self::Evidence(lit) => f.write_fmt(format_args!(
                "evidence({}, {}).",
                lit.atom(),
                lit.is_positive()
            )),
        }
    }
}

/// Things that may go wrong while reading program text.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyntaxError {
    #[error("unrecognized input: `{0}`")]
    Lex(String),
    #[error("syntax error at `{0}`")]
    Parse(String),
    #[error("unexpected end of input")]
    Eof,
}

/// Lex and parse the text of a complete ground program.
pub fn parse_program(source: &str) -> Result<Vec<Statement>, SyntaxError> {
    let (rest, tokens) =
        LpadLexer::lex(source).map_err(|e| SyntaxError::Lex(e.to_string()))?;
    if !rest.is_empty() {
        return Err(SyntaxError::Lex(excerpt(rest)));
    }
    let parsed = parser::finish(LpadParser::parse(Tokens::new(&tokens)));
    parsed
}

/// The first line of some remaining input, for error messages.
pub(crate) fn excerpt(rest: &str) -> String {
    rest.lines().next().unwrap_or_default().trim().to_owned()
}

/// These constructor macros make tests involving syntactic elements
/// much more readable. They are *not* intended as a public interface,
/// and *should* be behind `#[cfg(test)]`, but [cargo can't currently
/// export test code across crates](https://github.com/rust-lang/cargo/issues/8379).
#[cfg(feature = "macros")]
mod macros {
    #[macro_export]
    macro_rules! atom {
        ($name: ident) => {
            $crate::Atom::from(stringify!($name))
        };
        ($name: literal) => {
            $crate::Atom::from($name)
        };
    }

    #[macro_export]
    macro_rules! pos {
        ($name: tt) => {
            $crate::Literal::positive($crate::atom!($name))
        };
    }

    #[macro_export]
    macro_rules! neg {
        ($name: tt) => {
            $crate::Literal::negative($crate::atom!($name))
        };
    }
}
