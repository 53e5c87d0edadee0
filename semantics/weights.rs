//! Literal weights for weighted model counting. A literal and its
//! negation are weighted independently; neither need sum to one.
//!
//! The text format has one atom per line, `lit pw nw`, giving the
//! weights of `lit` and its negation. A line `lit w` weights just
//! `lit`, which may be negative (`-a 0.4`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use lpwmc_cnf::Var;
use lpwmc_syntax::Literal;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("no weight for literal {0}")]
    Missing(String),
    #[error("line {0}: invalid weight entry `{1}`")]
    Invalid(usize, String),
}

/// Things that have a polarity and an opposite, e.g., literals and
/// signed DIMACS variables.
pub trait Signed: Clone + Ord + fmt::Display {
    fn is_positive(&self) -> bool;
    fn opposite(&self) -> Self;
}

impl Signed for Literal {
    fn is_positive(&self) -> bool {
        Literal::is_positive(self)
    }

    fn opposite(&self) -> Self {
        self.clone().negate()
    }
}

impl Signed for Var {
    fn is_positive(&self) -> bool {
        *self > 0
    }

    fn opposite(&self) -> Self {
        -*self
    }
}

/// A partial map from literals to non-negative weights.
#[derive(Clone, Debug, PartialEq)]
pub struct Weights<L: Ord> {
    weights: BTreeMap<L, f64>,
}

impl<L: Ord> Default for Weights<L> {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }
}

impl<L: Signed> Weights<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lit: L, weight: f64) {
        self.weights.insert(lit, weight);
    }

    /// Weight a literal and its negation at once.
    pub fn insert_pair(&mut self, lit: L, weight: f64, opposite: f64) {
        self.insert(lit.opposite(), opposite);
        self.insert(lit, weight);
    }

    pub fn get(&self, lit: &L) -> Result<f64, WeightError> {
        self.weights
            .get(lit)
            .copied()
            .ok_or_else(|| WeightError::Missing(lit.to_string()))
    }

    pub fn contains(&self, lit: &L) -> bool {
        self.weights.contains_key(lit)
    }

    /// The number of weighted literals.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&L, f64)> {
        self.weights.iter().map(|(lit, &w)| (lit, w))
    }
}

impl<L: Signed> fmt::Display for Weights<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (lit, weight) in self.iter() {
            let opposite = self.weights.get(&lit.opposite());
            match (lit.is_positive(), opposite) {
                (true, Some(opposite)) => {
                    f.write_fmt(format_args!("{lit} {weight} {opposite}\n"))?
                }
                (false, Some(_)) => (),
                (_, None) => f.write_fmt(format_args!("{lit} {weight}\n"))?,
            }
        }
        Ok(())
    }
}

impl<L> FromStr for Weights<L>
where
    L: Signed + FromStr,
{
    type Err = WeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut weights = Self::new();
        for (i, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let invalid = || WeightError::Invalid(i + 1, line.to_owned());
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let numeric = fields
                .iter()
                .skip(1)
                .rev()
                .take(2)
                .take_while(|f| f.parse::<f64>().is_ok())
                .count();
            let (lit, numbers) = fields.split_at(fields.len() - numeric);
            let lit = lit.join(" ").parse::<L>().map_err(|_| invalid())?;
            let numbers = numbers
                .iter()
                .map(|n| n.parse::<f64>().ok().filter(|w| w.is_finite() && *w >= 0.0))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?;
            match numbers[..] {
                [weight] => weights.insert(lit, weight),
                [weight, opposite] => weights.insert_pair(lit, weight, opposite),
                _ => return Err(invalid()),
            }
        }
        Ok(weights)
    }
}

#[cfg(test)]
mod test {
    use lpwmc_syntax::{neg, pos};

    use super::*;

    #[test]
    fn missing() {
        let mut weights = Weights::new();
        weights.insert_pair(pos!(a), 0.3, 0.7);
        assert_eq!(weights.get(&pos!(a)), Ok(0.3));
        assert_eq!(weights.get(&neg!(a)), Ok(0.7));
        assert_eq!(
            weights.get(&pos!(b)),
            Err(WeightError::Missing(String::from("b")))
        );
    }

    #[test]
    fn display() {
        let mut weights = Weights::new();
        weights.insert_pair(pos!(a), 0.25, 1.0);
        weights.insert(neg!(b), 0.5);
        assert_eq!(weights.to_string(), "-b 0.5\na 0.25 1\n");
    }

    #[test]
    fn parse() {
        let weights = "a 0.3 0.7\n\n -b 0.5 \np(x, y) 1 0\n"
            .parse::<Weights<Literal>>()
            .expect("parse failed");
        assert_eq!(weights.len(), 5);
        assert_eq!(weights.get(&neg!(a)), Ok(0.7));
        assert_eq!(weights.get(&neg!(b)), Ok(0.5));
        assert!(!weights.contains(&pos!(b)));
        assert_eq!(weights.get(&pos!("p(x,y)")), Ok(1.0));
        assert_eq!(weights.to_string().parse::<Weights<Literal>>(), Ok(weights));
    }

    #[test]
    fn invalid() {
        let parse = |s: &str| s.parse::<Weights<Literal>>();
        assert_eq!(
            parse("a 0.1\nb"),
            Err(WeightError::Invalid(2, String::from("b")))
        );
        assert!(parse("a -0.5").is_err(), "negative weight");
        assert!(parse("a inf").is_err(), "infinite weight");
        assert!(parse("a b 0.5").is_err(), "not a literal");
        assert!(parse("0.5 0.5").is_err(), "no literal");
    }

    #[test]
    fn variables() {
        let weights = "1 0.5 0.5\n-2 0.1".parse::<Weights<Var>>().expect("parse");
        assert_eq!(weights.get(&-1), Ok(0.5));
        assert_eq!(weights.get(&-2), Ok(0.1));
        assert_eq!(weights.to_string(), "-2 0.1\n1 0.5 0.5\n");
    }
}
