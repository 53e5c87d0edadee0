//! Streams of lexical tokens.

use nom::InputLength;

/// A borrowed slice of tokens that acts as a
/// [nom](https://crates.io/crates/nom) custom input type.
/// Parsers consume it from the front.
#[derive(Debug, PartialEq)]
pub struct Tokens<'a, T> {
    pub tok: &'a [T],
}

// Only the slice is copied, so no bound on `T`.
impl<'a, T> Clone for Tokens<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Tokens<'a, T> {}

impl<'a, T> Tokens<'a, T> {
    pub fn new(tok: &'a [T]) -> Self {
        Self { tok }
    }

    pub fn is_empty(&self) -> bool {
        self.tok.is_empty()
    }

    pub fn first(&self) -> Option<&'a T> {
        self.tok.first()
    }

    /// Split off the first token.
    pub fn split_first(&self) -> Option<(&'a T, Self)> {
        self.tok
            .split_first()
            .map(|(first, rest)| (first, Self::new(rest)))
    }
}

impl<'a, T> InputLength for Tokens<'a, T> {
    #[inline]
    fn input_len(&self) -> usize {
        self.tok.len()
    }
}
