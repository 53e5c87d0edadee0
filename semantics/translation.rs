//! The correspondence between program atoms and DIMACS variables.

use std::collections::HashMap;
use std::fmt;

use lpwmc_cnf::Var;
use lpwmc_syntax::Atom;

/// Something that needs a propositional variable in the CNF:
/// an atom of the program, or the auxiliary variable that stands
/// for the `i`th body of a head with several rules.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Variable {
    Atom(Atom),
    Body(Atom, usize),
}

impl From<Atom> for Variable {
    fn from(atom: Atom) -> Self {
        Self::Atom(atom)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(atom) => atom.fmt(f),
            Self::Body(head, i) => f.write_fmt(format_args!("{head}#{i}")),
        }
    }
}

/// A bijection between variables and the integers `1..=n`,
/// numbered in order of first use.
#[derive(Clone, Debug, Default)]
pub struct Translation {
    variables: Vec<Variable>,
    indices: HashMap<Variable, Var>,
}

impl Translation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number a variable, or return its existing number.
    pub fn add(&mut self, var: Variable) -> Var {
        if let Some(&index) = self.indices.get(&var) {
            return index;
        }
        self.variables.push(var.clone());
        let index = self.variables.len() as Var;
        self.indices.insert(var, index);
        index
    }

    pub fn get(&self, var: &Variable) -> Option<Var> {
        self.indices.get(var).copied()
    }

    /// The variable numbered `index`, if any.
    pub fn by_index(&self, index: Var) -> Option<&Variable> {
        let i = usize::try_from(index).ok()?.checked_sub(1)?;
        self.variables.get(i)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All `(index, variable)` pairs, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Var, &Variable)> {
        (1..).zip(self.variables.iter())
    }
}

/// One `index variable` pair per line.
impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, var) in self.iter() {
            f.write_fmt(format_args!("{index} {var}\n"))?;
        }
        Ok(())
    }
}
