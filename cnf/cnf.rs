//! Formulas in conjunctive normal form: a conjunction of clauses, each
//! a disjunction of signed variables. This is the shape expected by
//! satisfiability and weighted model counting tools, and the only shape
//! of formula the rest of the workspace ever hands them.

mod dimacs;
mod formula;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use dimacs::DimacsError;
pub use formula::{Formula, Node, NodeId, Var};

/// Misuse of the formula builders. These indicate programming errors
/// upstream, so callers should propagate them rather than recover.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CnfError {
    #[error("0 is not a variable")]
    ZeroVariable,
    #[error("no such formula node: {0}")]
    UnknownNode(NodeId),
    #[error("only disjunctions may be added to a CNF, not node {0}")]
    NotADisjunction(NodeId),
    #[error("clauses may only contain leaves, not node {0}")]
    NotALeaf(NodeId),
}

/// A conjunction of disjunctions of leaves, stored in a formula arena
/// under a single root conjunction.
#[derive(Clone, Debug)]
pub struct Cnf {
    formula: Formula,
    root: NodeId,
}

impl Default for Cnf {
    fn default() -> Self {
        Self::new()
    }
}

impl Cnf {
    pub fn new() -> Self {
        let mut formula = Formula::new();
        let root = formula.and([]);
        Self { formula, root }
    }

    /// Make a leaf node, to be used in clauses later.
    pub fn leaf(&mut self, var: Var) -> Result<NodeId, CnfError> {
        self.formula.leaf(var)
    }

    /// Make a disjunction node, to be [added](Cnf::add) later.
    pub fn disjunction(&mut self, disjuncts: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.formula.or(disjuncts)
    }

    /// Add a clause. The node must be a disjunction of leaves.
    pub fn add(&mut self, clause: NodeId) -> Result<(), CnfError> {
        match self.formula.get(clause)? {
            Node::Disjunction(leaves) => {
                for &leaf in leaves {
                    if !matches!(self.formula.get(leaf)?, Node::Leaf(_)) {
                        return Err(CnfError::NotALeaf(leaf));
                    }
                }
            }
            _ => return Err(CnfError::NotADisjunction(clause)),
        }
        match self.formula.get_mut(self.root)? {
            Node::Conjunction(clauses) => clauses.push(clause),
            _ => unreachable!("CNF root is not a conjunction"),
        }
        Ok(())
    }

    /// Build and add a clause from signed variables.
    pub fn add_clause(&mut self, vars: impl IntoIterator<Item = Var>) -> Result<(), CnfError> {
        let leaves = vars
            .into_iter()
            .map(|v| self.leaf(v))
            .collect::<Result<Vec<_>, _>>()?;
        let clause = self.disjunction(leaves);
        self.add(clause)
    }

    fn clause_ids(&self) -> &[NodeId] {
        match self.formula.get(self.root) {
            Ok(Node::Conjunction(clauses)) => clauses,
            _ => unreachable!("CNF root is not a conjunction"),
        }
    }

    /// The signed variables of each clause, in order.
    pub fn clauses(&self) -> impl Iterator<Item = Vec<Var>> + '_ {
        self.clause_ids().iter().map(|&id| match self.formula.get(id) {
            Ok(Node::Disjunction(leaves)) => leaves
                .iter()
                .map(|&leaf| match self.formula.get(leaf) {
                    Ok(Node::Leaf(v)) => *v,
                    _ => unreachable!("non-leaf in a clause"),
                })
                .collect(),
            _ => unreachable!("non-disjunction in a CNF"),
        })
    }

    /// The number of clauses.
    pub fn len(&self) -> usize {
        self.clause_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clause_ids().is_empty()
    }

    /// The distinct (unsigned) variables that occur in some clause.
    pub fn variables(&self) -> BTreeSet<u64> {
        let mut vars = BTreeSet::new();
        match self.formula.variables(self.root, &mut vars) {
            Ok(()) => vars,
            Err(_) => unreachable!("CNF root is not in its formula"),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables().len()
    }

    /// Is the formula true when exactly the variables in `truths` are?
    pub fn eval(&self, truths: &BTreeSet<u64>) -> bool {
        self.formula.eval(self.root, truths).unwrap_or(false)
    }

    /// Serialize in DIMACS format.
    pub fn to_dimacs(&self) -> String {
        self.to_string()
    }

    /// Read DIMACS text.
    pub fn from_dimacs(text: &str) -> Result<Self, DimacsError> {
        dimacs::read(text)
    }
}

impl fmt::Display for Cnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dimacs::write(self, f)
    }
}

impl FromStr for Cnf {
    type Err = DimacsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dimacs(s)
    }
}
