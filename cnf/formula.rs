//! Propositional formulas as trees of leaves, conjunctions, and
//! disjunctions. Nodes live in an arena and refer to their children
//! by index; formulas are built bottom-up, so no node ever needs to
//! know its parents.

use std::collections::BTreeSet;
use std::fmt;

use crate::CnfError;

/// A signed variable reference: `v` or `-v` for a variable `v > 0`.
pub type Var = i64;

/// The index of a node in its [`Formula`] arena.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("#{}", self.0))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Leaf(Var),
    Conjunction(Vec<NodeId>),
    Disjunction(Vec<NodeId>),
}

/// An arena of formula nodes.
#[derive(Clone, Debug, Default)]
pub struct Formula {
    nodes: Vec<Node>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn leaf(&mut self, var: Var) -> Result<NodeId, CnfError> {
        if var == 0 {
            Err(CnfError::ZeroVariable)
        } else {
            Ok(self.push(Node::Leaf(var)))
        }
    }

    pub fn and(&mut self, conjuncts: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.push(Node::Conjunction(conjuncts.into_iter().collect()))
    }

    pub fn or(&mut self, disjuncts: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.push(Node::Disjunction(disjuncts.into_iter().collect()))
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, CnfError> {
        self.nodes.get(id.0).ok_or(CnfError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, CnfError> {
        self.nodes.get_mut(id.0).ok_or(CnfError::UnknownNode(id))
    }

    /// Collect the (unsigned) variables mentioned below a node.
    pub fn variables(&self, id: NodeId, vars: &mut BTreeSet<u64>) -> Result<(), CnfError> {
        match self.get(id)? {
            Node::Leaf(v) => {
                vars.insert(v.unsigned_abs());
            }
            Node::Conjunction(children) | Node::Disjunction(children) => {
                for &child in children {
                    self.variables(child, vars)?;
                }
            }
        }
        Ok(())
    }

    /// Evaluate a node where exactly the variables in `truths` are true.
    pub fn eval(&self, id: NodeId, truths: &BTreeSet<u64>) -> Result<bool, CnfError> {
        match self.get(id)? {
            Node::Leaf(v) => Ok(truths.contains(&v.unsigned_abs()) == (*v > 0)),
            Node::Conjunction(children) => {
                for &child in children {
                    if !self.eval(child, truths)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Disjunction(children) => {
                for &child in children {
                    if self.eval(child, truths)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}
